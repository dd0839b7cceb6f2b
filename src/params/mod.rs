/// Generation parameters
///
/// This module handles:
/// - Typed scalar parameter values and parameter sets (value.rs)
/// - Assembling and validating the external tool's command line (command.rs)

pub mod command;
pub mod value;

pub use command::{default_parameters, ChannelPaths, CommandBuilder};
pub use value::{parse_assignment, ParamValue, Parameters};
