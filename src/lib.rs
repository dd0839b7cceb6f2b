//! Core of the astscript-color-faint-gray front-end.
//!
//! - [`cache`]: metadata-indexed, size-bounded store of generated images
//! - [`params`]: typed parameter sets and command line assembly
//! - [`channels`]: FITS channel discovery
//! - [`settings`]: user settings document
//! - [`history`], [`presets`]: command history and saved parameter sets
//!
//! Running the external tool is left to the caller: build the argument list
//! with [`params::CommandBuilder`], run it, then pass the produced image to
//! [`cache::CacheStore::add`].

pub mod cache;
pub mod channels;
pub mod error;
pub mod history;
pub mod params;
pub mod presets;
pub mod settings;

pub use cache::{CacheConfig, CacheEntry, CacheStats, CacheStore, Diagnostic, SortBy};
pub use error::{CacheError, CommandError, SettingsError};
pub use params::{ChannelPaths, CommandBuilder, ParamValue, Parameters};
pub use history::CommandHistory;
pub use presets::{Preset, PresetStore};
pub use settings::Settings;
