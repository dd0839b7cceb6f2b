/// Command line assembly for astscript-color-faint-gray
///
/// Turns a parameter set and three channel files into the argument list the
/// external tool expects. The cache never calls into this module; callers
/// build the command, run the tool, then hand the output image to the cache.

use super::value::{ParamValue, Parameters};
use crate::error::CommandError;
use std::path::{Path, PathBuf};

/// Executable name used when none is configured
pub const DEFAULT_PROGRAM: &str = "astscript-color-faint-gray";

/// The three input images, one per color channel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelPaths {
    pub red: PathBuf,
    pub green: PathBuf,
    pub blue: PathBuf,
}

impl ChannelPaths {
    pub fn new(red: impl Into<PathBuf>, green: impl Into<PathBuf>, blue: impl Into<PathBuf>) -> Self {
        Self {
            red: red.into(),
            green: green.into(),
            blue: blue.into(),
        }
    }

    /// Channels in command order, with their logical names
    pub fn named(&self) -> [(&'static str, &Path); 3] {
        [
            ("red", self.red.as_path()),
            ("green", self.green.as_path()),
            ("blue", self.blue.as_path()),
        ]
    }

    /// Channel name to path, the shape cache entries record
    pub fn to_input_files(&self) -> crate::cache::InputFiles {
        self.named()
            .iter()
            .map(|(name, path)| (name.to_string(), path.to_string_lossy().into_owned()))
            .collect()
    }

    /// Check all three are given and, if asked, that they exist
    pub fn validate(&self, check_exists: bool) -> Result<(), CommandError> {
        let missing: Vec<&'static str> = self
            .named()
            .iter()
            .filter(|(_, path)| path.as_os_str().is_empty())
            .map(|(name, _)| match *name {
                "red" => "red_path",
                "green" => "green_path",
                _ => "blue_path",
            })
            .collect();
        if !missing.is_empty() {
            return Err(CommandError::MissingChannels(missing));
        }

        if check_exists {
            for (_, path) in self.named() {
                if !path.exists() {
                    return Err(CommandError::ChannelNotFound(path.to_path_buf()));
                }
            }
        }
        Ok(())
    }
}

/// Default generation parameters
///
/// qbright, stretch, contrast, gamma, grayval and colorval differ from the
/// external tool's own defaults and are therefore always passed explicitly.
pub fn default_parameters() -> Parameters {
    let mut p = Parameters::new();

    // ========== Input ==========
    for key in ["hdu", "rhdu", "globalhdu", "weight", "minimum", "zeropoint"] {
        p.insert(key.into(), ParamValue::Null);
    }

    // ========== Asinh scaling ==========
    p.insert("qbright".into(), ParamValue::Float(50.0));
    p.insert("stretch".into(), ParamValue::Float(0.1));

    // ========== Contrast, bias and marks ==========
    p.insert("bias".into(), ParamValue::Float(0.0));
    p.insert("contrast".into(), ParamValue::Float(4.0));
    p.insert("gamma".into(), ParamValue::Float(0.5));
    p.insert("markoptions".into(), ParamValue::Null);

    // ========== Color and gray ==========
    p.insert("coloronly".into(), ParamValue::Bool(false));
    p.insert("regions".into(), ParamValue::Null);
    p.insert("grayval".into(), ParamValue::Float(14.0));
    p.insert("colorval".into(), ParamValue::Float(15.0));
    p.insert("graykernelfwhm".into(), ParamValue::Float(1.0));
    p.insert("colorkernelfwhm".into(), ParamValue::Float(1.0));

    // ========== Output ==========
    p.insert("keeptmp".into(), ParamValue::Bool(false));
    p.insert("checkparams".into(), ParamValue::Bool(false));

    p
}

/// Builds argument lists for one executable
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list, program first
    ///
    /// Missing numeric parameters fall back to `default_parameters()`;
    /// unknown parameters are ignored.
    pub fn build(
        &self,
        params: &Parameters,
        channels: &ChannelPaths,
        output: Option<&Path>,
        check_files: bool,
    ) -> Result<Vec<String>, CommandError> {
        channels.validate(check_files)?;

        let mut args = vec![self.program.clone()];

        // HDUs: a comma separated list gives one --hdu per channel
        push_list(&mut args, params, "hdu");
        push_text(&mut args, params, "rhdu");
        if text(params, "globalhdu").is_some() {
            push_text(&mut args, params, "globalhdu");
        } else {
            args.extend(["-g".to_string(), "0".to_string()]);
        }

        for (_, path) in channels.named() {
            args.push(path.to_string_lossy().into_owned());
        }

        push_list(&mut args, params, "weight");
        push_list(&mut args, params, "minimum");
        push_list(&mut args, params, "zeropoint");

        push_number(&mut args, params, "qbright", 50.0);
        push_number(&mut args, params, "stretch", 0.1);

        if let Some(bias) = number(params, "bias") {
            if bias != 0.0 {
                push_flag_value(&mut args, "bias", &params["bias"]);
            }
        }
        push_number(&mut args, params, "contrast", 4.0);
        push_number(&mut args, params, "gamma", 0.5);

        push_text(&mut args, params, "markoptions");

        if flag(params, "coloronly") {
            args.push("--coloronly".into());
        }
        push_text(&mut args, params, "regions");
        push_number(&mut args, params, "grayval", 14.0);
        push_number(&mut args, params, "colorval", 15.0);

        for key in ["graykernelfwhm", "colorkernelfwhm"] {
            if let Some(fwhm) = number(params, key) {
                if fwhm != 1.0 {
                    push_flag_value(&mut args, key, &params[key]);
                }
            }
        }

        if let Some(output) = output {
            args.push("--output".into());
            args.push(output.to_string_lossy().into_owned());
        }

        for key in ["keeptmp", "checkparams"] {
            if flag(params, key) {
                args.push(format!("--{}", key));
            }
        }

        Ok(args)
    }
}

// ========== Parameter access ==========

fn number(params: &Parameters, key: &str) -> Option<f64> {
    params.get(key).and_then(ParamValue::as_f64)
}

fn flag(params: &Parameters, key: &str) -> bool {
    params.get(key).and_then(ParamValue::as_bool).unwrap_or(false)
}

/// Non-blank textual value (numbers count: `hdu=1` is valid)
fn text(params: &Parameters, key: &str) -> Option<String> {
    params
        .get(key)
        .filter(|v| v.is_set() && v.as_bool().is_none())
        .map(|v| v.to_string().trim().to_string())
}

fn push_flag_value(args: &mut Vec<String>, key: &str, value: &ParamValue) {
    args.push(format!("--{}", key));
    args.push(value.to_string());
}

fn push_text(args: &mut Vec<String>, params: &Parameters, key: &str) {
    if let Some(value) = text(params, key) {
        args.push(format!("--{}", key));
        args.push(value);
    }
}

fn push_list(args: &mut Vec<String>, params: &Parameters, key: &str) {
    if let Some(value) = text(params, key) {
        for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            args.push(format!("--{}", key));
            args.push(item.to_string());
        }
    }
}

fn push_number(args: &mut Vec<String>, params: &Parameters, key: &str, default: f64) {
    match params.get(key) {
        Some(value) if value.as_f64().is_some() => push_flag_value(args, key, value),
        _ => push_flag_value(args, key, &ParamValue::Float(default)),
    }
}

// ========== Display and validation ==========

/// Multi-line rendering of an argument list for display
///
/// Each option starts a continuation line together with its value;
/// positional arguments stay on the current line.
pub fn format_command(args: &[String]) -> String {
    let Some((program, rest)) = args.split_first() else {
        return String::new();
    };

    let mut lines = Vec::new();
    let mut current = program.clone();
    let mut i = 0;
    while i < rest.len() {
        let arg = &rest[i];
        if arg.starts_with('-') {
            lines.push(format!("{} \\", current));
            current = format!("  {}", arg);
            if let Some(value) = rest.get(i + 1).filter(|v| !v.starts_with('-')) {
                current.push(' ');
                current.push_str(value);
                i += 1;
            }
        } else {
            current.push(' ');
            current.push_str(arg);
        }
        i += 1;
    }
    lines.push(current);
    lines.join("\n")
}

/// Range checks on numeric parameters; empty when everything is valid
pub fn validate_ranges(params: &Parameters) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(q) = number(params, "qbright") {
        if !(0.0..=100.0).contains(&q) {
            errors.push("qbright must be between 0.0 and 100.0".to_string());
        }
    }
    if let Some(s) = number(params, "stretch") {
        if s < 0.0 {
            errors.push("stretch must be positive".to_string());
        }
    }
    if let Some(g) = number(params, "gamma") {
        if g <= 0.0 {
            errors.push("gamma must be positive".to_string());
        }
    }
    if let Some(quality) = number(params, "quality") {
        if !(1.0..=100.0).contains(&quality) {
            errors.push("quality must be between 1 and 100".to_string());
        }
    }

    errors
}

/// Output file name derived from the inputs and notable parameters
///
/// `m51_r.fits` with qbright 20 becomes `m51_q20.0_color.tif`.
pub fn suggest_output_filename(
    channels: Option<&ChannelPaths>,
    params: &Parameters,
    format: &str,
) -> String {
    let mut base = channels
        .and_then(|c| c.red.file_stem())
        .map(|stem| strip_channel_suffix(&stem.to_string_lossy()))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "color_image".to_string());

    let mut parts = Vec::new();
    for (key, prefix) in [("qbright", "q"), ("stretch", "s")] {
        if let Some(value) = params.get(key) {
            if value.as_f64() != Some(1.0) && value.is_set() {
                parts.push(format!("{}{}", prefix, value));
            }
        }
    }
    if flag(params, "coloronly") {
        parts.push("coloronly".to_string());
    }
    if !parts.is_empty() {
        base.push('_');
        base.push_str(&parts.join("_"));
    }

    format!("{}_color.{}", base, format.trim_start_matches('.'))
}

fn strip_channel_suffix(stem: &str) -> String {
    let lower = stem.to_ascii_lowercase();
    for suffix in ["_red", "_green", "_blue", "_r", "_g", "_b"] {
        if lower.ends_with(suffix) {
            return stem[..stem.len() - suffix.len()].to_string();
        }
    }
    stem.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn channels() -> ChannelPaths {
        ChannelPaths::new("/d/i.fits", "/d/r.fits", "/d/g.fits")
    }

    fn build(params: &Parameters) -> Vec<String> {
        CommandBuilder::default()
            .build(params, &channels(), Some(Path::new("/out/m51.tif")), false)
            .unwrap()
    }

    #[test]
    fn test_defaults_produce_expected_command() {
        let args = build(&default_parameters());
        assert_eq!(
            args,
            [
                "astscript-color-faint-gray",
                "-g", "0",
                "/d/i.fits", "/d/r.fits", "/d/g.fits",
                "--qbright", "50.0",
                "--stretch", "0.1",
                "--contrast", "4.0",
                "--gamma", "0.5",
                "--grayval", "14.0",
                "--colorval", "15.0",
                "--output", "/out/m51.tif",
            ]
        );
    }

    #[test]
    fn test_empty_parameters_use_builtin_defaults() {
        assert_eq!(build(&Parameters::new()), build(&default_parameters()));
    }

    #[test]
    fn test_optional_flags() {
        let mut p = default_parameters();
        p.insert("hdu".into(), "1, 2 ,3".into());
        p.insert("globalhdu".into(), "SCI".into());
        p.insert("weight".into(), "1,2,3".into());
        p.insert("zeropoint".into(), ParamValue::Float(22.5));
        p.insert("bias".into(), ParamValue::Float(0.2));
        p.insert("coloronly".into(), ParamValue::Bool(true));
        p.insert("graykernelfwhm".into(), ParamValue::Float(2.0));
        p.insert("colorkernelfwhm".into(), ParamValue::Float(1.0));
        p.insert("keeptmp".into(), ParamValue::Bool(true));
        p.insert("unknown_future_param".into(), ParamValue::Int(7));

        let args = build(&p);
        let joined = args.join(" ");

        assert!(joined.contains("--hdu 1 --hdu 2 --hdu 3 --globalhdu SCI /d/i.fits"));
        assert!(!joined.contains("-g 0"));
        assert!(joined.contains("--weight 1 --weight 2 --weight 3"));
        assert!(joined.contains("--zeropoint 22.5"));
        assert!(joined.contains("--bias 0.2"));
        assert!(joined.contains("--coloronly"));
        assert!(joined.contains("--graykernelfwhm 2.0"));
        assert!(!joined.contains("--colorkernelfwhm"));
        assert!(args.ends_with(&["--keeptmp".to_string()]));
        assert!(!joined.contains("unknown_future_param"));
    }

    #[test]
    fn test_missing_channels() {
        let channels = ChannelPaths::new("/d/i.fits", "", "");
        let err = CommandBuilder::default()
            .build(&default_parameters(), &channels, None, false)
            .unwrap_err();
        assert!(matches!(err, CommandError::MissingChannels(ref m) if m == &["green_path", "blue_path"]));
    }

    #[test]
    fn test_file_checks_are_optional() {
        let builder = CommandBuilder::default();
        let err = builder
            .build(&default_parameters(), &channels(), None, true)
            .unwrap_err();
        assert!(matches!(err, CommandError::ChannelNotFound(_)));

        let dir = TempDir::new().unwrap();
        let paths: Vec<_> = ["r.fits", "g.fits", "b.fits"]
            .iter()
            .map(|name| {
                let p = dir.path().join(name);
                std::fs::write(&p, b"SIMPLE  =").unwrap();
                p
            })
            .collect();
        let real = ChannelPaths::new(&paths[0], &paths[1], &paths[2]);
        assert!(builder.build(&default_parameters(), &real, None, true).is_ok());
    }

    #[test]
    fn test_format_command() {
        let args: Vec<String> = ["prog", "-g", "0", "a.fits", "b.fits", "--coloronly", "--qbright", "50.0"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            format_command(&args),
            "prog \\\n  -g 0 a.fits b.fits \\\n  --coloronly \\\n  --qbright 50.0"
        );
        assert_eq!(format_command(&[]), "");
    }

    #[test]
    fn test_validate_ranges() {
        assert!(validate_ranges(&default_parameters()).is_empty());

        let mut p = Parameters::new();
        p.insert("qbright".into(), ParamValue::Float(120.0));
        p.insert("stretch".into(), ParamValue::Float(-1.0));
        p.insert("gamma".into(), ParamValue::Float(0.0));
        p.insert("quality".into(), ParamValue::Int(0));
        assert_eq!(validate_ranges(&p).len(), 4);
    }

    #[test]
    fn test_suggest_output_filename() {
        let channels = ChannelPaths::new("/d/m51_R.fits", "/d/m51_g.fits", "/d/m51_b.fits");
        let mut p = Parameters::new();
        p.insert("qbright".into(), ParamValue::Float(20.0));
        p.insert("stretch".into(), ParamValue::Float(1.0));
        p.insert("coloronly".into(), ParamValue::Bool(true));

        assert_eq!(
            suggest_output_filename(Some(&channels), &p, ".png"),
            "m51_q20.0_coloronly_color.png"
        );
        assert_eq!(
            suggest_output_filename(None, &Parameters::new(), "tif"),
            "color_image_color.tif"
        );
    }

    #[test]
    fn test_input_files_shape() {
        let files = channels().to_input_files();
        assert_eq!(files["red"], "/d/i.fits");
        assert_eq!(files["blue"], "/d/g.fits");
        assert_eq!(files.len(), 3);
    }
}
