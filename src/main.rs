//! faintgray: manage cached astscript-color-faint-gray results
//!
//! Adds generated images to the cache, browses and exports it, and prints
//! the command line the external tool would be run with.

use clap::{Parser, Subcommand, ValueEnum};
use faintgray::cache::CacheEntry;
use faintgray::channels::{format_file_size, guess_channels, scan_channels};
use faintgray::params::command::{format_command, suggest_output_filename, validate_ranges};
use faintgray::params::parse_assignment;
use faintgray::{
    CacheStore, ChannelPaths, CommandHistory, Parameters, PresetStore, Settings, SortBy,
};
use std::path::{Path, PathBuf};

/// Cache and command tool for astscript-color-faint-gray
#[derive(Parser)]
#[command(name = "faintgray")]
#[command(version)]
#[command(about = "Cache and command tool for astscript-color-faint-gray")]
struct Args {
    /// Settings file (defaults to the user config directory)
    #[arg(long, env = "FAINTGRAY_CONFIG")]
    config: Option<PathBuf>,

    /// Cache directory (overrides settings)
    #[arg(long, env = "FAINTGRAY_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Maximum cached images (overrides settings)
    #[arg(long)]
    max_entries: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a generated image to the cache
    Add {
        /// Image produced by astscript-color-faint-gray
        image: PathBuf,
        #[command(flatten)]
        channels: ChannelArgs,
        /// Generation parameter, repeatable (key=value)
        #[arg(short = 'p', long = "param", value_parser = parse_assignment)]
        params: Vec<(String, faintgray::ParamValue)>,
    },

    /// List cached images
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Newest)]
        sort: SortArg,
    },

    /// Show one cached image
    Show { id: String },

    /// Search parameters and input file names
    Search { query: String },

    /// Remove one cached image
    Remove { id: String },

    /// Remove every cached image
    Clear,

    /// Cache statistics
    Stats,

    /// Copy every cached image into a folder
    Export { destination: PathBuf },

    /// Print the astscript-color-faint-gray command for a parameter set
    Command {
        #[command(flatten)]
        channels: ChannelArgs,
        /// Output image (defaults to a name derived from the inputs)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Start from a saved preset instead of the settings defaults
        #[arg(long)]
        preset: Option<String>,
        /// Generation parameter, repeatable (key=value)
        #[arg(short = 'p', long = "param", value_parser = parse_assignment)]
        params: Vec<(String, faintgray::ParamValue)>,
        /// Do not check that the channel files exist
        #[arg(long)]
        no_check: bool,
    },

    /// Find FITS channel files in a folder
    Scan { folder: PathBuf },

    /// Show previously assembled commands, newest first
    History {
        /// Forget every recorded command
        #[arg(long)]
        clear: bool,
    },

    /// Manage saved parameter presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Save the default parameters, with overrides, under a name
    Save {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Generation parameter, repeatable (key=value)
        #[arg(short = 'p', long = "param", value_parser = parse_assignment)]
        params: Vec<(String, faintgray::ParamValue)>,
    },
    /// Print one preset
    Show { name: String },
    /// List presets, oldest first
    List,
    /// Delete a preset
    Delete { name: String },
}

#[derive(clap::Args, Default)]
struct ChannelArgs {
    /// Red channel FITS file
    #[arg(long)]
    red: Option<PathBuf>,
    /// Green channel FITS file
    #[arg(long)]
    green: Option<PathBuf>,
    /// Blue channel FITS file
    #[arg(long)]
    blue: Option<PathBuf>,
}

impl ChannelArgs {
    fn to_channels(&self) -> ChannelPaths {
        ChannelPaths::new(
            self.red.clone().unwrap_or_default(),
            self.green.clone().unwrap_or_default(),
            self.blue.clone().unwrap_or_default(),
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Newest,
    Oldest,
    Id,
    Largest,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Newest => SortBy::Newest,
            SortArg::Oldest => SortBy::Oldest,
            SortArg::Id => SortBy::Id,
            SortArg::Largest => SortBy::Largest,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let settings_path = match args.config.clone() {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    let settings = Settings::load(&settings_path);
    let config_dir = settings_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    match args.command {
        Command::Command {
            channels,
            output,
            preset,
            params,
            no_check,
        } => {
            let mut parameters = match preset {
                Some(name) => {
                    let presets = PresetStore::open(&config_dir)?;
                    let preset = presets
                        .load(&name)
                        .ok_or_else(|| format!("no preset '{}'", name))?;
                    let mut parameters = settings.parameters.clone();
                    parameters.extend(preset.parameters);
                    parameters
                }
                None => settings.parameters.clone(),
            };
            parameters.extend(params);
            print_command(&settings, &config_dir, &channels, output, parameters, no_check)
        }
        Command::History { clear } => {
            let mut history = CommandHistory::open(&config_dir);
            if clear {
                history.clear();
                println!("🗑️  Command history cleared");
                return Ok(());
            }
            for entry in history.entries() {
                println!(
                    "{}  {}",
                    entry.timestamp.get(..19).unwrap_or(&entry.timestamp),
                    entry.command
                );
            }
            Ok(())
        }
        Command::Preset { action } => run_preset_command(&settings, &config_dir, action),
        Command::Scan { folder } => {
            let files = scan_channels(&folder);
            for file in &files {
                println!("{}", file.display());
            }
            if let Some(guess) = guess_channels(&files) {
                println!();
                println!("red:   {}", guess.red.display());
                println!("green: {}", guess.green.display());
                println!("blue:  {}", guess.blue.display());
            }
            Ok(())
        }
        command => {
            let mut config = settings.cache_config();
            if let Some(dir) = args.cache_dir {
                config.base_dir = dir;
            }
            if let Some(max) = args.max_entries {
                config.max_entries = max;
            }
            let mut store = CacheStore::open(config)?;
            run_cache_command(&mut store, &settings, command)
        }
    }
}

fn run_cache_command(
    store: &mut CacheStore,
    settings: &Settings,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Add {
            image,
            channels,
            params,
        } => {
            let mut parameters = settings.parameters.clone();
            parameters.extend(params);
            let id = store.add(&image, &parameters, &channels.to_channels().to_input_files())?;
            println!("✅ Cached {} as {}", image.display(), id);
        }
        Command::List { sort } => {
            let listing = store.list(sort.into());
            if listing.is_empty() {
                println!("Cache is empty.");
            }
            for (id, entry) in listing {
                print_row(&id, &entry);
            }
        }
        Command::Show { id } => match store.get(&id) {
            Some(entry) => println!("{}", serde_json::to_string_pretty(entry)?),
            None => return Err(format!("no cache entry '{}'", id).into()),
        },
        Command::Search { query } => {
            for (id, entry) in store.search(&query) {
                print_row(&id, &entry);
            }
        }
        Command::Remove { id } => {
            if !store.remove(&id) {
                return Err(format!("no cache entry '{}'", id).into());
            }
            println!("🗑️  Removed {}", id);
        }
        Command::Clear => {
            let count = store.clear();
            println!("🗑️  Removed {} cached images", count);
        }
        Command::Stats => {
            let stats = store.stats();
            println!("Entries:   {} / {}", stats.total_entries, stats.max_entries);
            println!(
                "Size:      {} ({:.2} MB)",
                format_file_size(stats.total_size_bytes),
                stats.total_size_mb
            );
            println!("Directory: {}", stats.base_directory.display());
        }
        Command::Export { destination } => {
            let exported = store.export(&destination);
            for path in exported.values() {
                println!("{}", path.display());
            }
            println!("📦 Exported {} images to {}", exported.len(), destination.display());
        }
        // Handled in main without opening the cache
        Command::Command { .. }
        | Command::Scan { .. }
        | Command::History { .. }
        | Command::Preset { .. } => {}
    }

    for diagnostic in store.take_diagnostics() {
        eprintln!("⚠️  {}", diagnostic);
    }
    Ok(())
}

fn print_row(id: &str, entry: &CacheEntry) {
    let thumb = if entry.thumbnail_path.is_some() { "🖼️ " } else { "  " };
    println!(
        "{} {}  {}  {:>9}",
        thumb,
        id,
        entry.timestamp.get(..19).unwrap_or(&entry.timestamp),
        format_file_size(entry.file_size)
    );
}

fn run_preset_command(
    settings: &Settings,
    config_dir: &Path,
    action: PresetAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let presets = PresetStore::open(config_dir)?;
    match action {
        PresetAction::Save {
            name,
            description,
            params,
        } => {
            let mut parameters = settings.parameters.clone();
            parameters.extend(params);
            let path = presets.save(&name, &parameters, &description)?;
            println!("💾 Saved preset '{}' to {}", name, path.display());
        }
        PresetAction::Show { name } => match presets.load(&name) {
            Some(preset) => println!("{}", serde_json::to_string_pretty(&preset)?),
            None => return Err(format!("no preset '{}'", name).into()),
        },
        PresetAction::List => {
            for preset in presets.list() {
                if preset.description.is_empty() {
                    println!("{}", preset.name);
                } else {
                    println!("{}  ({})", preset.name, preset.description);
                }
            }
        }
        PresetAction::Delete { name } => {
            if !presets.delete(&name)? {
                return Err(format!("no preset '{}'", name).into());
            }
            println!("🗑️  Deleted preset '{}'", name);
        }
    }
    Ok(())
}

fn print_command(
    settings: &Settings,
    config_dir: &Path,
    channels: &ChannelArgs,
    output: Option<PathBuf>,
    parameters: Parameters,
    no_check: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    for problem in validate_ranges(&parameters) {
        eprintln!("⚠️  {}", problem);
    }

    let channels = channels.to_channels();
    let output = output.unwrap_or_else(|| {
        let name = suggest_output_filename(
            Some(&channels),
            &parameters,
            &settings.app.default_output_format,
        );
        match &settings.app.last_output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    });

    let args = settings
        .command_builder()
        .build(&parameters, &channels, Some(&output), !no_check)?;
    println!("{}", format_command(&args));

    CommandHistory::open(config_dir).add_command(
        &args.join(" "),
        &parameters,
        &channels.to_input_files(),
    );
    Ok(())
}
