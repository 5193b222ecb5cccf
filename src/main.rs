// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use nichi::app_config::{self, Config};
use nichi::app_controller::Controller;
use nichi::errors::AppError;
use nichi::language_utils::get_language_name;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Show the number and size of cached responses
    Info,
    /// Delete every cached response
    Clear,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a single subtitle file
    Translate {
        /// Subtitle file to translate
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target language code (defaults to the configured target)
        #[arg(short, long)]
        target_language: Option<String>,

        /// Source language code (defaults to the language in the filename)
        #[arg(short, long)]
        source_language: Option<String>,

        /// Output path (defaults to the input name with the target language)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,
    },

    /// Translate every subtitle file in a directory
    TranslateDir {
        /// Directory to process (defaults to DIRECTORY)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Target language code (defaults to the configured target)
        #[arg(short, long)]
        target_language: Option<String>,

        /// Source language code (defaults to the language in each filename)
        #[arg(short, long)]
        source_language: Option<String>,

        /// Only translate files whose filename language matches this code
        #[arg(long, value_name = "LANG")]
        only: Option<String>,
    },

    /// List the supported language codes
    Languages,

    /// Inspect or clear the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Generate shell completions for nichi
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// nichi - subtitle translation with Gemini
///
/// Translates SRT subtitle files in concurrent batches, keeping timings and the
/// media-server filename convention (name.track.language.modifier.srt).
#[derive(Parser, Debug)]
#[command(name = "nichi")]
#[command(version)]
#[command(about = "Translate SRT subtitles with Gemini")]
#[command(long_about = "nichi translates SRT subtitle files with the Gemini API.

EXAMPLES:
    nichi ~/Videos/Show                          # List subtitle files and their languages
    nichi translate Show.S01E01.en.srt           # Translate to the default target language
    nichi translate -t fr -f Movie.en.srt        # Translate to French, overwrite output
    nichi ~/Videos/Show translate-dir --only en  # Translate every English subtitle
    nichi cache info                             # Show cache statistics
    nichi completions bash > nichi.bash          # Generate bash completions

CONFIGURATION:
    Settings are read from nichi.json (see --config) when present, then from the first
    .env file found in ./, ~/, ~/.config/nichi/ or /etc/nichi/, then from the environment.
    GOOGLE_AI_API_KEY is required for translation.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Working directory
    #[arg(value_name = "DIRECTORY")]
    directory: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "nichi.json", global = true)]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The logger filters on the global max level, which is adjusted after config load
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for a log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, colour) = Self::decoration(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "nichi", &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::load(&cli.config)?;
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;

    let outcome = tokio::select! {
        result = run_command(&controller, cli) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        let e = AppError::from(e);
        error!("{}", e);
        log::logger().flush();
        std::process::exit(1);
    }
    Ok(())
}

async fn run_command(controller: &Controller, cli: CommandLineOptions) -> Result<()> {
    let directory = cli.directory.unwrap_or_else(nichi::app_controller::default_directory);

    match cli.command {
        None => print_overview(controller, &directory),

        Some(Commands::Translate {
            file,
            target_language,
            source_language,
            output,
            force,
        }) => {
            let file = resolve(&directory, &file);
            let output = output.map(|path| resolve(&directory, &path));
            if let Some(result) = controller
                .run_file(
                    &file,
                    target_language.as_deref(),
                    source_language.as_deref(),
                    output.as_deref(),
                    force,
                )
                .await?
            {
                println!(
                    "{} -> {} ({} of {} entries)",
                    file.display(),
                    result.output_file.display(),
                    result.translated_entries,
                    result.total_entries
                );
                for error in &result.errors {
                    println!("  {}", error);
                }
            }
            Ok(())
        }

        Some(Commands::TranslateDir {
            dir,
            target_language,
            source_language,
            only,
        }) => {
            let dir = dir.map(|d| resolve(&directory, &d)).unwrap_or(directory);
            let summary = controller
                .run_folder(&dir, target_language.as_deref(), source_language.as_deref(), only.as_deref())
                .await?;
            println!(
                "{} translated, {} skipped, {} failed",
                summary.translated, summary.skipped, summary.failed
            );
            Ok(())
        }

        Some(Commands::Languages) => {
            for line in controller.language_listing() {
                println!("{}", line);
            }
            Ok(())
        }

        Some(Commands::Cache { action }) => match action {
            CacheCommand::Info => {
                let info = controller.cache_info()?;
                println!("Directory: {}", info.directory.display());
                println!("Entries:   {}", info.count);
                println!("Size:      {:.2} MB ({} bytes)", info.size_mb(), info.total_bytes);
                Ok(())
            }
            CacheCommand::Clear => {
                let stats = controller.clear_cache()?;
                info!("Cache cleared");
                println!(
                    "Removed {} entries, freed {} bytes",
                    stats.removed_count, stats.freed_bytes
                );
                Ok(())
            }
        },

        // Handled before the config is loaded
        Some(Commands::Completions { .. }) => Ok(()),
    }
}

// Relative paths are taken from the working directory argument
fn resolve(directory: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        path.to_path_buf()
    } else {
        directory.join(path)
    }
}

fn print_overview(controller: &Controller, directory: &Path) -> Result<()> {
    let files = controller.subtitle_overview(directory)?;
    let target = &controller.config().default_target_language;

    println!("{}", directory.display());
    if files.is_empty() {
        println!("  no subtitle files");
    }
    for (file, language) in &files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let language = language
            .as_deref()
            .map(|code| format!("{} ({})", code, get_language_name(code)))
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {:<50} {}", name, language);
    }
    println!();
    println!("Default target: {} ({})", target, get_language_name(target));
    Ok(())
}
