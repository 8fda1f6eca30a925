// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use wikireplica::app_config::{Config, DEFAULT_PORT, LogLevel};
use wikireplica::database::{ConnectionManager, MySqlDriver};
use wikireplica::language_utils::resolve_database_name;
use wikireplica::mapping::{MappingCache, ReplicaRegistry, snapshot_path_in};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve language codes or wiki names to replica database names
    Resolve {
        /// Codes such as 'fr', 'gsw', 'enwiki' or 'dewiki_p'
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<String>,
    },

    /// Show the language to database mapping
    Mapping {
        /// Only print the database for this language code
        #[arg(short = 'l', long = "lang")]
        language: Option<String>,

        /// Discard the saved snapshot and refetch from the registry
        #[arg(short, long)]
        refresh: bool,
    },

    /// Run a read-only query against a language's replica database
    Query {
        /// Language code or wiki name selecting the database
        #[arg(short = 'l', long = "lang")]
        language: String,

        /// Port used when no configured override applies
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// SQL statement to run
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// Generate shell completions for wikireplica
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// wikireplica - Wikipedia replica database access
///
/// Resolves language codes to replica database names, maintains the
/// language mapping, and runs queries against the replicas.
#[derive(Parser, Debug)]
#[command(name = "wikireplica")]
#[command(version)]
#[command(about = "Wikipedia replica database access")]
#[command(long_about = "wikireplica resolves language codes to Wikipedia replica databases and queries them.

EXAMPLES:
    wikireplica resolve fr gsw enwiki          # Print database names
    wikireplica mapping                        # Print the full language mapping
    wikireplica mapping --lang de              # Print the database for one language
    wikireplica mapping --refresh              # Refetch the mapping from the registry
    wikireplica query -l fr 'SELECT 1'         # Query the French replica
    wikireplica completions bash > wr.bash     # Generate bash completions

CONFIGURATION:
    Configuration is read from wikireplica.json by default. A missing file
    means default settings. Credentials are read from <credentials_dir>/<host>.cnf.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "wikireplica.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(long, value_enum, global = true, env = "WIKIREPLICA_LOG")]
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
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is set after config load
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "wikireplica", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_default(&cli.config_path)
        .with_context(|| format!("Failed to load config: {:?}", cli.config_path))?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());
    debug!("Using replica host {}", config.replica.host);

    match cli.command {
        Commands::Resolve { inputs } => {
            for input in inputs {
                println!("{}\t{}", input, resolve_database_name(&input));
            }
            Ok(())
        }
        Commands::Mapping { language, refresh } => run_mapping(&config, language.as_deref(), refresh),
        Commands::Query { language, port, sql } => run_query(&config, &language, port, &sql),
        Commands::Completions { .. } => Ok(()),
    }
}

fn connection_manager(config: &Config) -> Result<Arc<ConnectionManager>> {
    let driver = MySqlDriver::new().context("Failed to start database runtime")?;
    Ok(Arc::new(ConnectionManager::from_config(Arc::new(driver), config)))
}

fn run_mapping(config: &Config, language: Option<&str>, refresh: bool) -> Result<()> {
    let manager = connection_manager(config)?;
    let registry = ReplicaRegistry::from_manager(manager);
    let mut cache = MappingCache::new(Box::new(registry), snapshot_path_in(&config.output_dir));

    if refresh {
        cache.invalidate()?;
    }

    match language {
        Some(code) => {
            let database = cache
                .name_for(code)
                .ok_or_else(|| anyhow!("No database known for language '{}'", code))?;
            println!("{}", database);
        }
        None => {
            let mapping = cache.get();
            info!("{} languages mapped", mapping.len());
            println!("{}", serde_json::to_string_pretty(mapping)?);
        }
    }
    Ok(())
}

fn run_query(config: &Config, language: &str, port: u16, sql: &str) -> Result<()> {
    let manager = connection_manager(config)?;
    let registry = ReplicaRegistry::from_manager(Arc::clone(&manager));
    let cache = MappingCache::new(Box::new(registry), snapshot_path_in(&config.output_dir));
    let database = cache.database_for(language);
    debug!("Language '{}' maps to {}", language, database);
    let host = config.replica.host.clone();

    let result = manager.with_connection(&host, &database, port, |handle| {
        handle.execute(sql, &[]).map_err(anyhow::Error::from)
    })?;

    if result.is_empty() {
        warn!("Query returned no rows");
    }
    for row in &result {
        println!("{}", serde_json::to_string(row)?);
    }
    info!("{} row(s) from {}", result.len(), database);
    Ok(())
}
