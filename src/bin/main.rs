//! calcsense CLI - completion and hover for calculation and scenario editors
//!
//! Usage:
//!   calcsense lsp [--websocket <addr>]
//!   calcsense complete <catalog.json> <buffer> --line <n> --character <n>
//!   calcsense hover <catalog.json> <buffer> --line <n> --character <n>
//!   calcsense check-config
//!
//! Examples:
//!   calcsense lsp --websocket 127.0.0.1:9257
//!   calcsense complete catalogs/payroll.json rules/net.calc --line 3 --character 18
//!   calcsense hover catalogs/payroll.json specs/net.feature -l 1 -c 22 --language sentence

use calcsense::catalog::{CatalogPayload, FileCatalogSource};
use calcsense::config::Settings;
use calcsense::logging::init_logger;
use calcsense::lsp::{run_stdio, run_websocket, Engine, LanguageKind, WorkspaceConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tower_lsp::lsp_types::{HoverContents, Position};

#[derive(Parser)]
#[command(name = "calcsense")]
#[command(about = "calcsense - completion and hover for calculation expressions and scenarios")]
#[command(version)]
struct Cli {
    /// Config file (otherwise CALCSENSE_CONFIG, ./calcsense.toml, user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "calcsense=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable ANSI colors in log output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the language server
    Lsp {
        /// Serve WebSocket clients on this address instead of stdio
        #[arg(long)]
        websocket: Option<SocketAddr>,
    },

    /// Print completion items at a position as JSON
    Complete {
        #[command(flatten)]
        target: Target,

        /// Character that triggered the request
        #[arg(short, long)]
        trigger: Option<char>,
    },

    /// Print hover documentation at a position
    Hover {
        #[command(flatten)]
        target: Target,
    },

    /// Load and print the resolved configuration
    CheckConfig,
}

#[derive(clap::Args)]
struct Target {
    /// Catalog JSON file
    catalog: PathBuf,

    /// Source buffer
    buffer: PathBuf,

    /// Zero-based line of the cursor
    #[arg(short, long)]
    line: u32,

    /// Zero-based UTF-16 column of the cursor
    #[arg(short, long)]
    character: u32,

    /// Language of the buffer (detected from its extension if not specified)
    #[arg(long)]
    language: Option<LanguageArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LanguageArg {
    Expression,
    Sentence,
}

impl From<LanguageArg> for LanguageKind {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Expression => LanguageKind::Expression,
            LanguageArg::Sentence => LanguageKind::Sentence,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logger(cli.no_color, cli.log_level.as_deref(), &settings.log.level) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    match cli.command {
        Commands::Lsp { websocket } => cmd_lsp(settings, websocket).await,
        Commands::Complete { target, trigger } => cmd_complete(&settings, target, trigger),
        Commands::Hover { target } => cmd_hover(&settings, target),
        Commands::CheckConfig => cmd_check_config(&settings),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, calcsense::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

async fn cmd_lsp(settings: Settings, websocket: Option<SocketAddr>) -> ExitCode {
    let dir = match settings.catalog.resolved_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error resolving catalog directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = match WorkspaceConfig::new(settings, Arc::new(FileCatalogSource::new(dir))) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error building language profiles: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match websocket {
        Some(addr) => {
            if let Err(e) = run_websocket(addr, config).await {
                eprintln!("WebSocket server error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        None => run_stdio(config).await,
    }

    ExitCode::SUCCESS
}

/// Build an engine for the target's catalog and read its buffer.
fn load_target(settings: &Settings, target: &Target) -> Result<(Engine, String, Position), String> {
    let json = fs::read_to_string(&target.catalog)
        .map_err(|e| format!("Error reading catalog '{}': {}", target.catalog.display(), e))?;
    let buffer = fs::read_to_string(&target.buffer)
        .map_err(|e| format!("Error reading file '{}': {}", target.buffer.display(), e))?;

    let language = target
        .language
        .map(LanguageKind::from)
        .or_else(|| settings.language_for_path(&target.buffer))
        .unwrap_or(LanguageKind::Expression);
    let profile = settings.profile(language).map_err(|e| e.to_string())?;

    let payload = CatalogPayload::from_json(&json)
        .map_err(|e| format!("Error in catalog '{}': {}", target.catalog.display(), e))?;
    let registry = payload.into_registry(&profile);

    let position = Position {
        line: target.line,
        character: target.character,
    };

    Ok((Engine::new(Arc::new(profile), Arc::new(registry)), buffer, position))
}

fn cmd_complete(settings: &Settings, target: Target, trigger: Option<char>) -> ExitCode {
    let (engine, buffer, position) = match load_target(settings, &target) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let items: Vec<_> = engine
        .provide_completions(&buffer, position, trigger)
        .into_iter()
        .map(Engine::resolve_completion)
        .collect();

    match serde_json::to_string_pretty(&items) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing completions: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_hover(settings: &Settings, target: Target) -> ExitCode {
    let (engine, buffer, position) = match load_target(settings, &target) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match engine.provide_hover(&buffer, position) {
        Some(hover) => {
            if let HoverContents::Markup(markup) = hover.contents {
                println!("{}", markup.value);
            }
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("No hover information at {}:{}", target.line, target.character);
            ExitCode::FAILURE
        }
    }
}

fn cmd_check_config(settings: &Settings) -> ExitCode {
    for kind in [LanguageKind::Expression, LanguageKind::Sentence] {
        if let Err(e) = settings.profile(kind) {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match toml::to_string_pretty(settings) {
        Ok(text) => {
            println!("Catalog directory: {}", settings.catalog.dir);
            println!("Default context: {}", settings.catalog.default_context);
            println!();
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error rendering configuration: {}", e);
            ExitCode::FAILURE
        }
    }
}
