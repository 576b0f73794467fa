use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use ytripper_core::fs_paths::DesktopPaths;
use ytripper_core::models::job::JobOutcome;

pub mod cli;
pub mod commands;
pub mod core;
pub mod storage;

use cli::{Cli, Command};

pub struct AppState {
    pub paths: Arc<DesktopPaths>,
    pub config_path: PathBuf,
}

impl AppState {
    pub fn new(config_override: Option<PathBuf>) -> Self {
        let paths = Arc::new(DesktopPaths::new(env!("CARGO_MANIFEST_DIR")));
        let config_path =
            config_override.unwrap_or_else(|| storage::config::settings_path(paths.as_ref()));
        Self { paths, config_path }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // stdout carries the event stream
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let state = AppState::new(cli.config);
    let settings = storage::config::load_settings(&state.config_path);
    init_tracing(&settings.logging.filter);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli.command, &state)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command, state: &AppState) -> anyhow::Result<ExitCode> {
    match command {
        Command::Download(args) => {
            let picker = crate::core::dialog::PromptFolderPicker;
            let outcome = commands::downloads::download(state, args, &picker).await?;
            Ok(exit_code_for(&outcome))
        }
        Command::Serve => {
            commands::downloads::serve(state).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Deps => {
            let statuses = commands::dependencies::check_dependencies(state).await;
            println!("{}", serde_json::to_string_pretty(&statuses)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Settings { action } => {
            commands::settings::handle(state, action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code_for(outcome: &JobOutcome) -> ExitCode {
    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
