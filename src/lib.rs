pub mod avatar;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod controllers;
pub mod fragment;
pub mod models;
pub mod services;
pub mod state;
pub mod validation;

use clap::{CommandFactory, Parser};
use cli::{
    Cli, Commands, ProfileCommands, cmd_forgot, cmd_login, cmd_password, cmd_profile_edit,
    cmd_profile_show, cmd_register, cmd_reset,
};
pub use config::{Config, LogFormat};
use state::SharedState;
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let json = config.general.log_format == LogFormat::Json;
    let text_layer =
        (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if matches!(command, Commands::Init) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Edit config.toml and run again.");
        } else {
            println!("config.toml already exists.");
        }
        return Ok(());
    }

    config.validate()?;
    let state = SharedState::new(config)?;

    match command {
        Commands::Login { email } => cmd_login(&state, email).await,
        Commands::Register => cmd_register(&state).await,
        Commands::Forgot { email } => cmd_forgot(&state, email).await,
        Commands::Reset { link } => cmd_reset(&state, &link).await,
        Commands::Profile { command } => match command {
            ProfileCommands::Show => cmd_profile_show(&state).await,
            ProfileCommands::Edit => cmd_profile_edit(&state).await,
        },
        Commands::Password => cmd_password(&state).await,
        Commands::Init => Ok(()),
    }
}
