use clap::Parser;
use spend_tracker::args::{
    Args, CategorySubcommand, Command, LimitSubcommand, SettingsSubcommand,
};
use spend_tracker::{commands, Config, Result};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().spend_home().path();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args).await?.print(),

        Command::Add(add_args) => {
            let config = Config::open(home).await?;
            commands::add_spending(&config, add_args.clone())
                .await?
                .print()
        }

        Command::List(list_args) => {
            let config = Config::open(home).await?;
            commands::list_spending(&config, list_args.clone())
                .await?
                .print()
        }

        Command::Report => commands::report(&Config::open(home).await?).await?.print(),

        Command::Month(month_args) => {
            let config = Config::open(home).await?;
            commands::month_detail(&config, month_args.clone())
                .await?
                .print()
        }

        Command::Status => commands::status(&Config::open(home).await?).await?.print(),

        Command::Category(category_args) => {
            let config = Config::open(home).await?;
            match category_args.command() {
                CategorySubcommand::Add(args) => commands::add_category(&config, args.clone())
                    .await?
                    .print(),
                CategorySubcommand::List => commands::list_categories(&config).await?.print(),
            }
        }

        Command::Limit(limit_args) => {
            let config = Config::open(home).await?;
            match limit_args.command() {
                LimitSubcommand::Set(args) => {
                    commands::set_limit(&config, args.clone()).await?.print()
                }
                LimitSubcommand::Range(args) => commands::set_limit_range(&config, args.clone())
                    .await?
                    .print(),
            }
        }

        Command::Settings(settings_args) => {
            let mut config = Config::open(home).await?;
            match settings_args.command() {
                SettingsSubcommand::Show => commands::show_settings(&config).await?.print(),
                SettingsSubcommand::Update(args) => {
                    commands::update_settings(&mut config, args.clone())
                        .await?
                        .print()
                }
            }
        }

        Command::Reset => commands::reset(&Config::open(home).await?).await?.print(),

        Command::Mcp => commands::mcp(Config::open(home).await?).await?.print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
