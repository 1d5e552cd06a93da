mod schema;
mod user;

use clap::{Parser, Subcommand};
use mini_orm::{EngineConfig, EntityManager};
use schema::GenerateSchema;
use tracing::{error, level_filters::LevelFilter};
use tracing_subscriber::{
    fmt::{format, layer},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use user::UserCommand;

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Store and load users through the engine
    #[command(subcommand)]
    User(UserCommand),
    Schema(GenerateSchema),
}

#[derive(Parser, Debug)]
struct Args {
    /// The URL to the database to work on. If left unset, will be pulled from the
    /// `DATABASE_URL` environment variable, or a corresponding `.env` file instead.
    #[arg(short, long, global = true, value_name = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Subcommands,
}

impl Args {
    fn engine_config(&self) -> eyre::Result<EngineConfig> {
        match &self.database_url {
            Some(url) => Ok(EngineConfig::new(url.clone(), true)),
            None => Ok(EngineConfig::from_env()?),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(layer().event_format(format().without_time().with_target(false).compact()))
        .init();

    let r = match args.engine_config() {
        Ok(config) => match args.command {
            Subcommands::User(cmd) => cmd.run(&EntityManager::with_config(config)).await,
            Subcommands::Schema(cmd) => cmd.run(&config).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = r {
        error!("Command execution failed: {e}");
    }
}
