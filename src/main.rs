#![forbid(unsafe_code)]

mod commands;
mod models;
mod poise_error_handler;
mod repository;
mod rules;
mod schedule;
mod standings;
mod utils;
mod workflow;

#[cfg(test)]
mod test_utils;

use std::{process::exit, sync::Arc};

use poise::{serenity_prelude::*, Framework};
use poise_error_handler::handle_error;
use repository::{
    FixtureRepository, LeagueRepository, MatchRepository, ResultRepository, SessionRepository,
};
use serde::Deserialize;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use standings::StandingsService;
use tokio::{select, signal};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workflow::{LeagueService, ResultWorkflow, RunWorkflow, ScheduleService};

#[derive(Debug, Deserialize)]
struct AppConfig {
    discord_bot_token: String,
    database_url: String,
    register_commands_globally: Option<bool>,
    register_commands_in_guilds: Option<Vec<u64>>,
}

pub struct BotState {
    pub leagues: Arc<LeagueService>,
    pub schedule: Arc<ScheduleService>,
    pub results: Arc<ResultWorkflow>,
    pub runs: Arc<RunWorkflow>,
    pub standings: Arc<StandingsService>,
}

impl BotState {
    fn new(db_pool: &SqlitePool) -> BotState {
        let leagues = Arc::new(LeagueRepository::new(db_pool.clone()));
        let fixtures = Arc::new(FixtureRepository::new(db_pool.clone()));
        let sessions = Arc::new(SessionRepository::new(db_pool.clone()));

        BotState {
            leagues: Arc::new(LeagueService::new(leagues.clone())),
            schedule: Arc::new(ScheduleService::new(leagues.clone(), fixtures.clone())),
            results: Arc::new(ResultWorkflow::new(
                leagues.clone(),
                fixtures.clone(),
                Arc::new(ResultRepository::new(db_pool.clone())),
            )),
            runs: Arc::new(RunWorkflow::new(leagues.clone(), sessions.clone())),
            standings: Arc::new(StandingsService::new(
                leagues,
                fixtures,
                sessions,
                Arc::new(MatchRepository::new(db_pool.clone())),
            )),
        }
    }
}

#[tracing::instrument]
#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        warn!("Could not load config from .env file: {err}");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(
                    "league_keeper=info"
                        .parse()
                        .expect("Hard-coded default directive should be correct"),
                )
                .from_env_lossy(),
        )
        .init();

    let app_config = match envy::from_env::<AppConfig>() {
        Ok(config) => config,
        Err(err) => {
            error!("Could not load app config: {err}");
            exit(255);
        }
    };

    let db_pool = match setup_database(&app_config.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            error!("Could not setup database: {err}");
            exit(255);
        }
    };

    let app_state = BotState::new(&db_pool);

    let framework = Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::league(),
                commands::schedule(),
                commands::result(),
                commands::run(),
                commands::session(),
                commands::standings(),
                commands::help(),
            ],
            on_error: |error| Box::pin(handle_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(
                async move {
                    let commands = &framework.options().commands;

                    if let Some(true) = app_config.register_commands_globally {
                        info!("Registering commands globally");
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                    }

                    if let Some(guilds) = app_config.register_commands_in_guilds {
                        for guild in guilds.iter().map(|g| GuildId::new(*g)) {
                            let guild_name = ctx
                                .http()
                                .get_guild(guild)
                                .await
                                .map(|g| g.name)
                                .unwrap_or("???".to_string());

                            info!("Registering commands in guild {guild} ({guild_name})");

                            poise::builtins::register_in_guild(ctx, commands, guild).await?;
                        }
                    }

                    Ok(app_state)
                }
                .instrument(info_span!("bot_setup")),
            )
        })
        .build();

    let mut client = match ClientBuilder::new(app_config.discord_bot_token, GatewayIntents::empty())
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to create the client: {err}");
            exit(255);
        }
    };

    select! {
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            client.shard_manager.shutdown_all().await;
            db_pool.close().await;
        },

        result = client.start() => {
            if let Err(err) = result {
                error!("Failed to start the client: {err}");
            }
        },
    };
}

#[tracing::instrument(skip(url))]
async fn setup_database(url: &str) -> anyhow::Result<SqlitePool> {
    info!("Connecting to SQLite database at {url}");
    let pool = SqlitePoolOptions::new().connect(url).await?;
    info!("Running migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Done!");
    Ok(pool)
}
