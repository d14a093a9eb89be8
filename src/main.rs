use std::sync::Arc;

use anyhow::{bail, ensure, Context};
use clap::{Parser, Subcommand};
use recipe_api::{
    accounts::{create_superuser, normalize_email},
    actions::PgStore,
    config::{DatabaseConfig, ServerConfig, WaitConfig},
    serve,
    store::Store,
    wait::wait_for_db,
    AppState, MIN_PASSWORD_LENGTH,
};

/// Recipe API server and maintenance commands
#[derive(Parser, Debug)]
#[command(name = "recipes", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait for the database, apply migrations and serve the API
    Serve {
        #[command(flatten)]
        database: DatabaseConfig,
        #[command(flatten)]
        server: ServerConfig,
        #[command(flatten)]
        wait: WaitConfig,
    },

    /// Apply pending migrations and exit
    Migrate {
        #[command(flatten)]
        database: DatabaseConfig,
    },

    /// Block until the database accepts connections
    WaitForDb {
        #[command(flatten)]
        database: DatabaseConfig,
        #[command(flatten)]
        wait: WaitConfig,
    },

    /// Create a staff user with every permission
    CreateSuperuser {
        #[command(flatten)]
        database: DatabaseConfig,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, env = "RECIPES_SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Delete a user together with their recipes, tags and ingredients
    DeleteUser {
        #[command(flatten)]
        database: DatabaseConfig,

        #[arg(long)]
        email: String,
    },
}

async fn connect(database: &DatabaseConfig, wait: Option<&WaitConfig>) -> anyhow::Result<PgStore> {
    database.validate()?;
    let url = database.database_url.as_str();
    let max_connections = database.max_connections;

    let store = match wait {
        Some(wait) => {
            wait_for_db(
                move || PgStore::connect(url, max_connections),
                wait.interval(),
                wait.attempts,
            )
            .await?
        }
        None => PgStore::connect(url, max_connections).await?,
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Serve {
            database,
            server,
            wait,
        } => {
            let signer = server.signer()?;
            let store = connect(&database, Some(&wait)).await?;
            store.migrate().await?;

            let state = AppState::new(Arc::new(store.clone()), signer);
            serve(state, server.bind)
                .await
                .with_context(|| format!("could not serve on {}", server.bind))?;
            store.close().await;
        }
        Command::Migrate { database } => {
            let store = connect(&database, None).await?;
            store.migrate().await?;
            store.close().await;
        }
        Command::WaitForDb { database, wait } => {
            let store = connect(&database, Some(&wait)).await?;
            store.close().await;
        }
        Command::CreateSuperuser {
            database,
            email,
            name,
            password,
        } => {
            ensure!(
                password.chars().count() >= MIN_PASSWORD_LENGTH,
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            );
            let store = connect(&database, None).await?;
            create_superuser(&store, &email, &password, &name).await?;
            store.close().await;
        }
        Command::DeleteUser { database, email } => {
            let store = connect(&database, None).await?;
            let email = normalize_email(&email);
            let Some(user) = store.user_by_email(&email).await? else {
                bail!("no user with email {email}");
            };

            store.delete_user(user.id).await?;
            log::info!("Deleted user {email} and everything they owned");
            store.close().await;
        }
    }

    Ok(())
}
