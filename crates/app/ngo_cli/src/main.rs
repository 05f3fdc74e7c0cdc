// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use ngo_core::auth::jwt::generate_secret;
use ngo_core::auth::password::hash_password;
use ngo_core::auth::queries::PgUserRepository;
use ngo_core::auth::store::UserStore;
use ngo_core::models::auth::NewUser;
use sqlx::postgres::PgPoolOptions;

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::HashPassword { password, cost } => {
            if !(4..=31).contains(&cost) {
                return Err(Error::Custom(format!("cost must be between 4 and 31, got {cost}")));
            }
            println!("{}", hash_password(&password, cost)?);
        }
        Commands::GenSecret => {
            println!("{}", generate_secret());
        }
        Commands::CreateAdmin {
            database_url,
            username,
            password,
            email,
            role,
            first_name,
            last_name,
        } => {
            let email = email.unwrap_or_else(|| format!("{username}@localhost"));
            let data = NewUser {
                username: Some(username),
                password: Some(password),
                first_name: Some(first_name),
                last_name: Some(last_name),
                email: Some(email),
                role: Some(role),
                ..Default::default()
            };
            tokio::runtime::Runtime::new()?.block_on(create_admin(&database_url, data))?;
        }
    }

    Ok(())
}

async fn create_admin(database_url: &str, data: NewUser) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await?;
    ngo_core::migrate::migrate(&pool).await?;

    let users = UserStore::new(Arc::new(PgUserRepository::new(pool.clone())));
    let user = users.create_user(data).await?;
    log::info!("created {} '{}' ({})", user.role, user.username, user.id);
    println!("{}", user.id);

    pool.close().await;
    Ok(())
}
