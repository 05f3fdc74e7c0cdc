use clap::{Parser, Subcommand};
use ngo_core::auth::password::BCRYPT_COST;

#[derive(Parser, Debug)]
#[command(name = "ngo", about = "NGO site admin tooling", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the CLI version.
    Version,

    /// Print a bcrypt hash of PASSWORD.
    HashPassword {
        password: String,

        /// bcrypt cost factor (4-31).
        #[arg(long, default_value_t = BCRYPT_COST)]
        cost: u32,
    },

    /// Print a random value suitable for JWT_SECRET.
    GenSecret,

    /// Create an admin account directly in the database.
    CreateAdmin {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        #[arg(long)]
        username: String,

        #[arg(long, env = "ADMIN_PASSWORD")]
        password: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long, default_value = "super_admin")]
        role: String,

        #[arg(long, default_value = "Site")]
        first_name: String,

        #[arg(long, default_value = "Admin")]
        last_name: String,
    },
}
