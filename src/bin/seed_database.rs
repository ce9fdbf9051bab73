//! Creates the sample company database the service answers questions from.
//!
//! Usage: `seed-database [PATH]` (defaults to `SQLBOT_DATABASE` or `company.db`).

use sqlbot_backend::config::Config;
use sqlbot_backend::services::database::create_sample_database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    let path = std::env::args()
        .nth(1)
        .map(Into::into)
        .unwrap_or_else(|| Config::from_env().database_path);

    create_sample_database(&path).await?;
    tracing::info!(path = %path.display(), "database created and sample data inserted");
    Ok(())
}
