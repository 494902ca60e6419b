use std::error::Error;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use roomdb::database::Database;
use roomdb::server;
use roomdb::settings::{Settings, USAGE};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::load()?;
    if settings.apply_args(std::env::args().skip(1)).is_err() {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db = Database::with_parse_cache_capacity(settings.parse_cache_capacity);
    let address = settings.address();
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%address, error = %e, "could not bind");
            return Err(e.into());
        }
    };
    info!(%address, "serving facts");
    axum::serve(listener, server::router(db)).await?;
    Ok(())
}
