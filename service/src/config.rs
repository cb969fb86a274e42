//! Service configuration.

use clap::Parser;

/// Service configuration, from CLI flags with environment fallbacks.
///
/// Flags take precedence over the corresponding environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "scrip", about = "Loyalty points and cashback service")]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(
        short = 'a',
        long = "address",
        env = "RUN_ADDRESS",
        default_value = "localhost:8000"
    )]
    pub run_address: String,

    /// Postgres DSN; omit to run on the in-memory store.
    #[arg(short = 'd', long = "database", env = "DATABASE_URI")]
    pub database_uri: Option<String>,

    /// Base URL of the external accrual system; omit to run without the
    /// accrual worker.
    #[arg(short = 'r', long = "accrual", env = "ACCRUAL_SYSTEM_ADDRESS")]
    pub accrual_address: Option<String>,
}

impl Config {
    /// The configured database DSN, treating the empty string as unset.
    #[must_use]
    pub fn database_dsn(&self) -> Option<&str> {
        self.database_uri.as_deref().filter(|dsn| !dsn.is_empty())
    }

    /// The configured accrual base URL, treating the empty string as
    /// unset.
    #[must_use]
    pub fn accrual_base_url(&self) -> Option<&str> {
        self.accrual_address
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}
