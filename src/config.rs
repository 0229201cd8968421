//! Configuration management for the rally API.
//!
//! This module provides the command-line interface and its configuration
//! types. Every option can be given as a flag or as an environment variable
//! with the `RALLY_` prefix, and optional settings have sensible defaults.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use rally_api::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Token(config) => println!("Minting a token for {}", config.uid),
//!     Command::Check(config) => println!("Checking the {:?} store", config.store.store),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RALLY_HOST` - Server bind address (default: 0.0.0.0)
//! - `RALLY_PORT` - Server port (default: 8080)
//! - `RALLY_STORE` - Document store backend, `memory` or `firestore` (default: firestore)
//! - `RALLY_FIRESTORE_PROJECT` - Google Cloud project id
//! - `RALLY_FIRESTORE_DATABASE` - Firestore database id (default: `(default)`)
//! - `RALLY_FIRESTORE_ENDPOINT` - Firestore endpoint, or an emulator `host:port`
//! - `RALLY_FIRESTORE_TOKEN` - OAuth access token for Firestore
//! - `RALLY_AUTH_SECRET` - HMAC secret for bearer tokens (required)
//! - `RALLY_CORS_ORIGINS` - Allowed CORS origins, comma separated (default: any)
//! - `RALLY_CORS_MAX_AGE` - Preflight max-age seconds (default: 3600)

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::server::routes::DEFAULT_CORS_MAX_AGE;
use crate::store::firestore::{DEFAULT_DATABASE, DEFAULT_FIRESTORE_ENDPOINT};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default lifetime of a minted token in seconds (1 hour).
pub const DEFAULT_TOKEN_TTL: u64 = 3600;

/// Shortest accepted HMAC secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Rally API - HTTP backend for rally events.
///
/// Serves user garages, competitors, race days, checkpoint tracking and
/// shared catalogs out of a Firestore document store.
#[derive(Parser, Debug, Clone)]
#[command(name = "rally-api")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The command to run. Without a subcommand the server starts with
    /// options taken from the environment.
    pub fn into_command(self) -> Command {
        match self.command {
            Some(command) => command,
            None => Command::Serve(ServeConfig::parse_from(["rally-api"])),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Mint a bearer token for local development.
    Token(TokenConfig),

    /// Check that the configured document store is reachable.
    Check(CheckConfig),
}

/// Which document store backs the service.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store, empty at startup
    Memory,
    /// Firestore over its REST API
    Firestore,
}

/// Document store options shared by `serve` and `check`.
#[derive(Args, Debug, Clone)]
pub struct StoreConfig {
    /// Document store backend.
    #[arg(long, value_enum, default_value_t = StoreBackend::Firestore, env = "RALLY_STORE")]
    pub store: StoreBackend,

    /// Google Cloud project holding the Firestore database.
    #[arg(long, env = "RALLY_FIRESTORE_PROJECT")]
    pub firestore_project: Option<String>,

    /// Firestore database id.
    #[arg(long, default_value = DEFAULT_DATABASE, env = "RALLY_FIRESTORE_DATABASE")]
    pub firestore_database: String,

    /// Firestore endpoint URL.
    ///
    /// A bare `host:port` (as exported by the emulator) is reached over plain
    /// HTTP.
    #[arg(long, default_value = DEFAULT_FIRESTORE_ENDPOINT, env = "RALLY_FIRESTORE_ENDPOINT")]
    pub firestore_endpoint: String,

    /// OAuth access token sent to Firestore.
    #[arg(long, env = "RALLY_FIRESTORE_TOKEN", hide_env_values = true)]
    pub firestore_token: Option<String>,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.store == StoreBackend::Firestore
            && self
                .firestore_project
                .as_deref()
                .map_or(true, |p| p.trim().is_empty())
        {
            return Err(
                "The Firestore store needs a project. \
                 Set --firestore-project or RALLY_FIRESTORE_PROJECT, or use --store memory"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Options for `serve`.
///
/// Derives `Parser` as well so it can be read from the environment alone
/// when no subcommand is given.
#[derive(Parser, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "RALLY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RALLY_PORT")]
    pub port: u16,

    // =========================================================================
    // Store Configuration
    // =========================================================================
    #[command(flatten)]
    pub store: StoreConfig,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 bearer tokens.
    #[arg(long, env = "RALLY_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "RALLY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// CORS preflight max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CORS_MAX_AGE, env = "RALLY_CORS_MAX_AGE")]
    pub cors_max_age: u64,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_secret(self.auth_secret.as_deref())?;
        self.store.validate()?;

        if self.cors_max_age == 0 {
            return Err("cors_max_age must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The auth secret, or "" when unset (call validate() first).
    pub fn auth_secret_or_empty(&self) -> &str {
        self.auth_secret.as_deref().unwrap_or("")
    }
}

/// Options for `token`.
#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// User id carried by the token.
    pub uid: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL, env = "RALLY_TOKEN_TTL")]
    pub ttl: u64,

    /// Secret key the server verifies tokens with.
    #[arg(long, env = "RALLY_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_secret(self.auth_secret.as_deref())?;

        if self.uid.trim().is_empty() {
            return Err("uid must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Options for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub store: StoreConfig,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

fn validate_secret(secret: Option<&str>) -> Result<(), String> {
    match secret {
        None => Err("No auth secret provided. Set --auth-secret or RALLY_AUTH_SECRET".to_string()),
        Some(secret) if secret.len() < MIN_SECRET_LEN => Err(format!(
            "auth secret must be at least {} bytes",
            MIN_SECRET_LEN
        )),
        Some(_) => Ok(()),
    }
}

// =============================================================================
// Tests
// =============================================================================
