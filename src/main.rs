//! Rally API - HTTP backend for rally events.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rally_api::{
    config::{CheckConfig, Cli, Command, ServeConfig, StoreBackend, StoreConfig, TokenConfig},
    error::StoreError,
    server::{create_router, HmacTokenVerifier, RouterConfig, TokenVerifier},
    service::RaceService,
    store::{path, DocumentStore, FirestoreConfig, FirestoreStore, MemoryStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let verifier: Arc<dyn TokenVerifier> =
        match HmacTokenVerifier::new(config.auth_secret_or_empty()) {
            Ok(verifier) => Arc::new(verifier),
            Err(e) => {
                error!("Invalid auth secret: {}", e);
                return ExitCode::FAILURE;
            }
        };

    print_banner();

    info!("Configuration:");
    match config.store.store {
        StoreBackend::Firestore => {
            info!(
                "  Store: firestore ({} / {})",
                config.store.firestore_project.as_deref().unwrap_or_default(),
                config.store.firestore_database
            );
            info!("  Endpoint: {}", config.store.firestore_endpoint);
        }
        StoreBackend::Memory => {
            warn!("  Store: memory - data is lost when the process exits");
        }
    }
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    let router_config = build_router_config(&config);

    let router = match config.store.store {
        StoreBackend::Memory => create_router(
            RaceService::new(MemoryStore::new()),
            verifier,
            router_config,
        ),
        StoreBackend::Firestore => match open_firestore(&config.store) {
            Ok(store) => create_router(RaceService::new(store), verifier, router_config),
            Err(e) => {
                error!("Failed to create Firestore client: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -H \"Authorization: Bearer $(rally-api token <uid>)\" http://{}/api/catalogs/color",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("██████╗  █████╗ ██╗     ██╗  ██╗   ██╗");
    info!("██╔══██╗██╔══██╗██║     ██║  ╚██╗ ██╔╝");
    info!("██████╔╝███████║██║     ██║   ╚████╔╝ ");
    info!("██╔══██╗██╔══██║██║     ██║    ╚██╔╝  ");
    info!("██║  ██║██║  ██║███████╗███████╗██║   ");
    info!("╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝╚══════╝╚═╝   ");
    info!("");
    info!("                 API v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "rally_api=debug,tower_http=debug"
    } else {
        "rally_api=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_cors_max_age(config.cors_max_age);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

fn open_firestore(config: &StoreConfig) -> Result<FirestoreStore, StoreError> {
    let project = config.firestore_project.clone().unwrap_or_default();
    let mut firestore = FirestoreConfig::new(project)
        .with_endpoint(config.firestore_endpoint.clone())
        .with_database(config.firestore_database.clone());

    if let Some(ref token) = config.firestore_token {
        firestore = firestore.with_access_token(token.clone());
    }

    FirestoreStore::new(firestore)
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let secret = config.auth_secret.as_deref().unwrap_or_default();
    let verifier = match HmacTokenVerifier::new(secret) {
        Ok(verifier) => verifier,
        Err(e) => {
            eprintln!("Error: invalid auth secret: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", verifier.issue(&config.uid, Duration::from_secs(config.ttl)));

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Rally API Configuration Check");
    println!("═════════════════════════════");
    println!();

    if let Err(e) = config.store.validate() {
        println!("✗ Store: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match config.store.store {
        StoreBackend::Memory => {
            println!("✓ Store: memory");
            count_users(&MemoryStore::new()).await
        }
        StoreBackend::Firestore => {
            println!(
                "✓ Project: {}",
                config.store.firestore_project.as_deref().unwrap_or_default()
            );
            println!("✓ Database: {}", config.store.firestore_database);
            println!("✓ Endpoint: {}", config.store.firestore_endpoint);
            match open_firestore(&config.store) {
                Ok(store) => count_users(&store).await,
                Err(e) => Err(e),
            }
        }
    };

    println!();
    print!("Testing store connection... ");

    match result {
        Ok(count) => {
            println!("✓ success");
            println!("  {} user document(s) visible", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - The project and database ids are correct");
            println!("  - The access token is valid, or the emulator is running");
            ExitCode::FAILURE
        }
    }
}

async fn count_users<S: DocumentStore>(store: &S) -> Result<usize, StoreError> {
    Ok(store.list(&path::users()?).await?.len())
}
