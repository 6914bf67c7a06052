//! KMP: knowledge management platform server.

use std::path::PathBuf;
use std::sync::Arc;

use kmp_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("KMP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("KMP: knowledge management platform");
    println!();
    println!("Usage: kmp [command]");
    println!();
    println!("Commands:");
    println!("  (none)    Start the server");
    println!("  help      Show this help message");
    println!();
    println!("Environment:");
    println!("  PORT                  HTTP port (default 3003)");
    println!("  KMP_DATA_DIR          Data directory (default ./data)");
    println!("  KMP_LLM_TIMEOUT_SECS  Timeout per LLM call (default 60)");
    println!("  KMP_MAX_SESSIONS      Live collection sessions kept (default 1000)");
    println!("  OPENAI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {}. Use 'kmp help' for usage.", other);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = kmp_core::KmpConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = kmp_store::SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let state = Arc::new(AppState::new(config, Arc::new(store)));
    if !state.llm_config.read().is_configured() {
        info!("No LLM provider configured; collection runs on local fallbacks");
    }

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("KMP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
