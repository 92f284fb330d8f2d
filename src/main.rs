// This is the entry point of the document moderation function.
//
// **Architecture Overview:**
// - `core/` = Moderation workflow and the ports it talks to (platform-agnostic)
// - `infra/` = Implementations of those ports (Gemini, Appwrite, image fetch)
//
// One process handles one event. This file's job is to:
// 1. Load configuration
// 2. Initialize clients (dependency injection)
// 3. Read the raw event bytes from stdin and run the invocation
// 4. Print the structured result as one JSON line on stdout (logs go to stderr)

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::AppConfig;
use crate::core::moderation::{InvocationResult, ModerationService};
use crate::infra::ai::GeminiClient;
use crate::infra::appwrite::AppwriteClient;
use crate::infra::images::HttpImageFetcher;
use anyhow::Context;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

const USER_AGENT: &str = concat!("doc-moderator/", env!("CARGO_PKG_VERSION"));

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the result, so logs must not go there.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_http_client(config: &AppConfig) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = config.http_timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}

type Service = ModerationService<GeminiClient, HttpImageFetcher, AppwriteClient>;

fn build_service() -> anyhow::Result<Service> {
    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // One shared HTTP client; every collaborator gets a clone of it.

    let http = build_http_client(&config)?;

    let model = GeminiClient::new(
        http.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    )
    .with_base_url(config.gemini_base_url.as_str());

    let store = AppwriteClient::new(
        http.clone(),
        &config.appwrite_endpoint,
        &config.appwrite_project_id,
        &config.appwrite_api_key,
    )
    .context("Failed to initialize Appwrite client")?;

    let images = HttpImageFetcher::new(http);

    Ok(ModerationService::new(model, images, store))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env first so RUST_LOG from it applies to the subscriber.
    dotenv::dotenv().ok();
    init_tracing();

    // Only setup failures exit non-zero; anything about the event itself is
    // reported as a result.
    let service = match build_service() {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            println!("{}", InvocationResult::error(format!("{:#}", e)).to_json());
            return ExitCode::FAILURE;
        }
    };

    let mut body = Vec::new();
    let result = match tokio::io::stdin().read_to_end(&mut body).await {
        Ok(_) => service.handle_event(&body).await,
        Err(e) => {
            tracing::error!("Failed to read event from stdin: {}", e);
            InvocationResult::error(format!("Failed to read event from stdin: {e}"))
        }
    };

    println!("{}", result.to_json());
    ExitCode::SUCCESS
}
