mod config;
mod driver;
mod error;

use std::path::PathBuf;

use clap::Parser;
use runtime::{McpToolHost, OpenAiBackend, Session};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use config::Config;
use driver::Driver;
use error::{Error, Result};

#[derive(Parser)]
#[command(name = "toolchat")]
#[command(about = "Chat with a model that can call MCP tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./toolchat.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to use, overriding config and environment
    #[arg(short, long)]
    model: Option<String>,

    /// Run one turn with this prompt before reading input
    #[arg(long)]
    prime: Option<String>,
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; the process environment still applies.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::discover(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(model) = cli.model {
        config.backend.model = model;
    }

    let backend = OpenAiBackend::builder(config.api_key()?, &config.backend.model)
        .base_url(&config.backend.base_url)
        .max_tokens(config.backend.max_tokens)
        .build();
    info!(%backend, "model backend configured");

    let server = &config.server;
    let tools = McpToolHost::spawn(&server.command, &server.args)
        .await
        .map_err(|e| Error::Connect {
            command: server.command.clone(),
            reason: e.to_string(),
        })?;
    info!(command = %server.command, args = ?server.args, "connected to tool server");

    let session = Session::new(backend, tools, config.system_prompt.as_str());
    info!(session = %session.id, "chat session ready");

    let mut driver = Driver::new(session).with_prime(cli.prime);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    driver.run(stdin, &mut stdout).await?;

    info!(
        state = ?driver.state(),
        messages = driver.session().messages().len(),
        "session ended"
    );
    Ok(())
}
