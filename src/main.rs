//! Courses Auth - resource server and login helper
//!
//! Bearer-token protected course API backed by a hosted OIDC provider.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courses_auth::client::{
    ClientConfig, HeadlessAgent, HostedProvider, SessionManager, SessionOptions,
};
use courses_auth::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "courses-auth")]
#[command(about = "OIDC-protected course API")]
struct Cli {
    /// YAML config file (default: ./config.yaml)
    #[arg(short, long, global = true, env = "COURSES_AUTH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the resource server
    Serve {
        /// Port to listen on (overrides config.yaml / SERVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the provider login URL a browser would be sent to
    LoginUrl {
        /// In-app location to come back to after login
        #[arg(long, default_value = "/")]
        return_to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,courses_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server_port = port;
            }
            courses_auth::start_server(config).await
        }
        Commands::LoginUrl { return_to } => print_login_url(&config, &return_to),
    }
}

fn print_login_url(config: &Config, return_to: &str) -> Result<()> {
    let client_config = ClientConfig::from_config(config).context("Invalid client configuration")?;
    let options = SessionOptions::from(&client_config);
    let provider = Arc::new(HostedProvider::new(client_config)?);
    let agent = Arc::new(HeadlessAgent::new(return_to));

    let session = SessionManager::new(provider, agent.clone(), options);
    session.login();

    let url = agent
        .last_redirect()
        .context("Login did not produce a redirect")?;
    println!("{url}");
    Ok(())
}
