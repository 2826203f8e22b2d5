use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use storegate_cli::{App, DEFAULT_STATE_FILE};
use storegate_gate::GateConfig;
use storegate_session::{Credentials, FileTokenStore, HttpAuthClient};

#[derive(Parser, Debug)]
#[command(name = "storegate-cli")]
#[command(about = "Run the storefront route gates against a saved session")]
struct Args {
    /// Durable session file holding the token and cached identity
    #[arg(long, env = "STOREGATE_STATE_FILE", default_value = DEFAULT_STATE_FILE)]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the edge and in-app gates for a path
    Check { path: String },
    /// Sign in and save the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and clear the saved session
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storegate_observability::init();

    let args = Args::parse();

    let config = GateConfig::from_env().context("failed to load route table")?;
    let durable = Arc::new(FileTokenStore::new(&args.state_file));
    let backend = Arc::new(HttpAuthClient::from_env());
    tracing::info!(
        state_file = ?args.state_file,
        api_url = backend.api_url(),
        "storegate-cli starting"
    );

    let app = App::new(&config, durable, backend).context("invalid route table")?;

    let output = match args.command {
        Command::Check { path } => serde_json::to_value(app.check(&path).await)?,
        Command::Login { email, password } => {
            let state = app
                .login(&Credentials { email, password })
                .await
                .context("sign-in failed")?;
            serde_json::to_value(state)?
        }
        Command::Logout => serde_json::to_value(app.logout().await)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
