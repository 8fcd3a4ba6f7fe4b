use anyhow::Result;
use caia::{config, llm, Session};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "caia")]
#[command(about = "Chat with Claude and let it create, edit and read workspace files")]
#[command(version)]
struct Args {
    /// Workspace directory to index and operate in
    #[arg(long)]
    workspace: Option<String>,

    /// Model to use instead of the configured one
    #[arg(long)]
    model: Option<String>,

    /// Don't print the help banner on startup
    #[arg(long)]
    no_banner: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the conversation on stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caia=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    config::load_env_files();
    let mut config = config::load_config()?;

    if let Some(workspace) = args.workspace {
        config.workspace.root = workspace;
    }
    if let Some(model) = args.model {
        config.llm.model = model;
    }
    if args.no_banner {
        config.ui.show_banner = false;
    }

    let client = llm::create_client(&config)?;

    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    let mut session = Session::new(client, config, stdin, stdout);
    session.run().await?;

    Ok(())
}
