use anyhow::{Context, Result};
use clap::Parser;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve ranked queries over a dictionary/postings index", long_about = None)]
struct Args {
    /// Directory holding dictionary.txt, postings.txt and meta.json
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app = build_app(&args.index)
        .with_context(|| format!("failed to load index from {}", args.index.display()))?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index.display(), "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_defaults() {
        Args::command().debug_assert();
        assert!(Args::command().get_about().is_some());
        let args = Args::try_parse_from(["server"]).unwrap();
        assert_eq!(args.index, PathBuf::from("./index"));
        assert_eq!(args.port, 8080);
    }
}
