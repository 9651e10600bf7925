use clap::Parser;
use shareserver::{ShareConfig, ShareServer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Share local files with other devices on your network
#[derive(Parser, Debug)]
#[command(name = "lanshare", version, about)]
struct Cli {
    /// Files to share as soon as the server is up
    files: Vec<PathBuf>,

    /// Port to listen on and advertise in share links (overrides SHARE_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface to bind to (overrides SHARE_BIND_HOST)
    #[arg(long)]
    host: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SHARE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    let _ = dotenv::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut config = match ShareConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            eprintln!("Please check the SHARE_* variables in your .env file");
            std::process::exit(2);
        }
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(host) = cli.host {
        config.bind_host = host;
    }

    let server = ShareServer::new(config);

    for file in &cli.files {
        match server.share_file(file).await {
            Ok(shared) => println!("{}  {}", shared.share_url, shared.file_path.display()),
            Err(e) => eprintln!("Skipping {}: {}", file.display(), e),
        }
    }

    if let Err(e) = server.serve().await {
        tracing::error!("Share server failed: {}", e);
        std::process::exit(1);
    }
}
