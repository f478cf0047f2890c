use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

mod context;
mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "neonbot")]
#[command(author, version, about = "NeonBot - Discord karaoke bot")]
pub struct Args {
    /// Discord bot token.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    discord_token: String,

    /// Genius API token; without it only lyrics.ovh is used.
    #[arg(long, env = "GENIUS_API_TOKEN", hide_env_values = true)]
    genius_token: Option<String>,

    /// Prefix for text commands.
    #[arg(long, default_value = "+")]
    prefix: String,

    /// Directory holding settings.json.
    #[arg(long, default_value = "data")]
    data_dir: String,

    /// Port for the keepalive HTTP endpoint.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    keepalive_port: u16,

    #[arg(long, default_value = "false")]
    no_keepalive: bool,

    #[arg(long, default_value = "false")]
    no_status_rotation: bool,

    /// Extra tracing directives, e.g. `neonbot_core=debug`.
    #[arg(long, env = "RUST_LOG")]
    log_filter: Option<String>,
}

fn init_tracing(extra: Option<&str>) {
    // Route `log` records from dependencies into tracing.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("log bridge already installed: {e}");
    }

    let mut filter = EnvFilter::new("neonbot=info,neonbot_core=info,neonbot_server=info");
    for directive in extra.unwrap_or_default().split(',').filter(|d| !d.trim().is_empty()) {
        match directive.trim().parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("ignoring bad log directive '{directive}': {e}"),
        }
    }
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal in production.
    let dotenv_result = dotenv::dotenv();
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());

    if let Err(e) = dotenv_result {
        info!("No .env file loaded ({e})");
    }
    info!(
        "NeonBot starting. prefix='{}', data_dir='{}', keepalive={}, status_rotation={}",
        args.prefix,
        args.data_dir,
        !args.no_keepalive,
        !args.no_status_rotation
    );

    if let Err(e) = server::run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    Ok(())
}
