use clap::Parser;
use log::info;
use server::game::GameConfig;
use server::network::Server;
use server::registry::SpawnMode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Maximum number of players connected at once
    #[arg(long, default_value = "64")]
    max_players: usize,

    /// Where newly connected players appear
    #[arg(long, value_enum, default_value_t = SpawnMode::EntryBand)]
    spawn_mode: SpawnMode,

    /// Send each stone's step order to clients
    #[arg(long)]
    reveal_step_order: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = GameConfig {
        max_players: args.max_players,
        spawn_mode: args.spawn_mode,
        reveal_step_order: args.reveal_step_order,
    };
    info!("Starting server with {:?}", config);

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, config).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
