use clap::Parser;
use journey_capture::cli::commands::{
    cmd_export, cmd_import, cmd_replay, cmd_reset, cmd_status, start_service,
};
use journey_capture::cli::config::{Cli, Commands, load_config};
use journey_capture::navigation::channel::InMemoryChannel;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let channel = InMemoryChannel::new();
    let handle = start_service(
        &config,
        cli.store.as_deref(),
        cli.platform.as_deref(),
        channel.clone(),
    )
    .await?;

    let ok = match cli.command {
        Commands::Replay { script, output } => {
            cmd_replay(&handle, channel, &script, output.as_deref(), cli.verbose).await?
        }
        Commands::Export { output } => cmd_export(&handle, output.as_deref()).await?,
        Commands::Import { input } => {
            cmd_import(&handle, &input).await?;
            true
        }
        Commands::Reset { session } => {
            cmd_reset(&handle, session).await?;
            true
        }
        Commands::Status => {
            cmd_status(&handle).await?;
            true
        }
    };

    handle.shutdown().await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// `-v` → info, `-vv` → debug, `-vvv` → trace; `RUST_LOG` wins when set.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
