use clap::Parser;
use tracing::error;

use gslaunch::cli::Cli;
use gslaunch::loader::{self, Overrides};
use gslaunch::platform::create_platform;
use gslaunch::watch::{Confirmation, StdinConfirmation};
use gslaunch::{logging, SessionOrchestrator};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        error!(%err, "session failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let platform = create_platform();

    if cli.list_displays {
        for display in platform.display.enumerate().await? {
            let mode = platform.display.current_mode(&display).await?;
            let primary = if display.is_at_origin() { " (primary)" } else { "" };
            println!(
                "{}\t{} at ({}, {}){}",
                display.id, mode, display.position.0, display.position.1, primary
            );
        }
        return Ok(());
    }

    // clap guarantees the pair is present outside --list-displays.
    let (Some(width), Some(height)) = (cli.width, cli.height) else {
        anyhow::bail!("width and height are required");
    };

    let file = loader::load_or_create(&cli.config)?;
    let config = file.resolve(Overrides {
        width,
        height,
        refresh_rate: cli.refresh_rate,
        display: cli.display,
        skip_restore: cli.no_restore,
        keep_host: cli.keep_host,
    })?;
    let debug_pause = config.debug;

    let mut orchestrator = SessionOrchestrator::new(config, platform);
    let outcome = orchestrator.run().await;

    if debug_pause {
        let _ = StdinConfirmation
            .acknowledge("Paused for debug review. Press Enter to close.")
            .await;
    }

    outcome.map_err(Into::into)
}
