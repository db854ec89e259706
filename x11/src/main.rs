//! Desk Mascot
//!
//! A small sprite that walks along the bottom of the screen, hops now and
//! then, and stops to hold up messages other programs send it.
//!
//! # Usage
//!
//! ```bash
//! # Start on the current display
//! desk-mascot
//!
//! # Slower walk, longer messages, verbose logging
//! MASCOT_TICK_MS=80 MASCOT_PAUSE_MS=8000 RUST_LOG=mascot_core=debug desk-mascot
//! ```
//!
//! # Environment Variables
//!
//! - `DISPLAY`: X display to connect to
//! - `MASCOT_TICK_MS`, `MASCOT_PAUSE_MS`, `MASCOT_JUMP_ODDS`: timing and mood
//! - `MASCOT_WALK_SPEED`, `MASCOT_JUMP_VELOCITY`, `MASCOT_GRAVITY`: motion
//! - `MASCOT_NOTIFY_PROPERTY`: window property carrying notifications
//! - `MASCOT_FONT`: core font for captions
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Graceful shutdown (window and pixmaps are released)

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use mascot_core::{MascotConfig, Scheduler, SpriteStore};
use mascot_x11::X11Session;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mascot_core=info".parse()?)
                .add_directive("mascot_x11=info".parse()?),
        )
        .with_target(true)
        .init();

    info!("Starting desk mascot");

    let config = MascotConfig::from_env();
    config.validate().context("Invalid mascot configuration")?;

    let store = SpriteStore::load().context("Embedded artwork is broken")?;
    let mut session = X11Session::connect(&config, (store.width(), store.height()))
        .context("Failed to set up the mascot window. Is DISPLAY set?")?;
    let frames = store
        .upload(&mut session)
        .context("Failed to upload sprites to the X server")?;
    drop(store);

    let mut scheduler = Scheduler::new(session, frames, config.motion, rand::thread_rng());

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let result = tokio::select! {
        result = scheduler.run() => result.context("Mascot loop failed"),
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down");
            Ok(())
        }
    };

    // Dropping the scheduler releases the window and pixmaps
    drop(scheduler);
    info!("Desk mascot stopped");
    result
}
