//! Rider console: follows dispatch and the ambulance position.

use clap::Args;
use tracing::info;

use ambulink::config::ConfigFile;
use ambulink::context::HttpSessionContext;

use super::common::{describe_state, shutdown_token, token_store};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct RiderArgs {
    /// Access token of a logged-in rider
    #[arg(long)]
    pub access_token: String,

    /// Refresh token of the same session
    #[arg(long)]
    pub refresh_token: String,
}

pub async fn run(args: RiderArgs, config: &ConfigFile) -> Result<(), CliError> {
    let store = token_store(args.access_token, args.refresh_token);
    let mut context = HttpSessionContext::from_config(config, store)?;
    let shutdown = shutdown_token()?;

    println!("Connecting to {} as rider...", context.hosts().current());
    let rider = context.connect_rider()?;

    rider.on_connection_changed(|connected| {
        if *connected {
            println!("Connected to dispatch");
        } else {
            println!("Connection lost, reconnecting...");
        }
    });
    rider.on_dispatched(|state| println!("Ambulance dispatched: {}", describe_state(state)));
    rider.on_ambulance_location(|position| println!("Ambulance at {}", position));
    rider.on_status(|status| println!("Status: {}", status));

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = rider.next_event() => event,
        };
        match event {
            Some(event) => rider.handle_event(event),
            None => break,
        }
    }

    info!("Rider console stopping");
    context.rider().disconnect();
    println!("Disconnected");
    Ok(())
}
