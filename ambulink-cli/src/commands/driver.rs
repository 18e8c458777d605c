//! Driver console.
//!
//! Connects on the driver namespace, prints offers and routes, and keeps
//! the fixed position passed on the command line broadcasting during a call.

use clap::Args;
use tracing::info;

use ambulink::config::ConfigFile;
use ambulink::context::HttpSessionContext;

use super::common::{checked_point, describe_state, shutdown_token, token_store};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct DriverArgs {
    /// Access token of a logged-in driver
    #[arg(long)]
    pub access_token: String,

    /// Refresh token of the same session
    #[arg(long)]
    pub refresh_token: String,

    /// Fixed ambulance latitude
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Fixed ambulance longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Accept every offer as soon as it arrives
    #[arg(long)]
    pub auto_accept: bool,
}

pub async fn run(args: DriverArgs, config: &ConfigFile) -> Result<(), CliError> {
    let position = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Some(checked_point(lat, lon)?),
        _ => None,
    };
    let store = token_store(args.access_token, args.refresh_token);
    let mut context = HttpSessionContext::from_config(config, store)?;
    let shutdown = shutdown_token()?;

    println!("Connecting to {} as driver...", context.hosts().current());
    let driver = context.connect_driver()?;
    if let Some(position) = position {
        driver.update_location(position);
    }

    driver.on_connection_changed(|connected| {
        if *connected {
            println!("Connected to dispatch");
        } else {
            println!("Connection lost, reconnecting...");
        }
    });
    driver.on_offer(|offer| {
        println!(
            "Offer {}: {} ({:.0} m, {:.0} s away, priority {})",
            offer.call_id, offer.description, offer.distance_meters, offer.eta_seconds, offer.priority
        );
    });
    driver.on_route(|route| {
        println!(
            "Route: {} points, {:.0} m, {:.0} s",
            route.point_count(),
            route.distance_meters,
            route.duration_seconds
        );
    });

    let mut auto_accept = AutoAccept::default();
    let mut last = driver.state();
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = driver.next_event() => event,
        };
        let Some(event) = event else {
            break;
        };
        driver.handle_event(event);

        if args.auto_accept {
            let pending = driver.pending_offer().map(|offer| offer.call_id.as_str());
            if let Some(call_id) = auto_accept.take_offer(pending) {
                match driver.accept_call(&call_id).await {
                    Ok(()) => println!("Accepted call {}", call_id),
                    Err(e) => eprintln!("Could not accept call {}: {}", call_id, e),
                }
            }
        }

        let state = driver.state();
        if state != last {
            println!("{}", describe_state(&state));
            last = state;
        }
    }

    info!("Driver console stopping");
    context.driver().disconnect();
    println!("Disconnected");
    Ok(())
}

/// Picks offers to accept, answering each call id at most once.
#[derive(Debug, Default)]
struct AutoAccept {
    last_attempt: Option<String>,
}

impl AutoAccept {
    /// The pending offer to accept, unless it was already tried.
    fn take_offer(&mut self, pending: Option<&str>) -> Option<String> {
        let call_id = pending?;
        if self.last_attempt.as_deref() == Some(call_id) {
            return None;
        }
        self.last_attempt = Some(call_id.to_string());
        Some(call_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_offer_is_not_retried() {
        let mut auto_accept = AutoAccept::default();
        assert_eq!(auto_accept.take_offer(Some("c1")).as_deref(), Some("c1"));
        assert_eq!(auto_accept.take_offer(Some("c1")), None);
        assert_eq!(auto_accept.take_offer(None), None);
    }

    #[test]
    fn test_new_offer_is_accepted() {
        let mut auto_accept = AutoAccept::default();
        auto_accept.take_offer(Some("c1"));
        assert_eq!(auto_accept.take_offer(Some("c2")).as_deref(), Some("c2"));
    }
}
