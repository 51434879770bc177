//! Telemetry service shutdown.

use std::thread;

use crate::commands::{ServiceAction, ServiceControl};
use crate::outcome::Outcome;
use crate::system::SystemContext;
use crate::task::TaskUnit;

use super::{require_elevation, run_command};

/// Services stopped and disabled by [`TelemetryShutdown`].
pub const TELEMETRY_SERVICES: [&str; 2] = ["DiagTrack", "dmwappushservice"];

/// Stops the telemetry services and disables the ones that stopped.
#[derive(Debug, Clone)]
pub struct TelemetryShutdown {
    ctx: SystemContext,
}

impl TelemetryShutdown {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    /// Returns whether `service` was stopped.
    fn shut_down(&self, service: &str) -> bool {
        let stop = ServiceControl::new(ServiceAction::Stop, service);
        match run_command(&self.ctx, &stop) {
            Ok(output) if output.success => {}
            Ok(output) => {
                tracing::info!("{} not stopped (exit code {})", service, output.code());
                return false;
            }
            Err(_) => return false,
        }

        let disable = ServiceControl::new(ServiceAction::Disable, service);
        match run_command(&self.ctx, &disable) {
            Ok(output) if !output.success => {
                tracing::warn!("{} stopped but not disabled (exit code {})", service, output.code())
            }
            Err(outcome) => tracing::warn!("{} stopped but not disabled: {}", service, outcome),
            Ok(_) => {}
        }
        true
    }
}

impl TaskUnit for TelemetryShutdown {
    fn execute(&self) -> Outcome {
        if let Some(denied) = require_elevation(&self.ctx) {
            return denied;
        }

        let stopped = thread::scope(|s| {
            let handles: Vec<_> = TELEMETRY_SERVICES
                .iter()
                .map(|&service| s.spawn(move || self.shut_down(service)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(false))
                .filter(|&stopped| stopped)
                .count()
        });

        Outcome::success(format!("Telemetría ajustada ({})", stopped))
    }
}
