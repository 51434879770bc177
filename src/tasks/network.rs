//! TCP/IP stack reset.

use std::thread;

use strum::IntoEnumIterator;

use crate::commands::NetworkResetStep;
use crate::outcome::{FailureKind, Outcome};
use crate::system::SystemContext;
use crate::task::TaskUnit;

use super::{require_elevation, run_command};

/// Flushes DNS and resets Winsock and the IP stack, all three concurrently.
#[derive(Debug, Clone)]
pub struct NetworkReset {
    ctx: SystemContext,
}

impl NetworkReset {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    fn run_step(&self, step: NetworkResetStep) -> bool {
        match run_command(&self.ctx, &step) {
            Ok(output) if output.success => true,
            Ok(output) => {
                tracing::warn!("Network step {} exited with {}", step, output.code());
                false
            }
            Err(outcome) => {
                tracing::warn!("Network step {} failed: {}", step, outcome);
                false
            }
        }
    }
}

impl TaskUnit for NetworkReset {
    fn execute(&self) -> Outcome {
        if let Some(denied) = require_elevation(&self.ctx) {
            return denied;
        }

        let steps: Vec<NetworkResetStep> = NetworkResetStep::iter().collect();
        let failed = thread::scope(|s| {
            let handles: Vec<_> = steps
                .iter()
                .map(|&step| s.spawn(move || self.run_step(step)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(false))
                .filter(|ok| !ok)
                .count()
        });

        if failed == 0 {
            Outcome::success("Pila de red restablecida")
        } else {
            Outcome::failure(
                FailureKind::CommandFailed,
                format!(
                    "Pila de red restablecida parcialmente ({} de {} comandos fallaron)",
                    failed,
                    steps.len()
                ),
            )
        }
    }
}
