//! Units that drive a single heavyweight system tool: DISM, defrag and SFC.
//!
//! All three need administrator rights and refuse to start without them.

use crate::commands::{
    DefragVolume, DiskMediaTypeQuery, DismComponentCleanup, MEDIA_TYPE_HDD, SfcVerifyOnly,
};
use crate::outcome::Outcome;
use crate::system::SystemContext;
use crate::task::TaskUnit;

use super::{command_failed, require_elevation, run_command};

/// Volume defragmented when the system disk is rotational.
pub const SYSTEM_VOLUME: &str = "C:";

/// WinSxS component store cleanup through DISM.
#[derive(Debug, Clone)]
pub struct ComponentCleanup {
    ctx: SystemContext,
}

impl ComponentCleanup {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }
}

impl TaskUnit for ComponentCleanup {
    fn execute(&self) -> Outcome {
        if let Some(denied) = require_elevation(&self.ctx) {
            return denied;
        }

        match run_command(&self.ctx, &DismComponentCleanup) {
            Ok(output) if output.success => Outcome::success("WinSxS optimizado"),
            Ok(output) => command_failed("DISM", &output),
            Err(outcome) => outcome,
        }
    }
}

/// Defragments the system volume, but only when disk 0 is an HDD.
#[derive(Debug, Clone)]
pub struct DiskDefrag {
    ctx: SystemContext,
}

impl DiskDefrag {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }

    /// A failed or unparseable query counts as "not an HDD".
    fn system_disk_is_hdd(&self) -> bool {
        match run_command(&self.ctx, &DiskMediaTypeQuery { device_id: 0 }) {
            Ok(output) if output.success => output.stdout.trim() == MEDIA_TYPE_HDD,
            Ok(output) => {
                tracing::warn!("Media type query exited with {}", output.code());
                false
            }
            Err(_) => false,
        }
    }
}

impl TaskUnit for DiskDefrag {
    fn execute(&self) -> Outcome {
        if let Some(denied) = require_elevation(&self.ctx) {
            return denied;
        }

        if !self.system_disk_is_hdd() {
            return Outcome::success("SSD detectado (Omitido)");
        }

        let defrag = DefragVolume {
            volume: SYSTEM_VOLUME.to_string(),
        };
        match run_command(&self.ctx, &defrag) {
            Ok(output) if output.success => Outcome::success("HDD optimizado"),
            Ok(output) => command_failed("Desfragmentación", &output),
            Err(outcome) => outcome,
        }
    }
}

/// Read-only system file integrity scan.
#[derive(Debug, Clone)]
pub struct IntegrityCheck {
    ctx: SystemContext,
}

impl IntegrityCheck {
    pub fn new(ctx: SystemContext) -> Self {
        Self { ctx }
    }
}

impl TaskUnit for IntegrityCheck {
    fn execute(&self) -> Outcome {
        if let Some(denied) = require_elevation(&self.ctx) {
            return denied;
        }

        match run_command(&self.ctx, &SfcVerifyOnly) {
            Ok(output) if output.success => Outcome::success("Integridad verificada"),
            Ok(output) => command_failed("SFC", &output),
            Err(outcome) => outcome,
        }
    }
}
