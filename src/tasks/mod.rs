//! The default maintenance catalog.
//!
//! Each unit is a small struct holding a clone of the [`SystemContext`] it was
//! built with, so elevation, paths, dry-run and the command runner are fixed
//! when the registry is assembled. Units are total: every fault ends up in the
//! returned [`Outcome`].
//!
//! - `purge`: temp, Prefetch and Windows Update cache purges
//! - `maintenance`: DISM, defragmentation and SFC
//! - `network`: TCP/IP stack reset
//! - `services`: telemetry service shutdown

pub mod maintenance;
pub mod network;
pub mod purge;
pub mod services;

use std::io;

use crate::command_runner::CommandOutput;
use crate::commands::SystemCommand;
use crate::error::EngineError;
use crate::outcome::{FailureKind, Outcome};
use crate::registry::TaskRegistry;
use crate::system::SystemContext;
use crate::task::TaskDescriptor;

pub use maintenance::{ComponentCleanup, DiskDefrag, IntegrityCheck};
pub use network::NetworkReset;
pub use purge::{PrefetchPurge, PurgeStats, TempPurge, UpdateCachePurge};
pub use services::TelemetryShutdown;

pub const TEMP_PURGE: &str = "Limpiar Archivos Temporales";
pub const COMPONENT_CLEANUP: &str = "Limpieza WinSxS (DISM)";
pub const PREFETCH_PURGE: &str = "Optimizar RAM & Prefetch";
pub const DISK_DEFRAG: &str = "Desfragmentar HDD";
pub const NETWORK_RESET: &str = "Reset Pila TCP/IP";
pub const UPDATE_CACHE_PURGE: &str = "Limpiar Windows Update";
pub const TELEMETRY_SHUTDOWN: &str = "Desactivar Telemetría";
pub const INTEGRITY_CHECK: &str = "Verificación SFC";

/// Build the eight-task catalog bound to `ctx`.
pub fn default_registry(ctx: &SystemContext) -> Result<TaskRegistry, EngineError> {
    let mut registry = TaskRegistry::new();

    registry.register(
        TaskDescriptor::new(TEMP_PURGE, "Eliminación paralela rápida de %TEMP%").parallel(true),
        TempPurge::new(ctx.clone()),
    )?;
    registry.register(
        TaskDescriptor::new(COMPONENT_CLEANUP, "Limpieza de componentes (Pesado)").critical(true),
        ComponentCleanup::new(ctx.clone()),
    )?;
    registry.register(
        TaskDescriptor::new(PREFETCH_PURGE, "Borrado masivo de caché").parallel(true),
        PrefetchPurge::new(ctx.clone()),
    )?;
    registry.register(
        TaskDescriptor::new(DISK_DEFRAG, "Solo si es HDD (Bloqueante)"),
        DiskDefrag::new(ctx.clone()),
    )?;
    registry.register(
        TaskDescriptor::new(NETWORK_RESET, "Comandos de red en paralelo").parallel(true),
        NetworkReset::new(ctx.clone()),
    )?;
    registry.register(
        TaskDescriptor::new(UPDATE_CACHE_PURGE, "Borrado de caché de updates")
            .critical(true)
            .parallel(true),
        UpdateCachePurge::new(ctx.clone()),
    )?;
    registry.register(
        TaskDescriptor::new(TELEMETRY_SHUTDOWN, "Stop servicios rápido")
            .critical(true)
            .parallel(true)
            .enabled_by_default(false),
        TelemetryShutdown::new(ctx.clone()),
    )?;
    registry.register(
        TaskDescriptor::new(INTEGRITY_CHECK, "Scan rápido de integridad").parallel(true),
        IntegrityCheck::new(ctx.clone()),
    )?;

    tracing::debug!("Default catalog built with {} tasks", registry.len());
    Ok(registry)
}

/// `Some(access denied)` when the context lacks administrator rights.
fn require_elevation(ctx: &SystemContext) -> Option<Outcome> {
    if ctx.is_elevated() {
        None
    } else {
        Some(Outcome::access_denied())
    }
}

/// Run `command`, mapping a spawn fault onto the outcome the unit returns.
fn run_command(ctx: &SystemContext, command: &dyn SystemCommand) -> Result<CommandOutput, Outcome> {
    ctx.runner.run(command).map_err(|err| {
        tracing::warn!("{:#}", err);
        match err.downcast_ref::<io::Error>().map(io::Error::kind) {
            Some(io::ErrorKind::NotFound) => Outcome::failure(
                FailureKind::NotFound,
                format!("{} no disponible", command.program()),
            ),
            Some(io::ErrorKind::PermissionDenied) => Outcome::access_denied(),
            _ => Outcome::failure(FailureKind::CommandFailed, format!("{:#}", err)),
        }
    })
}

/// Failure for a command that ran but exited non-zero.
fn command_failed(label: &str, output: &CommandOutput) -> Outcome {
    Outcome::failure(
        FailureKind::CommandFailed,
        format!("{} falló (código {})", label, output.code()),
    )
}
