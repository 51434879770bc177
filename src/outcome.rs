//! Task outcomes.
//!
//! Every task unit returns an [`Outcome`]. Success and handled failure are the
//! same shape of data as far as the engine is concerned; the tag exists so
//! automation consumers can branch on [`FailureKind`] without matching on text.
//! The rendered text (`Display`) is the message alone, which is what an
//! operator reads in the report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use strum::{Display, EnumIter, EnumString};

/// Text reported when an operation needs administrator rights it does not have.
pub const ACCESS_DENIED: &str = "Acceso denegado: se requieren privilegios de administrador";

/// Text reported for tasks that were never started because the run was cancelled.
pub const CANCELLED_BEFORE_START: &str = "Cancelado antes de iniciar";

/// Why a task failed, as decided by the unit itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Missing privileges (elevation or filesystem ACLs)
    PermissionDenied,
    /// A path or external binary does not exist
    NotFound,
    /// A required environment variable is unset
    MissingEnvironment,
    /// An external command ran but reported failure
    CommandFailed,
    /// The run was cancelled before the task started
    Cancelled,
}

/// Result of executing one task unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { message: String },
    Failure { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// The access-denied failure used by every unit that needs elevation.
    pub fn access_denied() -> Self {
        Self::failure(FailureKind::PermissionDenied, ACCESS_DENIED)
    }

    /// Entry recorded for a task skipped by cooperative cancellation.
    pub fn cancelled() -> Self {
        Self::failure(FailureKind::Cancelled, CANCELLED_BEFORE_START)
    }

    /// Map an I/O fault onto a failure, prefixing `context` to the message.
    ///
    /// Permission faults always render as the access-denied text when no
    /// context is given, so operators see one consistent message.
    pub fn from_io_error(context: &str, err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            io::ErrorKind::NotFound => FailureKind::NotFound,
            _ => FailureKind::CommandFailed,
        };
        let message = match (kind, context.is_empty()) {
            (FailureKind::PermissionDenied, true) => ACCESS_DENIED.to_string(),
            (_, true) => err.to_string(),
            (_, false) => format!("{}: {}", context, err),
        };
        Self::failure(kind, message)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Human-readable projection of the outcome.
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message } | Self::Failure { message, .. } => message,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message_only() {
        let ok = Outcome::success("173 elementos purgados");
        assert_eq!(ok.to_string(), "173 elementos purgados");

        let denied = Outcome::access_denied();
        assert_eq!(denied.to_string(), ACCESS_DENIED);
        assert_eq!(denied.failure_kind(), Some(FailureKind::PermissionDenied));
    }

    #[test]
    fn test_from_io_error_maps_kinds() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(Outcome::from_io_error("", &err), Outcome::access_denied());

        let err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let outcome = Outcome::from_io_error("Directorio no encontrado", &err);
        assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));
        assert_eq!(outcome.message(), "Directorio no encontrado: no such file");

        let err = io::Error::other("boom");
        assert_eq!(
            Outcome::from_io_error("", &err).failure_kind(),
            Some(FailureKind::CommandFailed)
        );
    }

    #[test]
    fn test_json_is_tagged() {
        let outcome = Outcome::failure(FailureKind::NotFound, "dism no disponible");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["message"], "dism no disponible");

        let json = serde_json::to_value(Outcome::success("ok")).unwrap();
        assert_eq!(json["status"], "success");
    }

    #[test]
    fn test_failure_kind_parses_from_display() {
        let kind: FailureKind = "missing_environment".parse().unwrap();
        assert_eq!(kind, FailureKind::MissingEnvironment);
        assert_eq!(FailureKind::CommandFailed.to_string(), "command_failed");
    }
}
