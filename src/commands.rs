//! Type-safe external command contracts.
//!
//! Every external program a maintenance unit invokes is described by a struct
//! or enum implementing [`SystemCommand`], never by a raw string vector. The
//! struct definition is the contract: program name and argument order live in
//! one place and the runner only ever sees these types.

use strum::{Display, EnumIter, EnumString};

/// Trait for typed external commands.
///
/// # Contract
///
/// - `program()`: executable name, resolved through `PATH` at execution time.
/// - `to_cli_args()`: arguments exactly as the program expects them.
/// - `is_read_only()`: the command only inspects the system. Read-only
///   commands still execute in dry-run mode so previews stay realistic.
pub trait SystemCommand: Send + Sync {
    fn program(&self) -> &'static str;

    fn to_cli_args(&self) -> Vec<String>;

    fn is_read_only(&self) -> bool {
        false
    }

    /// Command line as it would be typed in a shell, for logs.
    fn display(&self) -> String {
        let args = self.to_cli_args();
        if args.is_empty() {
            self.program().to_string()
        } else {
            format!("{} {}", self.program(), args.join(" "))
        }
    }
}

// ============================================================================
// Component store and integrity
// ============================================================================

/// `dism /online /cleanup-image /startcomponentcleanup /norestart`
#[derive(Debug, Clone, Copy, Default)]
pub struct DismComponentCleanup;

impl SystemCommand for DismComponentCleanup {
    fn program(&self) -> &'static str {
        "dism"
    }

    fn to_cli_args(&self) -> Vec<String> {
        [
            "/online",
            "/cleanup-image",
            "/startcomponentcleanup",
            "/norestart",
        ]
        .map(String::from)
        .to_vec()
    }
}

/// `sfc /verifyonly`
#[derive(Debug, Clone, Copy, Default)]
pub struct SfcVerifyOnly;

impl SystemCommand for SfcVerifyOnly {
    fn program(&self) -> &'static str {
        "sfc"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["/verifyonly".to_string()]
    }

    fn is_read_only(&self) -> bool {
        true
    }
}

// ============================================================================
// Disk
// ============================================================================

/// PowerShell `MediaType` value reported for rotational disks.
pub const MEDIA_TYPE_HDD: &str = "3";

/// Queries `(Get-PhysicalDisk -DeviceId N).MediaType` through PowerShell.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskMediaTypeQuery {
    pub device_id: u32,
}

impl SystemCommand for DiskMediaTypeQuery {
    fn program(&self) -> &'static str {
        "powershell"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "-NoProfile".to_string(),
            "-Command".to_string(),
            format!("(Get-PhysicalDisk -DeviceId {}).MediaType", self.device_id),
        ]
    }

    fn is_read_only(&self) -> bool {
        true
    }
}

/// `defrag <volume> /U /X`
#[derive(Debug, Clone)]
pub struct DefragVolume {
    /// Drive letter with colon, e.g. `C:`.
    pub volume: String,
}

impl SystemCommand for DefragVolume {
    fn program(&self) -> &'static str {
        "defrag"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![self.volume.clone(), "/U".to_string(), "/X".to_string()]
    }
}

// ============================================================================
// Network
// ============================================================================

/// The independent steps of a TCP/IP stack reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum NetworkResetStep {
    /// `ipconfig /flushdns`
    FlushDns,
    /// `netsh winsock reset`
    WinsockReset,
    /// `netsh int ip reset`
    IpReset,
}

impl SystemCommand for NetworkResetStep {
    fn program(&self) -> &'static str {
        match self {
            Self::FlushDns => "ipconfig",
            Self::WinsockReset | Self::IpReset => "netsh",
        }
    }

    fn to_cli_args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::FlushDns => &["/flushdns"],
            Self::WinsockReset => &["winsock", "reset"],
            Self::IpReset => &["int", "ip", "reset"],
        };
        args.iter().map(|a| a.to_string()).collect()
    }
}

// ============================================================================
// Services
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ServiceAction {
    /// `sc stop <service>`
    Stop,
    /// `sc config <service> start= disabled`
    Disable,
}

/// Service Control Manager invocation through `sc`.
#[derive(Debug, Clone)]
pub struct ServiceControl {
    pub action: ServiceAction,
    pub service: String,
}

impl ServiceControl {
    pub fn new(action: ServiceAction, service: impl Into<String>) -> Self {
        Self {
            action,
            service: service.into(),
        }
    }
}

impl SystemCommand for ServiceControl {
    fn program(&self) -> &'static str {
        "sc"
    }

    fn to_cli_args(&self) -> Vec<String> {
        match self.action {
            ServiceAction::Stop => vec!["stop".to_string(), self.service.clone()],
            ServiceAction::Disable => vec![
                "config".to_string(),
                self.service.clone(),
                "start=".to_string(),
                "disabled".to_string(),
            ],
        }
    }
}
