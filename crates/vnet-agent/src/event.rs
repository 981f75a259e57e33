//! Structured interface event tracing.
//!
//! Every material transition of a virtual interface (add, delete, activation
//! edges, policy-list churn, resource failures) is emitted as a structured
//! JSON record so the operational history of an interface can be reconstructed
//! after the fact. Records go through `tracing` with a dedicated `vif_trace`
//! target; severity is derived from the event kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categories of interface transition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceKind {
    /// Interface entry created.
    Add,
    /// Interface entry destroyed.
    Delete,
    /// L2 forwarding state installed.
    ActivatedL2,
    /// IPv4 forwarding state installed.
    ActivatedIpv4,
    /// IPv6 forwarding state installed.
    ActivatedIpv6,
    /// L2 forwarding state withdrawn.
    DeactivatedL2,
    /// IPv4 forwarding state withdrawn.
    DeactivatedIpv4,
    /// IPv6 forwarding state withdrawn.
    DeactivatedIpv6,
    /// Floating-IP list membership or state changed.
    FloatingIpChange,
    /// Service-VLAN list membership or state changed.
    ServiceChange,
    /// Mirroring configuration changed.
    MirrorChange,
    /// A resource allocator was exhausted.
    ResourceExhausted,
    /// A message was dropped or partially applied due to conflicting state.
    InconsistentUpdate,
}

impl TraceKind {
    /// True for kinds that indicate degraded or conflicting state.
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            TraceKind::ResourceExhausted | TraceKind::InconsistentUpdate
        )
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TraceKind::Add => "ADD",
            TraceKind::Delete => "DELETE",
            TraceKind::ActivatedL2 => "ACTIVATED_L2",
            TraceKind::ActivatedIpv4 => "ACTIVATED_IPV4",
            TraceKind::ActivatedIpv6 => "ACTIVATED_IPV6",
            TraceKind::DeactivatedL2 => "DEACTIVATED_L2",
            TraceKind::DeactivatedIpv4 => "DEACTIVATED_IPV4",
            TraceKind::DeactivatedIpv6 => "DEACTIVATED_IPV6",
            TraceKind::FloatingIpChange => "FLOATING_IP_CHANGE",
            TraceKind::ServiceChange => "SERVICE_CHANGE",
            TraceKind::MirrorChange => "MIRROR_CHANGE",
            TraceKind::ResourceExhausted => "RESOURCE_EXHAUSTED",
            TraceKind::InconsistentUpdate => "INCONSISTENT_UPDATE",
        };
        write!(f, "{}", s)
    }
}

/// A single interface trace record.
///
/// Records are immutable once built; use the builder methods to attach
/// optional context before emitting with [`trace_log!`](crate::trace_log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// UTC timestamp with microsecond precision.
    pub timestamp: DateTime<Utc>,

    /// Event category.
    pub kind: TraceKind,

    /// Interface identifier (UUID string).
    pub vif: String,

    /// Interface name, if known at emit time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Additional context as key-value pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TraceRecord {
    /// Creates a new record stamped with the current time.
    pub fn new(kind: TraceKind, vif: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            vif: vif.into(),
            name: None,
            details: None,
        }
    }

    /// Attaches the interface name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches structured context.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serializes the record for log transport.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization_failed","message":"{}"}}"#, e))
    }
}

/// Emits a [`TraceRecord`] through `tracing`.
///
/// Warning-class kinds (resource exhaustion, inconsistent updates) log at
/// `warn`; everything else logs at `info`.
///
/// # Usage
/// ```ignore
/// let record = TraceRecord::new(TraceKind::ActivatedL2, vif_id.to_string())
///     .with_name("tap-vm1");
/// trace_log!(record);
/// ```
#[macro_export]
macro_rules! trace_log {
    ($record:expr) => {
        let record = $record;
        if record.kind.is_warning() {
            tracing::warn!(
                target: "vif_trace",
                kind = %record.kind,
                vif = %record.vif,
                trace_json = %record.to_json(),
                "VIF: {} - {}",
                record.kind,
                record.vif
            );
        } else {
            tracing::info!(
                target: "vif_trace",
                kind = %record.kind,
                vif = %record.vif,
                trace_json = %record.to_json(),
                "VIF: {} - {}",
                record.kind,
                record.vif
            );
        }
    };
}

/// Initializes the global subscriber with JSON output.
///
/// Call once at process startup. `RUST_LOG` overrides `log_level`.
pub fn init_logging(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .json(),
        )
        .init();
}

/// Initializes logging with human-readable output for development.
pub fn init_logging_pretty(log_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .init();
}
