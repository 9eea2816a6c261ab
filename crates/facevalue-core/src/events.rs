//! # Voucher Events
//!
//! Announcements the issuer makes to the outside world.
//!
//! ```text
//! VoucherIssuer::create ──► insert ──► publish("voucher.created", ..) ──► listeners
//! ```
//!
//! Publishing is fire-and-forget: listeners return nothing and a failing
//! listener must deal with its own errors.

use serde::Serialize;
use tracing::{debug, warn};

use crate::types::Voucher;

/// Event name published after a voucher is inserted.
pub const VOUCHER_CREATED: &str = "voucher.created";

/// Payloads carried by voucher events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoucherEvent {
    Created { voucher: Voucher },
}

impl VoucherEvent {
    /// Name under which this event is published.
    pub fn name(&self) -> &'static str {
        match self {
            VoucherEvent::Created { .. } => VOUCHER_CREATED,
        }
    }
}

/// Receives voucher events (implemented by the surrounding application).
pub trait VoucherEventListener: Send + Sync {
    fn publish(&self, event_name: &str, event: &VoucherEvent);
}

/// No-op listener for testing.
pub struct NoOpListener;

impl VoucherEventListener for NoOpListener {
    fn publish(&self, _event_name: &str, _event: &VoucherEvent) {}
}

/// Writes every event to the log as JSON.
pub struct TracingListener;

impl VoucherEventListener for TracingListener {
    fn publish(&self, event_name: &str, event: &VoucherEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => debug!(event = event_name, %payload, "Voucher event"),
            Err(e) => warn!(event = event_name, error = %e, "Failed to serialize voucher event"),
        }
    }
}
