//! Safety listener interface
//!
//! Defines the listener trait for engine notifications. Listeners are called
//! synchronously from `process`, once per line when applicable.

use crate::engine::ProcessResult;
use std::sync::Arc;

/// Handle for a registered safety listener.
///
/// Uniquely identifies a listener subscription. Can be used to unsubscribe
/// from engine notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafetyListenerHandle(pub String);

/// Listener trait for safety engine events
pub trait SafetyListener: Send + Sync {
    /// Called when a line was rewritten
    fn on_fix(&self, _result: &ProcessResult) {}

    /// Called for every warning raised on a line
    fn on_warning(&self, _warning: &str) {}

    /// Called when a line must not be transmitted
    fn on_block(&self, _result: &ProcessResult) {}
}

/// Shared listener reference
pub type SafetyListenerRef = Arc<dyn SafetyListener>;
