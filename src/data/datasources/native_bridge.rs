use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::errors::ErrorCodeTable;

/// Purchase-lifecycle event kinds a backend can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NativeEventKind {
    PurchaseUpdated,
    PurchaseError,
    PromotedProductIos,
    UserChoiceBillingAndroid,
}

/// Raw event pushed by the native backend. The payload is an untyped map;
/// normalization happens in the emitter layer before listeners see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeEvent {
    pub kind: NativeEventKind,
    pub payload: Value,
}

/// Receiver for native events, installed once at connection time. Backends
/// must invoke it synchronously, in emission order.
pub type EventSink = Arc<dyn Fn(NativeEvent) + Send + Sync>;

/// Untyped failure reported by a native backend. Carries the backend's own
/// code vocabulary; the error mapper translates it into the canonical
/// [`crate::errors::ErrorCode`] set.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("native bridge call failed: {message}")]
pub struct BridgeError {
    pub code: Option<String>,
    pub message: String,
    pub response_code: Option<i32>,
    pub debug_message: Option<String>,
}

impl BridgeError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_owned),
            message: message.into(),
            response_code: None,
            debug_message: None,
        }
    }
}

/// Handle to one native billing backend (StoreKit or Play Billing).
///
/// The bridge exposes async request/response calls returning plain
/// maps/arrays of primitives; no typed contract is enforced on the native
/// side, so this library treats every response as untyped and shapes it at
/// the boundary. At most one bridge is active per process (see
/// `bridge_resolver`).
#[async_trait]
pub trait NativeBridge: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the backend is actually linked and usable. A backend may load
    /// yet report itself inert, in which case resolution skips it.
    fn is_installed(&self) -> bool;

    /// The backend's error-code constant map, read once at resolution time.
    /// The default is an empty table: every lookup then falls back to
    /// `Unknown`.
    fn error_codes(&self) -> ErrorCodeTable {
        ErrorCodeTable::default()
    }

    /// One native method invocation. `args` and the result are untyped
    /// payloads.
    async fn call(&self, method: &str, args: Value) -> Result<Value, BridgeError>;

    /// Installs the process-wide event sink. Called once at connection time;
    /// a later call replaces the previous sink.
    fn set_event_sink(&self, sink: EventSink);
}
