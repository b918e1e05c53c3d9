use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::{
    data::datasources::native_bridge::NativeBridge,
    errors::{ErrorCode, PurchaseError},
};

/// Failure to load a bridge candidate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeLoadError {
    /// The backing module is not linked into this build.
    #[error("native module not found")]
    NotFound,
    #[error("native module failed to load: {0}")]
    Failed(String),
}

type LoadFn = Box<dyn Fn() -> Result<Arc<dyn NativeBridge>, BridgeLoadError> + Send + Sync>;

/// One native backend candidate, tried in registration order.
pub struct BridgeCandidate {
    pub name: &'static str,
    /// Optional candidates are skipped on [`BridgeLoadError::NotFound`];
    /// for required candidates that is fatal, like any other load failure.
    pub optional: bool,
    load: LoadFn,
}

impl BridgeCandidate {
    pub fn new(
        name: &'static str,
        optional: bool,
        load: impl Fn() -> Result<Arc<dyn NativeBridge>, BridgeLoadError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            optional,
            load: Box::new(load),
        }
    }
}

/// Priority-ordered list of backend candidates. Convention: the specialized
/// backend is registered first, the general fallback second.
#[derive(Default)]
pub struct BridgeRegistry {
    candidates: Vec<BridgeCandidate>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, candidate: BridgeCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Tries candidates in priority order and returns the first one that
    /// loads and self-reports as installed.
    ///
    /// `NotFound` on an optional candidate moves on to the next; any other
    /// load failure aborts resolution. When no candidate is accepted the
    /// unified surface must treat the result as an unrecoverable
    /// initialization error, never a silent no-op.
    pub fn resolve(&self) -> Result<Arc<dyn NativeBridge>, PurchaseError> {
        for candidate in &self.candidates {
            match (candidate.load)() {
                Ok(bridge) if bridge.is_installed() => {
                    tracing::debug!(backend = candidate.name, "native billing backend resolved");
                    return Ok(bridge);
                }
                Ok(_) => {
                    // Loaded but inert; try the next candidate.
                    tracing::debug!(
                        backend = candidate.name,
                        "backend loaded but reports itself unavailable, skipping"
                    );
                }
                Err(BridgeLoadError::NotFound) if candidate.optional => {
                    tracing::debug!(backend = candidate.name, "optional backend not found, skipping");
                }
                Err(BridgeLoadError::NotFound) => {
                    return Err(PurchaseError::new(
                        ErrorCode::InitConnection,
                        format!(
                            "unified-iap: required native billing backend {:?} is not linked",
                            candidate.name
                        ),
                    ));
                }
                Err(BridgeLoadError::Failed(reason)) => {
                    return Err(PurchaseError::new(
                        ErrorCode::InitConnection,
                        format!(
                            "unified-iap: native billing backend {:?} failed to load: {reason}",
                            candidate.name
                        ),
                    ));
                }
            }
        }
        Err(PurchaseError::new(
            ErrorCode::InitConnection,
            "unified-iap: no native billing backend is available on this device",
        ))
    }
}

static ACTIVE_BRIDGE: OnceCell<Arc<dyn NativeBridge>> = OnceCell::new();

/// Resolves the process-wide bridge handle, memoizing the first successful
/// resolution for the process lifetime. Later calls return the memoized
/// handle and ignore the registry.
pub fn resolve_native_bridge(
    registry: &BridgeRegistry,
) -> Result<Arc<dyn NativeBridge>, PurchaseError> {
    ACTIVE_BRIDGE.get_or_try_init(|| registry.resolve()).cloned()
}
