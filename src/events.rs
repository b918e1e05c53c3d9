//! Purchase-lifecycle event distribution.
//!
//! The resolved bridge pushes raw [`NativeEvent`]s into an [`EventEmitter`]
//! through the installed sink; the emitter normalizes each payload and fans
//! it out to registered listeners synchronously, in emission order.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use tracing::{debug, warn};

use crate::{
    data::{
        datasources::native_bridge::{EventSink, NativeEvent, NativeEventKind},
        models::normalize::{normalize_product, normalize_purchase},
    },
    domain::entities::{
        alternative_billing::UserChoiceBillingDetailsAndroid, platform::IapPlatform,
        product::Product, purchase::Purchase,
    },
    errors::{user_friendly_message, ErrorCode, ErrorCodeMapper, PurchaseError},
};

/// Handle returned by listener registration. Dropping it does NOT detach the
/// listener; call [`EventSubscription::remove`].
pub struct EventSubscription {
    remover: Option<Box<dyn FnOnce() + Send>>,
}

impl EventSubscription {
    fn new(remover: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remover: Some(Box::new(remover)),
        }
    }

    /// Inert subscription, handed out when registration was refused (wrong
    /// platform). Removing it is a no-op.
    fn noop() -> Self {
        Self { remover: None }
    }

    /// Detaches the listener. Idempotent.
    pub fn remove(mut self) {
        if let Some(remover) = self.remover.take() {
            remover();
        }
    }
}

/// Ordered listener list for one event kind. Listeners fire in registration
/// order; removal never disturbs the order of the rest.
struct ListenerRegistry<T> {
    listeners: Mutex<Vec<(u64, Arc<dyn Fn(&T) + Send + Sync>)>>,
}

impl<T> ListenerRegistry<T> {
    fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, id: u64, listener: Arc<dyn Fn(&T) + Send + Sync>) {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).push((id, listener));
    }

    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn emit(&self, payload: &T) {
        // Snapshot under the lock, invoke outside it, so a listener can
        // register or remove listeners without deadlocking.
        let snapshot: Vec<_> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(payload);
        }
    }

    fn clear(&self) {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

struct EmitterInner {
    platform: IapPlatform,
    mapper: ErrorCodeMapper,
    next_id: AtomicU64,
    purchase_updated: ListenerRegistry<Purchase>,
    purchase_error: ListenerRegistry<PurchaseError>,
    promoted_product_ios: ListenerRegistry<Product>,
    user_choice_billing_android: ListenerRegistry<UserChoiceBillingDetailsAndroid>,
}

/// Fan-out hub for the four purchase-lifecycle events. Cheap to clone; all
/// clones share the same listener registries.
#[derive(Clone)]
pub struct EventEmitter {
    inner: Arc<EmitterInner>,
}

impl EventEmitter {
    pub fn new(platform: IapPlatform, mapper: ErrorCodeMapper) -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                platform,
                mapper,
                next_id: AtomicU64::new(0),
                purchase_updated: ListenerRegistry::new(),
                purchase_error: ListenerRegistry::new(),
                promoted_product_ios: ListenerRegistry::new(),
                user_choice_billing_android: ListenerRegistry::new(),
            }),
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn add_purchase_updated_listener(
        &self,
        listener: impl Fn(&Purchase) + Send + Sync + 'static,
    ) -> EventSubscription {
        let id = self.next_id();
        self.inner.purchase_updated.add(id, Arc::new(listener));
        let inner = Arc::clone(&self.inner);
        EventSubscription::new(move || inner.purchase_updated.remove(id))
    }

    pub fn add_purchase_error_listener(
        &self,
        listener: impl Fn(&PurchaseError) + Send + Sync + 'static,
    ) -> EventSubscription {
        let id = self.next_id();
        self.inner.purchase_error.add(id, Arc::new(listener));
        let inner = Arc::clone(&self.inner);
        EventSubscription::new(move || inner.purchase_error.remove(id))
    }

    /// iOS-only event: registering on any other running platform logs a
    /// warning and returns an inert subscription.
    pub fn add_promoted_product_listener_ios(
        &self,
        listener: impl Fn(&Product) + Send + Sync + 'static,
    ) -> EventSubscription {
        if self.inner.platform != IapPlatform::Ios {
            warn!(
                platform = %self.inner.platform,
                "promoted-product-ios listener ignored on this platform"
            );
            return EventSubscription::noop();
        }
        let id = self.next_id();
        self.inner.promoted_product_ios.add(id, Arc::new(listener));
        let inner = Arc::clone(&self.inner);
        EventSubscription::new(move || inner.promoted_product_ios.remove(id))
    }

    /// Android-only event, same wrong-platform contract as the promoted
    /// product listener.
    pub fn add_user_choice_billing_listener_android(
        &self,
        listener: impl Fn(&UserChoiceBillingDetailsAndroid) + Send + Sync + 'static,
    ) -> EventSubscription {
        if self.inner.platform != IapPlatform::Android {
            warn!(
                platform = %self.inner.platform,
                "user-choice-billing-android listener ignored on this platform"
            );
            return EventSubscription::noop();
        }
        let id = self.next_id();
        self.inner
            .user_choice_billing_android
            .add(id, Arc::new(listener));
        let inner = Arc::clone(&self.inner);
        EventSubscription::new(move || inner.user_choice_billing_android.remove(id))
    }

    /// Normalizes one native event and fans it out. Payloads that cannot be
    /// shaped are dropped with a debug log, never panicked on.
    pub fn dispatch(&self, event: NativeEvent) {
        match event.kind {
            NativeEventKind::PurchaseUpdated => match normalize_purchase(&event.payload) {
                Some(purchase) => self.inner.purchase_updated.emit(&purchase),
                None => debug!("dropping malformed purchase-updated payload"),
            },
            NativeEventKind::PurchaseError => {
                let error = self.normalize_error(&event.payload);
                self.inner.purchase_error.emit(&error);
            }
            NativeEventKind::PromotedProductIos => match normalize_product(&event.payload) {
                Some(product) => self.inner.promoted_product_ios.emit(&product),
                None => debug!("dropping malformed promoted-product payload"),
            },
            NativeEventKind::UserChoiceBillingAndroid => {
                match serde_json::from_value::<UserChoiceBillingDetailsAndroid>(event.payload) {
                    Ok(details) => self.inner.user_choice_billing_android.emit(&details),
                    Err(_) => debug!("dropping malformed user-choice-billing payload"),
                }
            }
        }
    }

    /// Error payloads arrive either already canonical or in the backend's
    /// native code vocabulary; both shapes normalize through the mapper.
    /// Numeric codes (Play Billing response codes) look up their decimal
    /// string form, matching how the table renders them.
    fn normalize_error(&self, payload: &serde_json::Value) -> PurchaseError {
        let raw_code = match payload.get("code") {
            Some(serde_json::Value::String(c)) => Some(c.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let code = match raw_code.as_deref() {
            Some(c) => ErrorCode::parse(c)
                .unwrap_or_else(|| self.inner.mapper.from_platform_code(c, self.inner.platform)),
            None => ErrorCode::Unknown,
        };
        let message = payload
            .get("message")
            .and_then(serde_json::Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| user_friendly_message(&PurchaseError::new(code, "")));
        let mut error = PurchaseError::new(code, message).with_platform(self.inner.platform);
        if let Some(product_id) = payload.get("productId").and_then(serde_json::Value::as_str) {
            error.product_id = Some(product_id.to_owned());
        }
        if let Some(response_code) = payload.get("responseCode").and_then(serde_json::Value::as_i64)
        {
            error.response_code = Some(response_code as i32);
        }
        if let Some(debug_message) = payload.get("debugMessage").and_then(serde_json::Value::as_str)
        {
            error.debug_message = Some(debug_message.to_owned());
        }
        error
    }

    /// Sink to hand to [`crate::NativeBridge::set_event_sink`].
    pub fn sink(&self) -> EventSink {
        let emitter = self.clone();
        Arc::new(move |event| emitter.dispatch(event))
    }

    /// Drops every registered listener. Part of connection teardown.
    pub fn clear_listeners(&self) {
        self.inner.purchase_updated.clear();
        self.inner.purchase_error.clear();
        self.inner.promoted_product_ios.clear();
        self.inner.user_choice_billing_android.clear();
    }
}
