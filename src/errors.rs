use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::platform::IapPlatform;

/// Closed set of error kinds exposed to callers.
///
/// This enumeration is the only error vocabulary of the library: every native
/// failure is mapped onto one of these members before it reaches application
/// code, with [`ErrorCode::Unknown`] as the safe fallback for codes the
/// active backend's table does not cover.
///
/// The wire form is the kebab-case literal (`"user-cancelled"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    Unknown,
    UserCancelled,
    UserError,
    ItemUnavailable,
    RemoteError,
    NetworkError,
    ServiceError,
    ReceiptFailed,
    ReceiptFinished,
    ReceiptFinishedFailed,
    NotPrepared,
    NotEnded,
    AlreadyOwned,
    ItemNotOwned,
    BillingUnavailable,
    DeveloperError,
    DeferredPayment,
    Interrupted,
    IapNotAvailable,
    InitConnection,
    ServiceDisconnected,
    QueryProduct,
    SkuNotFound,
    SkuOfferMismatch,
    EmptySkuList,
    FeatureNotSupported,
    TransactionValidationFailed,
    ActivityUnavailable,
    Pending,
    ConnectionClosed,
    SyncError,
    PurchaseDeferred,
}

impl ErrorCode {
    /// Parses a canonical kebab-case code string. Unrecognized strings yield
    /// `None`, never a panic.
    pub fn parse(code: &str) -> Option<Self> {
        serde_json::from_value(Value::String(code.to_owned())).ok()
    }

    /// The canonical kebab-case literal for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "unknown",
            ErrorCode::UserCancelled => "user-cancelled",
            ErrorCode::UserError => "user-error",
            ErrorCode::ItemUnavailable => "item-unavailable",
            ErrorCode::RemoteError => "remote-error",
            ErrorCode::NetworkError => "network-error",
            ErrorCode::ServiceError => "service-error",
            ErrorCode::ReceiptFailed => "receipt-failed",
            ErrorCode::ReceiptFinished => "receipt-finished",
            ErrorCode::ReceiptFinishedFailed => "receipt-finished-failed",
            ErrorCode::NotPrepared => "not-prepared",
            ErrorCode::NotEnded => "not-ended",
            ErrorCode::AlreadyOwned => "already-owned",
            ErrorCode::ItemNotOwned => "item-not-owned",
            ErrorCode::BillingUnavailable => "billing-unavailable",
            ErrorCode::DeveloperError => "developer-error",
            ErrorCode::DeferredPayment => "deferred-payment",
            ErrorCode::Interrupted => "interrupted",
            ErrorCode::IapNotAvailable => "iap-not-available",
            ErrorCode::InitConnection => "init-connection",
            ErrorCode::ServiceDisconnected => "service-disconnected",
            ErrorCode::QueryProduct => "query-product",
            ErrorCode::SkuNotFound => "sku-not-found",
            ErrorCode::SkuOfferMismatch => "sku-offer-mismatch",
            ErrorCode::EmptySkuList => "empty-sku-list",
            ErrorCode::FeatureNotSupported => "feature-not-supported",
            ErrorCode::TransactionValidationFailed => "transaction-validation-failed",
            ErrorCode::ActivityUnavailable => "activity-unavailable",
            ErrorCode::Pending => "pending",
            ErrorCode::ConnectionClosed => "connection-closed",
            ErrorCode::SyncError => "sync-error",
            ErrorCode::PurchaseDeferred => "purchase-deferred",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure descriptor surfaced to callers, either by `Err` return
/// or through the `purchase-error` event.
///
/// Created at the point of failure and never retried by this layer.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{name}] {code}: {message}", name = PurchaseError::NAME)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<IapPlatform>,
    /// Raw native response code, when the backend supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_message: Option<String>,
}

impl PurchaseError {
    /// Fixed name tag carried by every error produced by this library.
    pub const NAME: &'static str = "PurchaseError";

    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            product_id: None,
            platform: None,
            response_code: None,
            debug_message: None,
        }
    }

    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_platform(mut self, platform: IapPlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Builds an error from a raw native failure, attaching the canonical
    /// code via the mapper. Every supplied field is preserved.
    pub fn from_platform(
        platform: IapPlatform,
        mapper: &ErrorCodeMapper,
        native_code: Option<&str>,
        message: Option<&str>,
        product_id: Option<String>,
        response_code: Option<i32>,
        debug_message: Option<String>,
    ) -> Self {
        let code = native_code
            .map(|c| mapper.from_platform_code(c, platform))
            .unwrap_or(ErrorCode::Unknown);
        Self {
            code,
            message: message
                .map(str::to_owned)
                .unwrap_or_else(|| user_friendly_message_for_code(code).to_owned()),
            product_id,
            platform: Some(platform),
            response_code,
            debug_message,
        }
    }
}

/// Native error-code constant map published by a bridge backend at resolution
/// time. Keys are the native codes as strings (Android's numeric billing
/// response codes are rendered as decimal strings), values are canonical
/// kebab-case [`ErrorCode`] literals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorCodeTable {
    #[serde(default)]
    pub ios: HashMap<String, String>,
    #[serde(default)]
    pub android: HashMap<String, String>,
}

/// Bidirectional native-code / canonical-code lookup, built once at bridge
/// resolution and read-only thereafter.
///
/// Entries whose canonical value is not a recognized [`ErrorCode`] literal
/// are dropped at construction; lookups for codes absent from the table fall
/// back to [`ErrorCode::Unknown`].
#[derive(Debug, Clone, Default)]
pub struct ErrorCodeMapper {
    ios: HashMap<String, ErrorCode>,
    android: HashMap<String, ErrorCode>,
}

impl ErrorCodeMapper {
    /// Empty mapper: every lookup resolves to `Unknown`. Used when the
    /// resolved backend publishes no constant table.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_table(table: &ErrorCodeTable) -> Self {
        let build = |m: &HashMap<String, String>| {
            m.iter()
                .filter_map(|(native, canonical)| {
                    ErrorCode::parse(canonical).map(|code| (native.clone(), code))
                })
                .collect()
        };
        Self {
            ios: build(&table.ios),
            android: build(&table.android),
        }
    }

    fn table_for(&self, platform: IapPlatform) -> &HashMap<String, ErrorCode> {
        match platform {
            IapPlatform::Ios => &self.ios,
            IapPlatform::Android => &self.android,
        }
    }

    /// Canonical code for a native code, or `Unknown` when the platform's
    /// table has no matching entry.
    pub fn from_platform_code(&self, native_code: &str, platform: IapPlatform) -> ErrorCode {
        self.table_for(platform)
            .get(native_code)
            .copied()
            .unwrap_or(ErrorCode::Unknown)
    }

    /// Native code the active backend would use for this canonical code, or
    /// `None` when the code has no representation on that platform. Mappings
    /// are many-to-one, so the first matching native code wins
    /// deterministically (lexicographic order).
    pub fn to_platform_code(&self, code: ErrorCode, platform: IapPlatform) -> Option<String> {
        self.table_for(platform)
            .iter()
            .filter(|(_, c)| **c == code)
            .map(|(native, _)| native.clone())
            .min()
    }

    /// True iff a platform-specific mapping exists for this code.
    pub fn is_valid_for_platform(&self, code: ErrorCode, platform: IapPlatform) -> bool {
        self.table_for(platform).values().any(|c| *c == code)
    }
}

/// Anything a classification predicate can inspect: a normalized
/// [`PurchaseError`] or a raw native payload.
///
/// Implementations must be total: null, non-object and missing-`code` inputs
/// report no code rather than panicking.
pub trait ErrorCodeCarrier {
    fn error_code(&self) -> Option<ErrorCode>;
    fn custom_message(&self) -> Option<String>;
}

impl ErrorCodeCarrier for PurchaseError {
    fn error_code(&self) -> Option<ErrorCode> {
        Some(self.code)
    }
    fn custom_message(&self) -> Option<String> {
        Some(self.message.clone())
    }
}

impl ErrorCodeCarrier for Value {
    fn error_code(&self) -> Option<ErrorCode> {
        self.get("code")?.as_str().and_then(ErrorCode::parse)
    }
    fn custom_message(&self) -> Option<String> {
        self.get("message")?.as_str().map(str::to_owned)
    }
}

impl<T: ErrorCodeCarrier> ErrorCodeCarrier for Option<&T> {
    fn error_code(&self) -> Option<ErrorCode> {
        self.and_then(|e| e.error_code())
    }
    fn custom_message(&self) -> Option<String> {
        self.and_then(|e| e.custom_message())
    }
}

pub fn is_user_cancelled_error(error: &impl ErrorCodeCarrier) -> bool {
    error.error_code() == Some(ErrorCode::UserCancelled)
}

pub fn is_network_error(error: &impl ErrorCodeCarrier) -> bool {
    matches!(
        error.error_code(),
        Some(ErrorCode::NetworkError)
            | Some(ErrorCode::RemoteError)
            | Some(ErrorCode::ServiceDisconnected)
    )
}

/// Errors worth retrying at the application level. This layer never retries
/// on its own.
pub fn is_recoverable_error(error: &impl ErrorCodeCarrier) -> bool {
    is_network_error(error)
        || matches!(
            error.error_code(),
            Some(ErrorCode::Interrupted) | Some(ErrorCode::ConnectionClosed)
        )
}

fn user_friendly_message_for_code(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::Unknown => "An unexpected error occurred.",
        ErrorCode::UserCancelled => "The purchase was cancelled.",
        ErrorCode::UserError => "The request was rejected. Please check your input and try again.",
        ErrorCode::ItemUnavailable => "This item is not available in the store.",
        ErrorCode::RemoteError => "The store could not be reached. Please try again later.",
        ErrorCode::NetworkError => "A network error occurred. Please check your connection.",
        ErrorCode::ServiceError => "The billing service reported an error. Please try again.",
        ErrorCode::ReceiptFailed => "The receipt could not be validated.",
        ErrorCode::ReceiptFinished => "This transaction has already been finished.",
        ErrorCode::ReceiptFinishedFailed => "The transaction could not be finished.",
        ErrorCode::NotPrepared => "The billing connection is not ready yet.",
        ErrorCode::NotEnded => "The previous billing connection was not closed.",
        ErrorCode::AlreadyOwned => "You already own this item.",
        ErrorCode::ItemNotOwned => "You do not own this item.",
        ErrorCode::BillingUnavailable => "Billing is not available on this device.",
        ErrorCode::DeveloperError => "The purchase request was malformed.",
        ErrorCode::DeferredPayment => "The purchase is awaiting approval.",
        ErrorCode::Interrupted => "The operation was interrupted. Please try again.",
        ErrorCode::IapNotAvailable => "In-app purchases are not available on this device.",
        ErrorCode::InitConnection => "The billing service could not be initialized.",
        ErrorCode::ServiceDisconnected => "The billing service disconnected. Please try again.",
        ErrorCode::QueryProduct => "The product could not be queried.",
        ErrorCode::SkuNotFound => "The requested product was not found.",
        ErrorCode::SkuOfferMismatch => "The selected offer does not match the product.",
        ErrorCode::EmptySkuList => "No product identifiers were provided.",
        ErrorCode::FeatureNotSupported => "This feature is not supported on this device.",
        ErrorCode::TransactionValidationFailed => "The transaction could not be verified.",
        ErrorCode::ActivityUnavailable => "The purchase flow cannot be presented right now.",
        ErrorCode::Pending => "The purchase is pending.",
        ErrorCode::ConnectionClosed => "The billing connection was closed.",
        ErrorCode::SyncError => "The store could not be synced.",
        ErrorCode::PurchaseDeferred => "The purchase was deferred and will complete later.",
    }
}

/// Human-readable sentence for an error.
///
/// Prefers a custom `message` carried by the input; otherwise falls back to
/// the canned sentence for its canonical code, or to the generic unknown-code
/// sentence when no code is recognized.
pub fn user_friendly_message(error: &impl ErrorCodeCarrier) -> String {
    if let Some(message) = error.custom_message() {
        if !message.is_empty() {
            return message;
        }
    }
    user_friendly_message_for_code(error.error_code().unwrap_or(ErrorCode::Unknown)).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_table() -> ErrorCodeTable {
        ErrorCodeTable {
            ios: HashMap::from([
                ("E_USER_CANCELLED".to_owned(), "user-cancelled".to_owned()),
                ("E_NETWORK".to_owned(), "network-error".to_owned()),
                ("E_UNRECOGNIZED".to_owned(), "definitely-not-a-code".to_owned()),
            ]),
            android: HashMap::from([
                ("1".to_owned(), "user-cancelled".to_owned()),
                ("3".to_owned(), "billing-unavailable".to_owned()),
                ("7".to_owned(), "already-owned".to_owned()),
            ]),
        }
    }

    #[test]
    fn from_platform_code_resolves_known_codes() {
        let mapper = ErrorCodeMapper::from_table(&sample_table());
        assert_eq!(
            mapper.from_platform_code("E_USER_CANCELLED", IapPlatform::Ios),
            ErrorCode::UserCancelled
        );
        assert_eq!(
            mapper.from_platform_code("7", IapPlatform::Android),
            ErrorCode::AlreadyOwned
        );
    }

    #[test]
    fn from_platform_code_falls_back_to_unknown() {
        let mapper = ErrorCodeMapper::from_table(&sample_table());
        assert_eq!(
            mapper.from_platform_code("E_NOT_IN_TABLE", IapPlatform::Ios),
            ErrorCode::Unknown
        );
        // An entry with an unrecognized canonical value is dropped entirely.
        assert_eq!(
            mapper.from_platform_code("E_UNRECOGNIZED", IapPlatform::Ios),
            ErrorCode::Unknown
        );
        // Cross-platform lookup of an Android-only code misses.
        assert_eq!(
            mapper.from_platform_code("1", IapPlatform::Ios),
            ErrorCode::Unknown
        );
    }

    #[test]
    fn to_platform_code_inverse_respects_validity() {
        let mapper = ErrorCodeMapper::from_table(&sample_table());
        assert_eq!(
            mapper.to_platform_code(ErrorCode::UserCancelled, IapPlatform::Android),
            Some("1".to_owned())
        );
        assert_eq!(
            mapper.to_platform_code(ErrorCode::BillingUnavailable, IapPlatform::Ios),
            None
        );
        assert!(mapper.is_valid_for_platform(ErrorCode::NetworkError, IapPlatform::Ios));
        assert!(!mapper.is_valid_for_platform(ErrorCode::NetworkError, IapPlatform::Android));
    }

    #[test]
    fn round_trip_stays_valid_for_platform() {
        let mapper = ErrorCodeMapper::from_table(&sample_table());
        for native in ["E_USER_CANCELLED", "E_NETWORK"] {
            let code = mapper.from_platform_code(native, IapPlatform::Ios);
            let back = mapper.to_platform_code(code, IapPlatform::Ios);
            assert!(back.is_some());
            assert!(mapper.is_valid_for_platform(code, IapPlatform::Ios));
        }
    }

    #[test]
    fn empty_mapper_always_unknown() {
        let mapper = ErrorCodeMapper::empty();
        assert_eq!(
            mapper.from_platform_code("anything", IapPlatform::Android),
            ErrorCode::Unknown
        );
        assert_eq!(mapper.to_platform_code(ErrorCode::Unknown, IapPlatform::Ios), None);
    }

    #[test]
    fn predicates_tolerate_null_and_missing_code() {
        assert!(!is_user_cancelled_error(&Value::Null));
        assert!(!is_network_error(&Value::Null));
        assert!(!is_recoverable_error(&json!({})));
        assert!(!is_user_cancelled_error(&json!({"message": "no code"})));
        let none: Option<&Value> = None;
        assert!(!is_user_cancelled_error(&none));
    }

    #[test]
    fn predicates_accept_raw_and_normalized_shapes() {
        let raw = json!({"code": "user-cancelled", "message": "tapped away"});
        assert!(is_user_cancelled_error(&raw));
        let normalized = PurchaseError::new(ErrorCode::NetworkError, "offline");
        assert!(is_network_error(&normalized));
        assert!(is_recoverable_error(&normalized));
        assert!(!is_recoverable_error(&PurchaseError::new(
            ErrorCode::DeveloperError,
            "bad args"
        )));
    }

    #[test]
    fn user_friendly_message_prefers_custom_message() {
        let raw = json!({"code": "network-error", "message": "custom words"});
        assert_eq!(user_friendly_message(&raw), "custom words");
        let canned = json!({"code": "user-cancelled"});
        assert_eq!(user_friendly_message(&canned), "The purchase was cancelled.");
        let unrecognized = json!({"code": "no-such-code"});
        assert_eq!(
            user_friendly_message(&unrecognized),
            "An unexpected error occurred."
        );
    }

    #[test]
    fn from_platform_preserves_every_field() {
        let mapper = ErrorCodeMapper::from_table(&sample_table());
        let err = PurchaseError::from_platform(
            IapPlatform::Android,
            &mapper,
            Some("3"),
            Some("billing down"),
            Some("com.app.premium".to_owned()),
            Some(3),
            Some("BILLING_UNAVAILABLE".to_owned()),
        );
        assert_eq!(err.code, ErrorCode::BillingUnavailable);
        assert_eq!(err.message, "billing down");
        assert_eq!(err.product_id.as_deref(), Some("com.app.premium"));
        assert_eq!(err.platform, Some(IapPlatform::Android));
        assert_eq!(err.response_code, Some(3));
        assert_eq!(err.debug_message.as_deref(), Some("BILLING_UNAVAILABLE"));
    }

    #[test]
    fn from_platform_without_message_uses_canned_sentence() {
        let err = PurchaseError::from_platform(
            IapPlatform::Ios,
            &ErrorCodeMapper::empty(),
            Some("E_WHATEVER"),
            None,
            None,
            None,
            None,
        );
        assert_eq!(err.code, ErrorCode::Unknown);
        assert_eq!(err.message, "An unexpected error occurred.");
    }

    #[test]
    fn purchase_deferred_survives_table_construction() {
        let table = ErrorCodeTable {
            ios: HashMap::from([("E_DEFERRED".to_owned(), "purchase-deferred".to_owned())]),
            android: HashMap::new(),
        };
        let mapper = ErrorCodeMapper::from_table(&table);
        assert_eq!(
            mapper.from_platform_code("E_DEFERRED", IapPlatform::Ios),
            ErrorCode::PurchaseDeferred
        );
        assert_eq!(ErrorCode::PurchaseDeferred.as_str(), "purchase-deferred");
        assert_eq!(
            user_friendly_message(&json!({"code": "purchase-deferred"})),
            "The purchase was deferred and will complete later."
        );
    }

    #[test]
    fn error_code_wire_form_is_kebab_case() {
        assert_eq!(ErrorCode::parse("user-cancelled"), Some(ErrorCode::UserCancelled));
        assert_eq!(ErrorCode::parse("USER_CANCELLED"), None);
        let serialized = serde_json::to_value(ErrorCode::SkuOfferMismatch).unwrap();
        assert_eq!(serialized, json!("sku-offer-mismatch"));
        assert_eq!(ErrorCode::SkuOfferMismatch.as_str(), "sku-offer-mismatch");
    }
}
