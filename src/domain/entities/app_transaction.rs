use serde::{Deserialize, Serialize};

/// StoreKit 2 app-level transaction, returned by the `getAppTransaction`
/// escape hatch (iOS 16+). Describes the app purchase itself rather than an
/// in-app product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTransactionIos {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_app_version: Option<String>,
    /// Epoch milliseconds of the original app purchase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_purchase_date: Option<i64>,
    /// `Sandbox` or `Production`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_verification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_verification_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<i64>,
}
