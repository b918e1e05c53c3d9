use serde::{Deserialize, Serialize};

use crate::domain::entities::platform::IapPlatform;

/// Lifecycle state of a transaction as reported by the store.
///
/// Unrecognized native states decode as `Unknown` rather than failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseState {
    Pending,
    Purchased,
    Failed,
    Restored,
    Deferred,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One transaction / entitlement instance, discriminated by the `platform`
/// field.
///
/// Created when the native layer reports a new or updated transaction (via
/// event or query). A purchase must be explicitly finished with
/// `finish_transaction` to leave the store's pending queue; on Android an
/// unacknowledged purchase is auto-refunded by the store after its grace
/// window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform")]
pub enum Purchase {
    #[serde(rename = "ios")]
    Ios(PurchaseIos),
    #[serde(rename = "android")]
    Android(PurchaseAndroid),
}

impl Purchase {
    pub fn platform(&self) -> IapPlatform {
        match self {
            Purchase::Ios(_) => IapPlatform::Ios,
            Purchase::Android(_) => IapPlatform::Android,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Purchase::Ios(p) => &p.id,
            Purchase::Android(p) => &p.id,
        }
    }

    /// All product ids associated with this transaction (multi-SKU Android
    /// purchases carry more than one).
    pub fn ids(&self) -> &[String] {
        match self {
            Purchase::Ios(p) => &p.ids,
            Purchase::Android(p) => &p.ids,
        }
    }

    pub fn product_id(&self) -> &str {
        match self {
            Purchase::Ios(p) => &p.product_id,
            Purchase::Android(p) => &p.product_id,
        }
    }

    pub fn purchase_state(&self) -> PurchaseState {
        match self {
            Purchase::Ios(p) => p.purchase_state,
            Purchase::Android(p) => p.purchase_state,
        }
    }

    /// Unified purchase token: the JWS representation on iOS, the Play
    /// Billing purchase token on Android. Empty when the native layer
    /// supplied none.
    pub fn purchase_token(&self) -> &str {
        match self {
            Purchase::Ios(p) => &p.purchase_token,
            Purchase::Android(p) => &p.purchase_token,
        }
    }

    /// Store transaction identifier, falling back to `id`.
    pub fn transaction_id(&self) -> &str {
        match self {
            Purchase::Ios(p) => p.transaction_id.as_deref().unwrap_or(&p.id),
            Purchase::Android(p) => p.transaction_id.as_deref().unwrap_or(&p.id),
        }
    }

    /// Epoch milliseconds.
    pub fn transaction_date(&self) -> i64 {
        match self {
            Purchase::Ios(p) => p.transaction_date,
            Purchase::Android(p) => p.transaction_date,
        }
    }

    pub fn is_auto_renewing(&self) -> bool {
        match self {
            Purchase::Ios(p) => p.is_auto_renewing,
            Purchase::Android(p) => p.is_auto_renewing,
        }
    }

    /// Plan currently billed: the product id itself on iOS, the base plan id
    /// reported by the native layer on Android (absent when Play did not
    /// supply one).
    pub fn current_plan_id(&self) -> Option<&str> {
        match self {
            Purchase::Ios(p) => Some(&p.product_id),
            Purchase::Android(p) => p.current_plan_id.as_deref(),
        }
    }

    /// Subscription expiration in epoch milliseconds, when known (iOS only).
    pub fn expiration_date(&self) -> Option<i64> {
        match self {
            Purchase::Ios(p) => p.expiration_date_ios,
            Purchase::Android(_) => None,
        }
    }
}

/// StoreKit 2 transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseIos {
    pub id: String,
    #[serde(default)]
    pub ids: Vec<String>,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub transaction_date: i64,
    #[serde(default)]
    pub purchase_state: PurchaseState,
    /// JWS representation of the signed transaction; empty when the native
    /// layer supplied none.
    #[serde(default)]
    pub purchase_token: String,
    #[serde(default)]
    pub is_auto_renewing: bool,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// `Sandbox` or `Production`.
    #[serde(default, rename = "environmentIOS", skip_serializing_if = "Option::is_none")]
    pub environment_ios: Option<String>,
    #[serde(default, rename = "expirationDateIOS", skip_serializing_if = "Option::is_none")]
    pub expiration_date_ios: Option<i64>,
    #[serde(
        default,
        rename = "originalTransactionDateIOS",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_transaction_date_ios: Option<i64>,
    #[serde(
        default,
        rename = "originalTransactionIdentifierIOS",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_transaction_identifier_ios: Option<String>,
    /// `PURCHASE` or `RENEWAL`.
    #[serde(default, rename = "transactionReasonIOS", skip_serializing_if = "Option::is_none")]
    pub transaction_reason_ios: Option<String>,
    #[serde(default, rename = "currencyCodeIOS", skip_serializing_if = "Option::is_none")]
    pub currency_code_ios: Option<String>,
    #[serde(
        default,
        rename = "storefrontCountryCodeIOS",
        skip_serializing_if = "Option::is_none"
    )]
    pub storefront_country_code_ios: Option<String>,
    #[serde(default, rename = "appBundleIdIOS", skip_serializing_if = "Option::is_none")]
    pub app_bundle_id_ios: Option<String>,
    #[serde(default, rename = "renewalInfoIOS", skip_serializing_if = "Option::is_none")]
    pub renewal_info_ios: Option<RenewalInfoIos>,
}

/// StoreKit 2 renewal metadata for an auto-renewable subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalInfoIos {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew_preference: Option<String>,
    #[serde(default)]
    pub will_auto_renew: bool,
    /// Set when the user upgraded to a different product that is not yet
    /// active; points at a Product distinct from this purchase's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_upgrade_product_id: Option<String>,
    /// Epoch milliseconds of the next renewal, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_date: Option<i64>,
}

/// Play Billing purchase record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAndroid {
    pub id: String,
    #[serde(default)]
    pub ids: Vec<String>,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub transaction_date: i64,
    #[serde(default)]
    pub purchase_state: PurchaseState,
    /// Play Billing purchase token; empty when the native layer supplied
    /// none.
    #[serde(default)]
    pub purchase_token: String,
    #[serde(default)]
    pub is_auto_renewing: bool,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Base plan currently billed, when the native layer reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_token_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_acknowledged_android: Option<bool>,
    /// Raw purchase JSON as returned by Play Billing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated_account_id_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated_profile_id_android: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_purchase_state_decodes_tolerantly() {
        let state: PurchaseState = serde_json::from_value(json!("purchased")).unwrap();
        assert_eq!(state, PurchaseState::Purchased);
        let state: PurchaseState = serde_json::from_value(json!("half-refunded")).unwrap();
        assert_eq!(state, PurchaseState::Unknown);
    }

    #[test]
    fn ios_purchase_applies_documented_defaults() {
        let purchase: Purchase = serde_json::from_value(json!({
            "platform": "ios",
            "id": "2000000123",
            "productId": "com.app.premium"
        }))
        .unwrap();
        assert_eq!(purchase.purchase_token(), "");
        assert_eq!(purchase.ids(), &[] as &[String]);
        assert_eq!(purchase.purchase_state(), PurchaseState::Unknown);
        assert_eq!(purchase.transaction_date(), 0);
        assert_eq!(purchase.transaction_id(), "2000000123");
        assert_eq!(purchase.current_plan_id(), Some("com.app.premium"));
    }

    #[test]
    fn android_current_plan_id_comes_from_wire() {
        let purchase: Purchase = serde_json::from_value(json!({
            "platform": "android",
            "id": "GPA.1234",
            "productId": "premium.monthly",
            "ids": ["premium.monthly"],
            "purchaseState": "purchased",
            "purchaseToken": "token-xyz",
            "isAutoRenewing": true,
            "currentPlanId": "monthly"
        }))
        .unwrap();
        assert_eq!(purchase.current_plan_id(), Some("monthly"));
        assert_eq!(purchase.purchase_token(), "token-xyz");
        assert!(purchase.is_auto_renewing());
        assert_eq!(purchase.expiration_date(), None);
    }

    #[test]
    fn renewal_info_carries_pending_upgrade() {
        let purchase: PurchaseIos = serde_json::from_value(json!({
            "id": "1",
            "productId": "com.app.monthly",
            "renewalInfoIOS": {
                "willAutoRenew": true,
                "pendingUpgradeProductId": "com.app.yearly"
            }
        }))
        .unwrap();
        let renewal = purchase.renewal_info_ios.unwrap();
        assert!(renewal.will_auto_renew);
        assert_eq!(renewal.pending_upgrade_product_id.as_deref(), Some("com.app.yearly"));
    }
}
