use serde::{Deserialize, Serialize};

use crate::domain::entities::{product::ProductQueryType, purchase::Purchase};

/// Input of `fetch_products`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchProductsProps {
    pub skus: Vec<String>,
    #[serde(rename = "type", default)]
    pub query_type: ProductQueryType,
}

impl FetchProductsProps {
    pub fn new(skus: impl IntoIterator<Item = impl Into<String>>, query_type: ProductQueryType) -> Self {
        Self {
            skus: skus.into_iter().map(Into::into).collect(),
            query_type,
        }
    }
}

/// Input of `request_purchase`: a union discriminated on `type`, carrying one
/// props object per platform. Only the running platform's props are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RequestPurchaseProps {
    #[serde(rename = "in-app", rename_all = "camelCase")]
    InApp {
        request: RequestPurchasePropsByPlatforms,
        #[serde(default)]
        use_alternative_billing: bool,
    },
    #[serde(rename = "subs", rename_all = "camelCase")]
    Subs {
        request: RequestSubscriptionPropsByPlatforms,
        #[serde(default)]
        use_alternative_billing: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPurchasePropsByPlatforms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<RequestPurchaseIosProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<RequestPurchaseAndroidProps>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSubscriptionPropsByPlatforms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<RequestPurchaseIosProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<RequestSubscriptionAndroidProps>,
}

/// StoreKit purchase request. `sku` is required and validated before any
/// native call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPurchaseIosProps {
    pub sku: String,
    /// When set, the native layer finishes the transaction immediately after
    /// purchase; the caller then must not call `finish_transaction`.
    #[serde(default, rename = "andDangerouslyFinishTransactionAutomaticallyIOS")]
    pub and_dangerously_finish_transaction_automatically_ios: bool,
    /// UUID associating the transaction with an account on the caller's
    /// service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_account_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_offer: Option<PaymentDiscountIos>,
}

/// Signed promotional offer attached to a StoreKit purchase request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDiscountIos {
    pub identifier: String,
    pub key_identifier: String,
    pub nonce: String,
    pub signature: String,
    pub timestamp: i64,
}

/// Play Billing one-time purchase request. `skus` must be non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPurchaseAndroidProps {
    pub skus: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated_account_id_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated_profile_id_android: Option<String>,
    #[serde(default)]
    pub is_offer_personalized: bool,
}

/// No-replacement sentinel for [`RequestSubscriptionAndroidProps::replacement_mode_android`].
pub const REPLACEMENT_MODE_NONE_ANDROID: i32 = -1;

/// Play Billing subscription purchase request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSubscriptionAndroidProps {
    pub skus: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated_account_id_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscated_profile_id_android: Option<String>,
    #[serde(default)]
    pub is_offer_personalized: bool,
    /// Offers to apply, one per SKU. Sent as an empty array when none are
    /// given.
    #[serde(default)]
    pub subscription_offers: Vec<SubscriptionOfferAndroid>,
    /// Proration policy for upgrades/downgrades;
    /// [`REPLACEMENT_MODE_NONE_ANDROID`] when not replacing.
    #[serde(default = "default_replacement_mode")]
    pub replacement_mode_android: i32,
    /// Token of the existing purchase being replaced, for
    /// upgrades/downgrades.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_token_android: Option<String>,
}

impl Default for RequestSubscriptionAndroidProps {
    fn default() -> Self {
        Self {
            skus: Vec::new(),
            obfuscated_account_id_android: None,
            obfuscated_profile_id_android: None,
            is_offer_personalized: false,
            subscription_offers: Vec::new(),
            replacement_mode_android: REPLACEMENT_MODE_NONE_ANDROID,
            purchase_token_android: None,
        }
    }
}

fn default_replacement_mode() -> i32 {
    REPLACEMENT_MODE_NONE_ANDROID
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOfferAndroid {
    pub sku: String,
    pub offer_token: String,
}

/// Result of `request_purchase`.
///
/// The two arms deliberately differ in how an empty native response is
/// rendered: one-time purchases yield `None`, subscription purchases yield an
/// empty vector. Observed behavior of the system this models; not unified on
/// purpose.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPurchaseResult {
    OneTime(Option<Purchase>),
    Subscriptions(Vec<Purchase>),
}

impl RequestPurchaseResult {
    /// All purchases in the result, regardless of arm.
    pub fn purchases(&self) -> Vec<&Purchase> {
        match self {
            Self::OneTime(p) => p.iter().collect(),
            Self::Subscriptions(p) => p.iter().collect(),
        }
    }
}

/// Options of `get_available_purchases`. The iOS defaults mirror the restore
/// path: do not republish to listeners, only include active items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailablePurchasesOptions {
    #[serde(default, rename = "alsoPublishToEventListenerIOS")]
    pub also_publish_to_event_listener_ios: bool,
    #[serde(default = "default_true", rename = "onlyIncludeActiveItemsIOS")]
    pub only_include_active_items_ios: bool,
}

impl Default for AvailablePurchasesOptions {
    fn default() -> Self {
        Self {
            also_publish_to_event_listener_ios: false,
            only_include_active_items_ios: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Options of `deep_link_to_subscriptions` (Android-only fields; the iOS
/// path needs none).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLinkOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name_android: Option<String>,
}

/// iOS receipt-validation argument: either the structured props object or,
/// for backward compatibility, a bare SKU string. Both forms validate the
/// same "requires a SKU" invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReceiptValidationArgIos {
    Sku(String),
    Props(ValidateReceiptIosProps),
}

impl ReceiptValidationArgIos {
    pub fn sku(&self) -> &str {
        match self {
            Self::Sku(sku) => sku,
            Self::Props(props) => &props.sku,
        }
    }
}

impl From<&str> for ReceiptValidationArgIos {
    fn from(sku: &str) -> Self {
        Self::Sku(sku.to_owned())
    }
}

impl From<String> for ReceiptValidationArgIos {
    fn from(sku: String) -> Self {
        Self::Sku(sku)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReceiptIosProps {
    pub sku: String,
}

/// Input of the unified `validate_receipt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReceiptProps {
    pub sku: String,
    /// Required on Android; ignored on iOS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android_options: Option<ValidateReceiptAndroidOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReceiptAndroidOptions {
    pub package_name: String,
    pub product_token: String,
    pub access_token: String,
    #[serde(default)]
    pub is_sub: bool,
}

/// Result of `validate_receipt`, shaped per platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReceiptValidationResult {
    Ios(ReceiptValidationResultIos),
    Android(ReceiptValidationResultAndroid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptValidationResultIos {
    pub is_valid: bool,
    #[serde(default)]
    pub receipt_data: String,
    #[serde(default)]
    pub jws_representation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_transaction: Option<Purchase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptValidationResultAndroid {
    #[serde(default)]
    pub auto_renewing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub purchase_state: i32,
    #[serde(default)]
    pub purchase_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_purchase_props_union_decodes_on_type() {
        let props: RequestPurchaseProps = serde_json::from_value(json!({
            "type": "subs",
            "request": {
                "android": {
                    "skus": ["premium.monthly"],
                    "subscriptionOffers": [{"sku": "premium.monthly", "offerToken": "t"}]
                }
            }
        }))
        .unwrap();
        let RequestPurchaseProps::Subs { request, use_alternative_billing } = props else {
            panic!("expected subs variant");
        };
        assert!(!use_alternative_billing);
        let android = request.android.unwrap();
        assert_eq!(android.replacement_mode_android, REPLACEMENT_MODE_NONE_ANDROID);
        assert_eq!(android.subscription_offers.len(), 1);
    }

    #[test]
    fn receipt_validation_arg_accepts_bare_sku_and_props() {
        let bare: ReceiptValidationArgIos = serde_json::from_value(json!("a.sku")).unwrap();
        let props: ReceiptValidationArgIos =
            serde_json::from_value(json!({"sku": "a.sku"})).unwrap();
        assert_eq!(bare.sku(), "a.sku");
        assert_eq!(props.sku(), "a.sku");
    }

    #[test]
    fn available_purchases_defaults_match_restore_contract() {
        let options = AvailablePurchasesOptions::default();
        assert!(!options.also_publish_to_event_listener_ios);
        assert!(options.only_include_active_items_ios);
        let decoded: AvailablePurchasesOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(decoded, options);
    }
}
