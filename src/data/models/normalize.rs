//! Raw-payload type guards and the single normalization path applied to
//! every product/purchase that crosses the native boundary, whether it
//! arrives from a query or from the event stream.

use serde_json::Value;

use crate::{
    data::models::{
        play_billing::{product_model::AndroidProductModel, purchase_model::AndroidPurchaseModel},
        store_kit::{product_model::IosProductModel, purchase_model::IosPurchaseModel},
    },
    domain::entities::{platform::IapPlatform, product::Product, purchase::Purchase},
};

/// Lower-cases the `platform` field iff the lower-cased value is one of the
/// two known literals; anything else is left untouched so an unexpected
/// platform value is not masked. Idempotent.
pub(crate) fn normalize_platform_case(mut value: Value) -> Value {
    if let Some(platform) = value.get("platform").and_then(Value::as_str) {
        let lowered = platform.to_ascii_lowercase();
        if lowered == IapPlatform::Ios.as_str() || lowered == IapPlatform::Android.as_str() {
            value["platform"] = Value::String(lowered);
        }
    }
    value
}

fn has_platform(value: &Value, platform: IapPlatform) -> bool {
    value
        .get("platform")
        .and_then(Value::as_str)
        .is_some_and(|p| p == platform.as_str())
}

/// Structural guard: non-null object whose `platform` field equals `"ios"`
/// exactly. `null`, missing and mismatched platforms all report `false`.
pub(crate) fn is_product_ios(value: &Value) -> bool {
    has_platform(value, IapPlatform::Ios)
}

pub(crate) fn is_product_android(value: &Value) -> bool {
    has_platform(value, IapPlatform::Android)
}

pub(crate) fn is_purchase_ios(value: &Value) -> bool {
    has_platform(value, IapPlatform::Ios)
}

pub(crate) fn is_purchase_android(value: &Value) -> bool {
    has_platform(value, IapPlatform::Android)
}

/// Shapes one raw catalog entry into a [`Product`], or `None` when the
/// entry is null, platform-less, or too incomplete to keep.
pub(crate) fn normalize_product(value: &Value) -> Option<Product> {
    let value = normalize_platform_case(value.clone());
    if is_product_ios(&value) {
        let model: IosProductModel = serde_json::from_value(value).ok()?;
        model.into_product().map(Product::Ios)
    } else if is_product_android(&value) {
        let model: AndroidProductModel = serde_json::from_value(value).ok()?;
        model.into_product().map(Product::Android)
    } else {
        None
    }
}

/// Shapes a raw catalog array: `null` and non-arrays become `[]`, entries
/// that fail [`normalize_product`] are dropped.
pub(crate) fn normalize_products(value: Value) -> Vec<Product> {
    match value {
        Value::Array(items) => items.iter().filter_map(normalize_product).collect(),
        _ => Vec::new(),
    }
}

/// Shapes one raw transaction into a [`Purchase`]. This is the single
/// normalization path for purchases: the query getters and the
/// `purchase-updated` event stream both go through here.
pub(crate) fn normalize_purchase(value: &Value) -> Option<Purchase> {
    let value = normalize_platform_case(value.clone());
    if is_purchase_ios(&value) {
        let model: IosPurchaseModel = serde_json::from_value(value).ok()?;
        model.into_purchase().map(Purchase::Ios)
    } else if is_purchase_android(&value) {
        let model: AndroidPurchaseModel = serde_json::from_value(value).ok()?;
        model.into_purchase().map(Purchase::Android)
    } else {
        None
    }
}

/// Shapes a raw purchase array: `null` and non-arrays become `[]`.
pub(crate) fn normalize_purchases(value: Value) -> Vec<Purchase> {
    match value {
        Value::Array(items) => items.iter().filter_map(normalize_purchase).collect(),
        _ => Vec::new(),
    }
}
