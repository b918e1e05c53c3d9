use serde::Deserialize;
use serde_json::Value;

use crate::domain::entities::purchase::{PurchaseIos, PurchaseState, RenewalInfoIos};

/// Raw StoreKit 2 transaction as delivered by the native bridge.
///
/// Covers the current field names plus the legacy aliases
/// (`transactionReceipt`, `jwsRepresentationIOS`) older native layers emit
/// for the token. A record without an `id` (or legacy `transactionId`) or
/// without any product id is dropped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IosPurchaseModel {
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) ids: Vec<String>,
    pub(crate) product_id: Option<String>,
    pub(crate) transaction_id: Option<String>,
    /// Native layers emit this as a float of epoch milliseconds.
    pub(crate) transaction_date: Option<f64>,
    pub(crate) purchase_state: Option<Value>,
    #[serde(alias = "transactionReceipt", alias = "jwsRepresentationIOS")]
    pub(crate) purchase_token: Option<String>,
    pub(crate) is_auto_renewing: Option<bool>,
    pub(crate) quantity: Option<i32>,
    #[serde(rename = "environmentIOS", alias = "environment")]
    pub(crate) environment_ios: Option<String>,
    #[serde(rename = "expirationDateIOS")]
    pub(crate) expiration_date_ios: Option<f64>,
    #[serde(rename = "originalTransactionDateIOS")]
    pub(crate) original_transaction_date_ios: Option<f64>,
    #[serde(rename = "originalTransactionIdentifierIOS")]
    pub(crate) original_transaction_identifier_ios: Option<String>,
    #[serde(rename = "transactionReasonIOS")]
    pub(crate) transaction_reason_ios: Option<String>,
    #[serde(rename = "currencyCodeIOS")]
    pub(crate) currency_code_ios: Option<String>,
    #[serde(rename = "storefrontCountryCodeIOS")]
    pub(crate) storefront_country_code_ios: Option<String>,
    #[serde(rename = "appBundleIdIOS")]
    pub(crate) app_bundle_id_ios: Option<String>,
    #[serde(rename = "renewalInfoIOS")]
    pub(crate) renewal_info_ios: Option<RenewalInfoIos>,
}

/// Tolerant state decode: unrecognized or non-string values become
/// `Unknown`, never an error.
pub(crate) fn purchase_state_from_value(value: Option<&Value>) -> PurchaseState {
    value
        .and_then(Value::as_str)
        .and_then(|s| serde_json::from_value(Value::String(s.to_owned())).ok())
        .unwrap_or_default()
}

impl IosPurchaseModel {
    pub(crate) fn into_purchase(self) -> Option<PurchaseIos> {
        let id = self.id.or_else(|| self.transaction_id.clone())?;
        let product_id = self
            .product_id
            .or_else(|| self.ids.first().cloned())?;
        Some(PurchaseIos {
            id,
            ids: self.ids,
            product_id,
            transaction_id: self.transaction_id,
            transaction_date: self.transaction_date.unwrap_or(0.0) as i64,
            purchase_state: purchase_state_from_value(self.purchase_state.as_ref()),
            purchase_token: self.purchase_token.unwrap_or_default(),
            is_auto_renewing: self.is_auto_renewing.unwrap_or(false),
            quantity: self.quantity.unwrap_or(1),
            environment_ios: self.environment_ios,
            expiration_date_ios: self.expiration_date_ios.map(|d| d as i64),
            original_transaction_date_ios: self.original_transaction_date_ios.map(|d| d as i64),
            original_transaction_identifier_ios: self.original_transaction_identifier_ios,
            transaction_reason_ios: self.transaction_reason_ios,
            currency_code_ios: self.currency_code_ios,
            storefront_country_code_ios: self.storefront_country_code_ios,
            app_bundle_id_ios: self.app_bundle_id_ios,
            renewal_info_ios: self.renewal_info_ios,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_token_aliases_are_accepted() {
        let model: IosPurchaseModel = serde_json::from_value(json!({
            "id": "tx-1",
            "productId": "a.b",
            "transactionReceipt": "legacy-jws"
        }))
        .unwrap();
        assert_eq!(model.into_purchase().unwrap().purchase_token, "legacy-jws");
    }

    #[test]
    fn null_token_normalizes_to_empty_string() {
        let model: IosPurchaseModel = serde_json::from_value(json!({
            "id": "tx-1",
            "productId": "a.b",
            "purchaseToken": null
        }))
        .unwrap();
        let purchase = model.into_purchase().unwrap();
        assert_eq!(purchase.purchase_token, "");
        assert_eq!(purchase.quantity, 1);
        assert_eq!(purchase.purchase_state, PurchaseState::Unknown);
    }

    #[test]
    fn record_without_any_product_id_is_dropped() {
        let model: IosPurchaseModel =
            serde_json::from_value(json!({"id": "tx-1"})).unwrap();
        assert!(model.into_purchase().is_none());
    }

    #[test]
    fn float_dates_truncate_to_millis() {
        let model: IosPurchaseModel = serde_json::from_value(json!({
            "id": "tx-1",
            "productId": "a.b",
            "transactionDate": 1700000000123.0,
            "expirationDateIOS": 1702000000456.9
        }))
        .unwrap();
        let purchase = model.into_purchase().unwrap();
        assert_eq!(purchase.transaction_date, 1_700_000_000_123);
        assert_eq!(purchase.expiration_date_ios, Some(1_702_000_000_456));
    }

    #[test]
    fn numeric_state_is_unknown_not_an_error() {
        assert_eq!(purchase_state_from_value(Some(&json!(1))), PurchaseState::Unknown);
        assert_eq!(
            purchase_state_from_value(Some(&json!("purchased"))),
            PurchaseState::Purchased
        );
        assert_eq!(purchase_state_from_value(None), PurchaseState::Unknown);
    }
}
