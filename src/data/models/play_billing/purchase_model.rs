use serde::Deserialize;
use serde_json::Value;
use serde_repr::Deserialize_repr;

use crate::{
    data::models::store_kit::purchase_model::purchase_state_from_value,
    domain::entities::purchase::{PurchaseAndroid, PurchaseState},
};

/// Raw Play Billing purchase record as delivered by the native bridge.
///
/// The state arrives either as the unified string form (`purchaseState`) or
/// as the legacy numeric Play Billing code (`purchaseStateAndroid`); the
/// string form wins when both are present. A record without an identifier or
/// without any product id is dropped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AndroidPurchaseModel {
    #[serde(alias = "orderId")]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) ids: Vec<String>,
    pub(crate) product_id: Option<String>,
    pub(crate) transaction_id: Option<String>,
    pub(crate) transaction_date: Option<f64>,
    pub(crate) purchase_state: Option<Value>,
    pub(crate) purchase_state_android: Option<AndroidPurchaseStateCode>,
    pub(crate) purchase_token: Option<String>,
    pub(crate) purchase_token_android: Option<String>,
    #[serde(alias = "autoRenewingAndroid")]
    pub(crate) is_auto_renewing: Option<bool>,
    pub(crate) quantity: Option<i32>,
    pub(crate) current_plan_id: Option<String>,
    pub(crate) is_acknowledged_android: Option<bool>,
    pub(crate) data_android: Option<String>,
    pub(crate) signature_android: Option<String>,
    pub(crate) package_name_android: Option<String>,
    pub(crate) obfuscated_account_id_android: Option<String>,
    pub(crate) obfuscated_profile_id_android: Option<String>,
}

/// Play Billing `Purchase.PurchaseState` numeric codes.
///
/// https://developer.android.com/reference/com/android/billingclient/api/Purchase.PurchaseState
#[derive(Debug, Clone, Copy, PartialEq, Deserialize_repr)]
#[repr(u8)]
pub(crate) enum AndroidPurchaseStateCode {
    UnspecifiedState = 0,
    Purchased = 1,
    Pending = 2,
}

impl From<AndroidPurchaseStateCode> for PurchaseState {
    fn from(code: AndroidPurchaseStateCode) -> Self {
        match code {
            AndroidPurchaseStateCode::Purchased => PurchaseState::Purchased,
            AndroidPurchaseStateCode::Pending => PurchaseState::Pending,
            AndroidPurchaseStateCode::UnspecifiedState => PurchaseState::Unknown,
        }
    }
}

impl AndroidPurchaseModel {
    pub(crate) fn into_purchase(self) -> Option<PurchaseAndroid> {
        let id = self
            .id
            .or_else(|| self.transaction_id.clone())
            .or_else(|| self.purchase_token.clone())?;
        let product_id = self.product_id.or_else(|| self.ids.first().cloned())?;
        let purchase_state = match &self.purchase_state {
            Some(state) => purchase_state_from_value(Some(state)),
            None => self
                .purchase_state_android
                .map(PurchaseState::from)
                .unwrap_or_default(),
        };
        let purchase_token = self
            .purchase_token
            .clone()
            .or_else(|| self.purchase_token_android.clone())
            .unwrap_or_default();
        Some(PurchaseAndroid {
            id,
            ids: self.ids,
            product_id,
            transaction_id: self.transaction_id,
            transaction_date: self.transaction_date.unwrap_or(0.0) as i64,
            purchase_state,
            purchase_token,
            is_auto_renewing: self.is_auto_renewing.unwrap_or(false),
            quantity: self.quantity.unwrap_or(1),
            current_plan_id: self.current_plan_id,
            purchase_token_android: self.purchase_token_android,
            is_acknowledged_android: self.is_acknowledged_android,
            data_android: self.data_android,
            signature_android: self.signature_android,
            package_name_android: self.package_name_android,
            obfuscated_account_id_android: self.obfuscated_account_id_android,
            obfuscated_profile_id_android: self.obfuscated_profile_id_android,
        })
    }
}
