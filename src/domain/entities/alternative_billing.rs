use serde::{Deserialize, Serialize};

/// Payload of the `user-choice-billing-android` event, emitted when the user
/// selects alternative billing in Google's user-choice dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChoiceBillingDetailsAndroid {
    /// Token to report the transaction to Google Play.
    #[serde(default)]
    pub external_transaction_token: String,
    /// Product ids the user chose to buy.
    #[serde(default)]
    pub products: Vec<String>,
}

/// How the Play Billing connection handles alternative billing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlternativeBillingModeAndroid {
    #[default]
    None,
    /// Alternative billing only, no Google Play billing.
    AlternativeOnly,
    /// User chooses between Google Play and alternative billing.
    UserChoice,
}
