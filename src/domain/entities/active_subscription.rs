use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    platform::IapPlatform,
    purchase::{Purchase, RenewalInfoIos},
};

/// Days before expiration at which a subscription starts reporting
/// `will_expire_soon`.
pub const EXPIRATION_WARNING_DAYS: i64 = 7;

/// Read-only view joining entitlement state and renewal metadata.
///
/// Derived, never created independently: recomputed on each
/// `get_active_subscriptions` call from the underlying purchase data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSubscription {
    pub product_id: String,
    pub is_active: bool,
    pub platform: IapPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_plan_id: Option<String>,
    pub transaction_id: String,
    /// Epoch milliseconds.
    pub transaction_date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_token: Option<String>,
    #[serde(default, rename = "environmentIOS", skip_serializing_if = "Option::is_none")]
    pub environment_ios: Option<String>,
    #[serde(default, rename = "expirationDateIOS", skip_serializing_if = "Option::is_none")]
    pub expiration_date_ios: Option<i64>,
    #[serde(
        default,
        rename = "daysUntilExpirationIOS",
        skip_serializing_if = "Option::is_none"
    )]
    pub days_until_expiration_ios: Option<i64>,
    /// Set only when an expiration date is known; `true` within
    /// [`EXPIRATION_WARNING_DAYS`] of expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub will_expire_soon: Option<bool>,
    #[serde(default, rename = "renewalInfoIOS", skip_serializing_if = "Option::is_none")]
    pub renewal_info_ios: Option<RenewalInfoIos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renewing_android: Option<bool>,
}

impl ActiveSubscription {
    /// Derives the view from a purchase at the given reference time
    /// (epoch milliseconds).
    pub fn from_purchase(purchase: &Purchase, now_millis: i64) -> Self {
        let expiration_date_ios = purchase.expiration_date();
        let days_until_expiration_ios = expiration_date_ios
            .map(|expiry| (expiry - now_millis) / (24 * 60 * 60 * 1000));
        let will_expire_soon =
            days_until_expiration_ios.map(|days| days <= EXPIRATION_WARNING_DAYS);
        Self {
            product_id: purchase.product_id().to_owned(),
            is_active: true,
            platform: purchase.platform(),
            current_plan_id: purchase.current_plan_id().map(str::to_owned),
            transaction_id: purchase.transaction_id().to_owned(),
            transaction_date: purchase.transaction_date(),
            purchase_token: match purchase.purchase_token() {
                "" => None,
                token => Some(token.to_owned()),
            },
            environment_ios: match purchase {
                Purchase::Ios(p) => p.environment_ios.clone(),
                Purchase::Android(_) => None,
            },
            expiration_date_ios,
            days_until_expiration_ios,
            will_expire_soon,
            renewal_info_ios: match purchase {
                Purchase::Ios(p) => p.renewal_info_ios.clone(),
                Purchase::Android(_) => None,
            },
            auto_renewing_android: match purchase {
                Purchase::Ios(_) => None,
                Purchase::Android(p) => Some(p.is_auto_renewing),
            },
        }
    }
}

/// One StoreKit 2 subscription status entry, as returned by the
/// `subscriptionStatus` native call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusIos {
    /// StoreKit renewal state, e.g. `subscribed`, `expired`, `inGracePeriod`.
    pub state: String,
    #[serde(default, rename = "renewalInfoIOS", skip_serializing_if = "Option::is_none")]
    pub renewal_info_ios: Option<RenewalInfoIos>,
}
