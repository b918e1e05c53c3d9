use serde::Deserialize;

use crate::domain::entities::{active_subscription::SubscriptionStatusIos, purchase::RenewalInfoIos};

/// Raw entry of the StoreKit `subscriptionStatus` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionStatusModel {
    pub(crate) state: Option<String>,
    #[serde(rename = "renewalInfoIOS", alias = "renewalInfo")]
    pub(crate) renewal_info_ios: Option<RenewalInfoIos>,
}

impl SubscriptionStatusModel {
    pub(crate) fn into_status(self) -> SubscriptionStatusIos {
        SubscriptionStatusIos {
            state: self.state.unwrap_or_else(|| "unknown".to_owned()),
            renewal_info_ios: self.renewal_info_ios,
        }
    }
}
