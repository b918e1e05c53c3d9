use serde::Deserialize;

use crate::domain::entities::product::{ProductIos, ProductType, SubscriptionInfoIos};

/// Raw StoreKit catalog entry as delivered by the native bridge.
///
/// The native side enforces no typed contract, so every field is optional
/// here; conversion into the domain entity applies the documented defaults.
/// An entry without an `id` is dropped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IosProductModel {
    pub(crate) id: Option<String>,
    #[serde(rename = "type")]
    pub(crate) product_type: Option<String>,
    pub(crate) title: Option<String>,
    #[serde(alias = "localizedDescription")]
    pub(crate) description: Option<String>,
    #[serde(alias = "localizedPrice")]
    pub(crate) display_price: Option<String>,
    pub(crate) currency: Option<String>,
    pub(crate) price: Option<f64>,
    #[serde(rename = "displayNameIOS")]
    pub(crate) display_name_ios: Option<String>,
    #[serde(rename = "isFamilyShareableIOS")]
    pub(crate) is_family_shareable_ios: Option<bool>,
    #[serde(rename = "subscriptionInfoIOS")]
    pub(crate) subscription_info_ios: Option<SubscriptionInfoIos>,
}

impl IosProductModel {
    pub(crate) fn into_product(self) -> Option<ProductIos> {
        let id = self.id?;
        let product_type = match self.product_type.as_deref() {
            Some("subs") => ProductType::Subs,
            Some("in-app") | Some("inapp") => ProductType::InApp,
            // Missing or unrecognized: infer from subscription metadata.
            _ if self.subscription_info_ios.is_some() => ProductType::Subs,
            _ => ProductType::InApp,
        };
        Some(ProductIos {
            id,
            product_type,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            display_price: self.display_price.unwrap_or_default(),
            currency: self.currency.unwrap_or_default(),
            price: self.price,
            display_name_ios: self.display_name_ios,
            is_family_shareable_ios: self.is_family_shareable_ios.unwrap_or(false),
            subscription_info_ios: self.subscription_info_ios,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sparse_payload_gets_literal_defaults() {
        let model: IosProductModel =
            serde_json::from_value(json!({"id": "a.b", "displayPrice": "$1.99"})).unwrap();
        let product = model.into_product().unwrap();
        assert_eq!(product.id, "a.b");
        assert_eq!(product.product_type, ProductType::InApp);
        assert_eq!(product.title, "");
        assert_eq!(product.currency, "");
        assert!(!product.is_family_shareable_ios);
    }

    #[test]
    fn missing_id_drops_the_entry() {
        let model: IosProductModel =
            serde_json::from_value(json!({"title": "No id"})).unwrap();
        assert!(model.into_product().is_none());
    }

    #[test]
    fn type_inferred_from_subscription_info() {
        let model: IosProductModel = serde_json::from_value(json!({
            "id": "sub.monthly",
            "subscriptionInfoIOS": {"subscriptionGroupId": "g1"}
        }))
        .unwrap();
        assert_eq!(model.into_product().unwrap().product_type, ProductType::Subs);
    }
}
