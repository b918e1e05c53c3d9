use serde::Deserialize;

use crate::domain::entities::product::{
    OneTimePurchaseOfferDetailsAndroid, ProductAndroid, ProductType,
    SubscriptionOfferDetailsAndroid,
};

/// Raw Play Billing catalog entry as delivered by the native bridge.
///
/// An entry without an `id` (or legacy `productId`) is dropped; a missing
/// `type` is inferred from the presence of subscription offer details.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AndroidProductModel {
    #[serde(alias = "productId")]
    pub(crate) id: Option<String>,
    #[serde(rename = "type")]
    pub(crate) product_type: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    #[serde(alias = "localizedPrice")]
    pub(crate) display_price: Option<String>,
    pub(crate) currency: Option<String>,
    pub(crate) price: Option<f64>,
    pub(crate) name_android: Option<String>,
    pub(crate) one_time_purchase_offer_details_android:
        Option<OneTimePurchaseOfferDetailsAndroid>,
    pub(crate) subscription_offer_details_android: Option<Vec<SubscriptionOfferDetailsAndroid>>,
}

impl AndroidProductModel {
    pub(crate) fn into_product(self) -> Option<ProductAndroid> {
        let id = self.id?;
        let product_type = match self.product_type.as_deref() {
            Some("subs") => ProductType::Subs,
            Some("in-app") | Some("inapp") => ProductType::InApp,
            _ if self.subscription_offer_details_android.is_some() => ProductType::Subs,
            _ => ProductType::InApp,
        };
        Some(ProductAndroid {
            id,
            product_type,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            display_price: self.display_price.unwrap_or_default(),
            currency: self.currency.unwrap_or_default(),
            price: self.price,
            name_android: self.name_android,
            one_time_purchase_offer_details_android: self.one_time_purchase_offer_details_android,
            subscription_offer_details_android: self.subscription_offer_details_android,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_product_id_alias_is_accepted() {
        let model: AndroidProductModel =
            serde_json::from_value(json!({"productId": "coins.100", "type": "in-app"})).unwrap();
        let product = model.into_product().unwrap();
        assert_eq!(product.id, "coins.100");
        assert_eq!(product.product_type, ProductType::InApp);
    }

    #[test]
    fn type_inferred_from_offer_details() {
        let model: AndroidProductModel = serde_json::from_value(json!({
            "id": "premium",
            "subscriptionOfferDetailsAndroid": []
        }))
        .unwrap();
        assert_eq!(model.into_product().unwrap().product_type, ProductType::Subs);
    }
}
