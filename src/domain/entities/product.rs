use serde::{Deserialize, Serialize};

use crate::{
    domain::entities::platform::IapPlatform,
    errors::{ErrorCode, PurchaseError},
};

/// Kind of a purchasable catalog entry. Wire literals: `"in-app"` / `"subs"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "in-app")]
    InApp,
    #[serde(rename = "subs")]
    Subs,
}

/// Product set requested from `fetch_products`. `All` returns a mixed array
/// in which each item keeps its own [`ProductType`] discriminant.
///
/// Deserialization goes through [`ProductQueryType::parse`], so the legacy
/// `"inapp"` form is accepted with the same deprecation warning everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ProductQueryType {
    #[default]
    #[serde(rename = "in-app")]
    InApp,
    #[serde(rename = "subs")]
    Subs,
    #[serde(rename = "all")]
    All,
}

impl<'de> Deserialize<'de> for ProductQueryType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

impl ProductQueryType {
    /// Parses a query type string. The legacy alias `"inapp"` is accepted and
    /// normalized to `"in-app"` with a deprecation warning.
    pub fn parse(value: &str) -> Result<Self, PurchaseError> {
        match value {
            "in-app" => Ok(Self::InApp),
            "inapp" => {
                tracing::warn!("product query type \"inapp\" is deprecated; use \"in-app\"");
                Ok(Self::InApp)
            }
            "subs" => Ok(Self::Subs),
            "all" => Ok(Self::All),
            other => Err(PurchaseError::new(
                ErrorCode::DeveloperError,
                format!("unknown product query type: {other:?}"),
            )),
        }
    }

    /// Whether a product of the given type belongs in this query's result.
    pub fn includes(&self, product_type: ProductType) -> bool {
        match self {
            Self::InApp => product_type == ProductType::InApp,
            Self::Subs => product_type == ProductType::Subs,
            Self::All => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InApp => "in-app",
            Self::Subs => "subs",
            Self::All => "all",
        }
    }
}

/// Purchasable catalog entry, discriminated by the `platform` field.
///
/// Created from native catalog data by `fetch_products`; immutable and not
/// persisted. The variant tag guarantees that an object claiming one
/// platform never carries the other platform's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform")]
pub enum Product {
    #[serde(rename = "ios")]
    Ios(ProductIos),
    #[serde(rename = "android")]
    Android(ProductAndroid),
}

impl Product {
    pub fn platform(&self) -> IapPlatform {
        match self {
            Product::Ios(_) => IapPlatform::Ios,
            Product::Android(_) => IapPlatform::Android,
        }
    }

    /// Store SKU.
    pub fn id(&self) -> &str {
        match self {
            Product::Ios(p) => &p.id,
            Product::Android(p) => &p.id,
        }
    }

    pub fn product_type(&self) -> ProductType {
        match self {
            Product::Ios(p) => p.product_type,
            Product::Android(p) => p.product_type,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Product::Ios(p) => &p.title,
            Product::Android(p) => &p.title,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Product::Ios(p) => &p.description,
            Product::Android(p) => &p.description,
        }
    }

    /// Localized, store-formatted price string.
    pub fn display_price(&self) -> &str {
        match self {
            Product::Ios(p) => &p.display_price,
            Product::Android(p) => &p.display_price,
        }
    }

    pub fn currency(&self) -> &str {
        match self {
            Product::Ios(p) => &p.currency,
            Product::Android(p) => &p.currency,
        }
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            Product::Ios(p) => p.price,
            Product::Android(p) => p.price,
        }
    }
}

/// StoreKit catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductIos {
    pub id: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub title: String,
    pub description: String,
    pub display_price: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, rename = "displayNameIOS", skip_serializing_if = "Option::is_none")]
    pub display_name_ios: Option<String>,
    #[serde(default, rename = "isFamilyShareableIOS")]
    pub is_family_shareable_ios: bool,
    #[serde(default, rename = "subscriptionInfoIOS", skip_serializing_if = "Option::is_none")]
    pub subscription_info_ios: Option<SubscriptionInfoIos>,
}

/// StoreKit subscription metadata attached to subscription products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfoIos {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_period: Option<SubscriptionPeriodIos>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPeriodIos {
    /// One of `DAY`, `WEEK`, `MONTH`, `YEAR`.
    pub unit: String,
    pub value: i32,
}

/// Play Billing catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAndroid {
    pub id: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub title: String,
    pub description: String,
    pub display_price: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_time_purchase_offer_details_android: Option<OneTimePurchaseOfferDetailsAndroid>,
    /// Present only for subscription products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_offer_details_android: Option<Vec<SubscriptionOfferDetailsAndroid>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimePurchaseOfferDetailsAndroid {
    pub formatted_price: String,
    /// Micros are carried as a decimal string, matching the Play wire form.
    pub price_amount_micros: String,
    pub price_currency_code: String,
}

/// One purchasable offer of an Android subscription base plan. The
/// `offer_token` is what `request_purchase` needs to buy this offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOfferDetailsAndroid {
    pub base_plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,
    pub offer_token: String,
    #[serde(default)]
    pub offer_tags: Vec<String>,
    pub pricing_phases: PricingPhasesAndroid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPhasesAndroid {
    #[serde(default)]
    pub pricing_phase_list: Vec<PricingPhaseAndroid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPhaseAndroid {
    pub formatted_price: String,
    pub price_currency_code: String,
    /// ISO 8601 period, e.g. `P1M`.
    pub billing_period: String,
    #[serde(default)]
    pub billing_cycle_count: i32,
    #[serde(default)]
    pub price_amount_micros: String,
    #[serde(default)]
    pub recurrence_mode: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_accepts_legacy_inapp_alias() {
        assert_eq!(ProductQueryType::parse("in-app").unwrap(), ProductQueryType::InApp);
        assert_eq!(ProductQueryType::parse("inapp").unwrap(), ProductQueryType::InApp);
        assert_eq!(ProductQueryType::parse("subs").unwrap(), ProductQueryType::Subs);
        assert_eq!(ProductQueryType::parse("all").unwrap(), ProductQueryType::All);
        assert_eq!(
            ProductQueryType::parse("subscription").unwrap_err().code,
            ErrorCode::DeveloperError
        );
    }

    #[test]
    fn deserialization_routes_through_parse() {
        let decoded: ProductQueryType = serde_json::from_value(json!("inapp")).unwrap();
        assert_eq!(decoded, ProductQueryType::InApp);
        assert!(serde_json::from_value::<ProductQueryType>(json!("subscription")).is_err());
        // The same normalization applies when nested in request props.
        let props: crate::domain::entities::request::FetchProductsProps =
            serde_json::from_value(json!({"skus": ["a.b"], "type": "inapp"})).unwrap();
        assert_eq!(props.query_type, ProductQueryType::InApp);
    }

    #[test]
    fn query_type_membership() {
        assert!(ProductQueryType::InApp.includes(ProductType::InApp));
        assert!(!ProductQueryType::InApp.includes(ProductType::Subs));
        assert!(ProductQueryType::All.includes(ProductType::Subs));
        assert!(ProductQueryType::All.includes(ProductType::InApp));
    }

    #[test]
    fn product_serializes_with_platform_tag() {
        let product = Product::Ios(ProductIos {
            id: "a.b".into(),
            product_type: ProductType::InApp,
            title: "Coins".into(),
            description: String::new(),
            display_price: "$0.99".into(),
            currency: "USD".into(),
            price: Some(0.99),
            display_name_ios: None,
            is_family_shareable_ios: false,
            subscription_info_ios: None,
        });
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["platform"], json!("ios"));
        assert_eq!(value["type"], json!("in-app"));
        assert_eq!(value["isFamilyShareableIOS"], json!(false));
        let back: Product = serde_json::from_value(value).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn android_offer_details_round_trip() {
        let value = json!({
            "platform": "android",
            "id": "premium.monthly",
            "type": "subs",
            "title": "Premium",
            "description": "Monthly premium",
            "displayPrice": "$4.99",
            "currency": "USD",
            "nameAndroid": "Premium",
            "subscriptionOfferDetailsAndroid": [{
                "basePlanId": "monthly",
                "offerToken": "token-1",
                "pricingPhases": {
                    "pricingPhaseList": [{
                        "formattedPrice": "$4.99",
                        "priceCurrencyCode": "USD",
                        "billingPeriod": "P1M"
                    }]
                }
            }]
        });
        let product: Product = serde_json::from_value(value).unwrap();
        let Product::Android(ref android) = product else {
            panic!("expected android variant");
        };
        let offers = android.subscription_offer_details_android.as_ref().unwrap();
        assert_eq!(offers[0].base_plan_id, "monthly");
        assert_eq!(offers[0].offer_token, "token-1");
        assert_eq!(product.id(), "premium.monthly");
        assert_eq!(product.product_type(), ProductType::Subs);
    }
}
