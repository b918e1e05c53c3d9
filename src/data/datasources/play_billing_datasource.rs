use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    data::{
        datasources::{
            native_bridge::{BridgeError, NativeBridge},
            utils::{bool_or_false, require_argument, require_non_empty, string_or_empty},
        },
        models::normalize::{normalize_products, normalize_purchases},
    },
    domain::entities::{
        alternative_billing::AlternativeBillingModeAndroid,
        platform::IapPlatform,
        product::Product,
        purchase::Purchase,
        request::{
            DeepLinkOptions, FetchProductsProps, ReceiptValidationResultAndroid,
            RequestPurchaseAndroidProps, RequestSubscriptionAndroidProps, ValidateReceiptProps,
        },
    },
    errors::{ErrorCode, ErrorCodeMapper, PurchaseError},
};

/// Play Billing facade, the Android counterpart of
/// [`crate::data::datasources::store_kit_datasource::StoreKitDatasource`].
#[async_trait]
pub trait PlayBillingDatasource: Send + Sync {
    /// Connects to the Play Billing service.
    async fn init_connection(&self) -> Result<(), PurchaseError>;

    async fn end_connection(&self) -> Result<(), PurchaseError>;

    async fn fetch_products(&self, props: &FetchProductsProps) -> Result<Vec<Product>, PurchaseError>;

    /// Launches the one-time billing flow. Requires a non-empty `skus` list;
    /// the settled purchases come back in the native result.
    async fn request_purchase(
        &self,
        props: &RequestPurchaseAndroidProps,
        use_alternative_billing: bool,
    ) -> Result<Vec<Purchase>, PurchaseError>;

    /// Launches the subscription billing flow. Every field of the request is
    /// sent explicitly, defaults included, so the native side never has to
    /// guess.
    async fn request_subscription(
        &self,
        props: &RequestSubscriptionAndroidProps,
        use_alternative_billing: bool,
    ) -> Result<Vec<Purchase>, PurchaseError>;

    /// Consumes a one-time purchase so it can be bought again.
    async fn consume_purchase(&self, purchase_token: &str) -> Result<(), PurchaseError>;

    /// Acknowledges a non-consumable or subscription purchase.
    async fn acknowledge_purchase(&self, purchase_token: &str) -> Result<(), PurchaseError>;

    async fn get_available_purchases(&self) -> Result<Vec<Purchase>, PurchaseError>;

    /// Opens the Play subscription-management screen.
    async fn deep_link_to_subscriptions(
        &self,
        options: &DeepLinkOptions,
    ) -> Result<(), PurchaseError>;

    async fn get_storefront(&self) -> Result<String, PurchaseError>;

    /// Server-style receipt check through the native layer. The Android
    /// options block is required.
    async fn validate_receipt(
        &self,
        props: &ValidateReceiptProps,
    ) -> Result<ReceiptValidationResultAndroid, PurchaseError>;

    async fn check_alternative_billing_availability(&self) -> Result<bool, PurchaseError>;

    async fn show_alternative_billing_dialog(&self) -> Result<bool, PurchaseError>;

    /// Reporting token for an alternative-billing transaction; `None` when
    /// the native layer produced none.
    async fn create_alternative_billing_token(&self) -> Result<Option<String>, PurchaseError>;
}

pub struct PlayBillingDatasourceImpl {
    bridge: Arc<dyn NativeBridge>,
    mapper: ErrorCodeMapper,
    alternative_billing_mode: AlternativeBillingModeAndroid,
}

impl PlayBillingDatasourceImpl {
    pub fn new(bridge: Arc<dyn NativeBridge>, mapper: ErrorCodeMapper) -> Self {
        Self {
            bridge,
            mapper,
            alternative_billing_mode: AlternativeBillingModeAndroid::None,
        }
    }

    /// Selects the billing mode announced to Play Billing when the
    /// connection is opened.
    pub fn with_alternative_billing_mode(mut self, mode: AlternativeBillingModeAndroid) -> Self {
        self.alternative_billing_mode = mode;
        self
    }

    fn map_err(&self, error: BridgeError, product_id: Option<String>) -> PurchaseError {
        PurchaseError::from_platform(
            IapPlatform::Android,
            &self.mapper,
            error.code.as_deref(),
            Some(&error.message),
            product_id,
            error.response_code,
            error.debug_message,
        )
    }

    async fn call(&self, method: &str, args: Value) -> Result<Value, PurchaseError> {
        self.bridge
            .call(method, args)
            .await
            .map_err(|e| self.map_err(e, None))
    }

    fn to_args<T: serde::Serialize>(props: &T) -> Result<Value, PurchaseError> {
        serde_json::to_value(props)
            .map_err(|e| PurchaseError::new(ErrorCode::DeveloperError, e.to_string()))
    }
}

#[async_trait]
impl PlayBillingDatasource for PlayBillingDatasourceImpl {
    async fn init_connection(&self) -> Result<(), PurchaseError> {
        let args = match self.alternative_billing_mode {
            AlternativeBillingModeAndroid::None => Value::Null,
            mode => json!({"alternativeBillingModeAndroid": mode}),
        };
        self.call("initConnection", args).await?;
        Ok(())
    }

    async fn end_connection(&self) -> Result<(), PurchaseError> {
        self.call("endConnection", Value::Null).await?;
        Ok(())
    }

    async fn fetch_products(&self, props: &FetchProductsProps) -> Result<Vec<Product>, PurchaseError> {
        let args = json!({"skus": props.skus, "type": props.query_type});
        let value = self.call("fetchProducts", args).await?;
        Ok(normalize_products(value))
    }

    async fn request_purchase(
        &self,
        props: &RequestPurchaseAndroidProps,
        use_alternative_billing: bool,
    ) -> Result<Vec<Purchase>, PurchaseError> {
        require_non_empty(&props.skus, "skus array", "requestPurchase")?;
        let mut args = Self::to_args(props)?;
        args["type"] = json!("in-app");
        args["useAlternativeBilling"] = json!(use_alternative_billing);
        let sku = props.skus.first().cloned();
        let value = self
            .bridge
            .call("requestPurchase", args)
            .await
            .map_err(|e| self.map_err(e, sku))?;
        Ok(normalize_purchases(value))
    }

    async fn request_subscription(
        &self,
        props: &RequestSubscriptionAndroidProps,
        use_alternative_billing: bool,
    ) -> Result<Vec<Purchase>, PurchaseError> {
        require_non_empty(&props.skus, "skus array", "requestPurchase")?;
        let mut args = Self::to_args(props)?;
        args["type"] = json!("subs");
        args["useAlternativeBilling"] = json!(use_alternative_billing);
        let sku = props.skus.first().cloned();
        let value = self
            .bridge
            .call("requestPurchase", args)
            .await
            .map_err(|e| self.map_err(e, sku))?;
        Ok(normalize_purchases(value))
    }

    async fn consume_purchase(&self, purchase_token: &str) -> Result<(), PurchaseError> {
        require_argument(purchase_token, "purchaseToken", "consumeProduct")?;
        self.call("consumeProduct", json!({"purchaseToken": purchase_token}))
            .await?;
        Ok(())
    }

    async fn acknowledge_purchase(&self, purchase_token: &str) -> Result<(), PurchaseError> {
        require_argument(purchase_token, "purchaseToken", "acknowledgePurchase")?;
        self.call("acknowledgePurchase", json!({"purchaseToken": purchase_token}))
            .await?;
        Ok(())
    }

    async fn get_available_purchases(&self) -> Result<Vec<Purchase>, PurchaseError> {
        let value = self.call("getAvailableItems", Value::Null).await?;
        Ok(normalize_purchases(value))
    }

    async fn deep_link_to_subscriptions(
        &self,
        options: &DeepLinkOptions,
    ) -> Result<(), PurchaseError> {
        let args = Self::to_args(options)?;
        self.call("deepLinkToSubscriptions", args).await?;
        Ok(())
    }

    async fn get_storefront(&self) -> Result<String, PurchaseError> {
        let value = self.call("getStorefront", Value::Null).await?;
        Ok(string_or_empty(value))
    }

    async fn validate_receipt(
        &self,
        props: &ValidateReceiptProps,
    ) -> Result<ReceiptValidationResultAndroid, PurchaseError> {
        require_argument(&props.sku, "SKU", "validateReceipt")?;
        let options = props.android_options.as_ref().ok_or_else(|| {
            PurchaseError::new(
                ErrorCode::DeveloperError,
                "validateReceipt requires androidOptions",
            )
        })?;
        let mut args = Self::to_args(options)?;
        args["sku"] = json!(props.sku);
        let value = self.call("validateReceipt", args).await?;
        serde_json::from_value(value)
            .map_err(|e| PurchaseError::new(ErrorCode::ReceiptFailed, e.to_string()))
    }

    async fn check_alternative_billing_availability(&self) -> Result<bool, PurchaseError> {
        let value = self
            .call("checkAlternativeBillingAvailability", Value::Null)
            .await?;
        Ok(bool_or_false(value))
    }

    async fn show_alternative_billing_dialog(&self) -> Result<bool, PurchaseError> {
        let value = self
            .call("showAlternativeBillingInformationDialog", Value::Null)
            .await?;
        Ok(bool_or_false(value))
    }

    async fn create_alternative_billing_token(&self) -> Result<Option<String>, PurchaseError> {
        let value = self
            .call("createAlternativeBillingReportingToken", Value::Null)
            .await?;
        Ok(value.as_str().map(str::to_owned))
    }
}
