use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    data::{
        datasources::{
            native_bridge::{BridgeError, NativeBridge},
            utils::{bool_or_false, list_or_empty, require_argument, string_or_empty},
        },
        models::{
            normalize::{normalize_product, normalize_products, normalize_purchase, normalize_purchases},
            store_kit::subscription_status_model::SubscriptionStatusModel,
        },
    },
    domain::entities::{
        active_subscription::SubscriptionStatusIos,
        app_transaction::AppTransactionIos,
        platform::IapPlatform,
        product::Product,
        purchase::Purchase,
        request::{
            AvailablePurchasesOptions, FetchProductsProps, ReceiptValidationArgIos,
            ReceiptValidationResultIos, RequestPurchaseIosProps,
        },
    },
    errors::{ErrorCode, ErrorCodeMapper, PurchaseError},
};

/// StoreKit facade: one method per native operation, each validating its
/// required arguments before the bridge call and shaping the quirky native
/// return into a stable type.
#[async_trait]
pub trait StoreKitDatasource: Send + Sync {
    /// Opens the StoreKit connection and starts the transaction observer.
    async fn init_connection(&self) -> Result<(), PurchaseError>;

    async fn end_connection(&self) -> Result<(), PurchaseError>;

    async fn fetch_products(&self, props: &FetchProductsProps) -> Result<Vec<Product>, PurchaseError>;

    /// Initiates a purchase. A non-null native result is the settled
    /// transaction; `None` means the outcome will arrive through the
    /// purchase-updated event instead.
    async fn request_purchase(
        &self,
        props: &RequestPurchaseIosProps,
    ) -> Result<Option<Purchase>, PurchaseError>;

    /// Subscription flavor of [`Self::request_purchase`]: an empty native
    /// result is an empty vector, never `None`.
    async fn request_subscription(
        &self,
        props: &RequestPurchaseIosProps,
    ) -> Result<Vec<Purchase>, PurchaseError>;

    async fn finish_transaction(&self, transaction_id: &str) -> Result<(), PurchaseError>;

    async fn get_available_purchases(
        &self,
        options: &AvailablePurchasesOptions,
    ) -> Result<Vec<Purchase>, PurchaseError>;

    /// Forces a StoreKit sync of transaction history.
    async fn sync(&self) -> Result<(), PurchaseError>;

    async fn get_pending_transactions(&self) -> Result<Vec<Purchase>, PurchaseError>;

    /// Currently-entitled transaction for one SKU; `None` when the user holds
    /// no entitlement.
    async fn current_entitlement(&self, sku: &str) -> Result<Option<Purchase>, PurchaseError>;

    /// Most recent transaction for one SKU, entitled or not.
    async fn latest_transaction(&self, sku: &str) -> Result<Option<Purchase>, PurchaseError>;

    /// Presents the manage-subscriptions sheet; resolves with whatever
    /// transactions changed while it was open.
    async fn show_manage_subscriptions(&self) -> Result<Vec<Purchase>, PurchaseError>;

    async fn subscription_status(
        &self,
        sku: &str,
    ) -> Result<Vec<SubscriptionStatusIos>, PurchaseError>;

    /// Base64 receipt blob; `""` when the device has none.
    async fn get_receipt_data(&self) -> Result<String, PurchaseError>;

    /// JWS representation of a transaction; `""` when unavailable.
    async fn get_transaction_jws(
        &self,
        transaction_id: Option<&str>,
    ) -> Result<String, PurchaseError>;

    /// Clears unfinished transactions from the queue. `false` when the native
    /// layer reports nothing (older implementations return `undefined`).
    async fn clear_transaction(&self) -> Result<bool, PurchaseError>;

    /// Presents the refund sheet for one SKU; the resolved string is the
    /// refund request status, `None` when the sheet was dismissed.
    async fn begin_refund_request(&self, sku: &str) -> Result<Option<String>, PurchaseError>;

    async fn present_code_redemption_sheet(&self) -> Result<(), PurchaseError>;

    async fn get_app_transaction(&self) -> Result<Option<AppTransactionIos>, PurchaseError>;

    async fn is_eligible_for_intro_offer(&self, group_id: &str) -> Result<bool, PurchaseError>;

    async fn get_promoted_product(&self) -> Result<Option<Product>, PurchaseError>;

    async fn request_purchase_on_promoted_product(&self) -> Result<(), PurchaseError>;

    /// Device-side receipt check. Accepts the structured props or a bare SKU
    /// string; either way a SKU is required.
    async fn validate_receipt(
        &self,
        arg: &ReceiptValidationArgIos,
    ) -> Result<ReceiptValidationResultIos, PurchaseError>;

    /// Storefront country code; `""` when the native layer reports none.
    async fn get_storefront(&self) -> Result<String, PurchaseError>;
}

pub struct StoreKitDatasourceImpl {
    bridge: Arc<dyn NativeBridge>,
    mapper: ErrorCodeMapper,
}

impl StoreKitDatasourceImpl {
    pub fn new(bridge: Arc<dyn NativeBridge>, mapper: ErrorCodeMapper) -> Self {
        Self { bridge, mapper }
    }

    fn map_err(&self, error: BridgeError, product_id: Option<String>) -> PurchaseError {
        PurchaseError::from_platform(
            IapPlatform::Ios,
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

    fn purchase_args(props: &RequestPurchaseIosProps) -> Result<Value, PurchaseError> {
        require_argument(&props.sku, "SKU", "requestPurchase")?;
        serde_json::to_value(props)
            .map_err(|e| PurchaseError::new(ErrorCode::DeveloperError, e.to_string()))
    }
}

#[async_trait]
impl StoreKitDatasource for StoreKitDatasourceImpl {
    async fn init_connection(&self) -> Result<(), PurchaseError> {
        self.call("initConnection", Value::Null).await?;
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
        props: &RequestPurchaseIosProps,
    ) -> Result<Option<Purchase>, PurchaseError> {
        let args = Self::purchase_args(props)?;
        let value = self
            .bridge
            .call("requestPurchase", args)
            .await
            .map_err(|e| self.map_err(e, Some(props.sku.clone())))?;
        Ok(normalize_purchase(&value))
    }

    async fn request_subscription(
        &self,
        props: &RequestPurchaseIosProps,
    ) -> Result<Vec<Purchase>, PurchaseError> {
        let args = Self::purchase_args(props)?;
        let value = self
            .bridge
            .call("requestPurchase", args)
            .await
            .map_err(|e| self.map_err(e, Some(props.sku.clone())))?;
        Ok(match value {
            Value::Array(_) => normalize_purchases(value),
            other => normalize_purchase(&other).into_iter().collect(),
        })
    }

    async fn finish_transaction(&self, transaction_id: &str) -> Result<(), PurchaseError> {
        require_argument(transaction_id, "transactionId", "finishTransaction")?;
        self.call("finishTransaction", json!({"transactionId": transaction_id}))
            .await?;
        Ok(())
    }

    async fn get_available_purchases(
        &self,
        options: &AvailablePurchasesOptions,
    ) -> Result<Vec<Purchase>, PurchaseError> {
        let args = serde_json::to_value(options)
            .map_err(|e| PurchaseError::new(ErrorCode::DeveloperError, e.to_string()))?;
        let value = self.call("getAvailableItems", args).await?;
        Ok(normalize_purchases(value))
    }

    async fn sync(&self) -> Result<(), PurchaseError> {
        self.call("sync", Value::Null).await?;
        Ok(())
    }

    async fn get_pending_transactions(&self) -> Result<Vec<Purchase>, PurchaseError> {
        let value = self.call("getPendingTransactions", Value::Null).await?;
        Ok(normalize_purchases(value))
    }

    async fn current_entitlement(&self, sku: &str) -> Result<Option<Purchase>, PurchaseError> {
        require_argument(sku, "SKU", "currentEntitlement")?;
        match self.call("currentEntitlement", json!({"sku": sku})).await {
            Ok(value) => Ok(normalize_purchase(&value)),
            // "No entitlement" surfaces as an error on some backends; that is
            // a None, not a failure.
            Err(e) if e.code == ErrorCode::SkuNotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn latest_transaction(&self, sku: &str) -> Result<Option<Purchase>, PurchaseError> {
        require_argument(sku, "SKU", "latestTransaction")?;
        match self.call("latestTransaction", json!({"sku": sku})).await {
            Ok(value) => Ok(normalize_purchase(&value)),
            Err(e) if e.code == ErrorCode::SkuNotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn show_manage_subscriptions(&self) -> Result<Vec<Purchase>, PurchaseError> {
        let value = self.call("showManageSubscriptions", Value::Null).await?;
        Ok(normalize_purchases(value))
    }

    async fn subscription_status(
        &self,
        sku: &str,
    ) -> Result<Vec<SubscriptionStatusIos>, PurchaseError> {
        require_argument(sku, "SKU", "subscriptionStatus")?;
        let value = self.call("subscriptionStatus", json!({"sku": sku})).await?;
        Ok(list_or_empty(value)
            .into_iter()
            .filter_map(|item| {
                serde_json::from_value::<SubscriptionStatusModel>(item)
                    .ok()
                    .map(SubscriptionStatusModel::into_status)
            })
            .collect())
    }

    async fn get_receipt_data(&self) -> Result<String, PurchaseError> {
        let value = self.call("getReceiptData", Value::Null).await?;
        Ok(string_or_empty(value))
    }

    async fn get_transaction_jws(
        &self,
        transaction_id: Option<&str>,
    ) -> Result<String, PurchaseError> {
        let args = match transaction_id {
            Some(id) => json!({"transactionId": id}),
            None => Value::Null,
        };
        let value = self.call("getTransactionJws", args).await?;
        Ok(string_or_empty(value))
    }

    async fn clear_transaction(&self) -> Result<bool, PurchaseError> {
        let value = self.call("clearTransaction", Value::Null).await?;
        Ok(bool_or_false(value))
    }

    async fn begin_refund_request(&self, sku: &str) -> Result<Option<String>, PurchaseError> {
        require_argument(sku, "SKU", "beginRefundRequest")?;
        let value = self.call("beginRefundRequest", json!({"sku": sku})).await?;
        Ok(value.as_str().map(str::to_owned))
    }

    async fn present_code_redemption_sheet(&self) -> Result<(), PurchaseError> {
        self.call("presentCodeRedemptionSheet", Value::Null).await?;
        Ok(())
    }

    async fn get_app_transaction(&self) -> Result<Option<AppTransactionIos>, PurchaseError> {
        let value = self.call("getAppTransaction", Value::Null).await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }

    async fn is_eligible_for_intro_offer(&self, group_id: &str) -> Result<bool, PurchaseError> {
        require_argument(group_id, "groupID", "isEligibleForIntroOffer")?;
        let value = self
            .call("isEligibleForIntroOffer", json!({"groupID": group_id}))
            .await?;
        Ok(bool_or_false(value))
    }

    async fn get_promoted_product(&self) -> Result<Option<Product>, PurchaseError> {
        let value = self.call("getPromotedProduct", Value::Null).await?;
        Ok(normalize_product(&value))
    }

    async fn request_purchase_on_promoted_product(&self) -> Result<(), PurchaseError> {
        self.call("requestPurchaseOnPromotedProduct", Value::Null)
            .await?;
        Ok(())
    }

    async fn validate_receipt(
        &self,
        arg: &ReceiptValidationArgIos,
    ) -> Result<ReceiptValidationResultIos, PurchaseError> {
        require_argument(arg.sku(), "SKU", "validateReceipt")?;
        let value = self
            .call("validateReceipt", json!({"sku": arg.sku()}))
            .await?;
        // Normalized backends return the full result object; legacy ones
        // return the bare receipt string.
        if value.get("isValid").is_some() {
            return serde_json::from_value(value)
                .map_err(|e| PurchaseError::new(ErrorCode::ReceiptFailed, e.to_string()));
        }
        match value {
            Value::String(receipt_data) => Ok(ReceiptValidationResultIos {
                is_valid: !receipt_data.is_empty(),
                receipt_data,
                jws_representation: String::new(),
                latest_transaction: None,
            }),
            _ => Ok(ReceiptValidationResultIos {
                is_valid: false,
                receipt_data: String::new(),
                jws_representation: String::new(),
                latest_transaction: None,
            }),
        }
    }

    async fn get_storefront(&self) -> Result<String, PurchaseError> {
        let value = self.call("getStorefront", Value::Null).await?;
        Ok(string_or_empty(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::entities::purchase::PurchaseState, test_support::MockBridge};
    use serde_json::json;

    fn datasource(bridge: Arc<MockBridge>) -> StoreKitDatasourceImpl {
        StoreKitDatasourceImpl::new(bridge, ErrorCodeMapper::empty())
    }

    #[tokio::test]
    async fn request_purchase_requires_sku_before_any_native_call() {
        let bridge = MockBridge::new().install();
        let ds = datasource(bridge.clone());
        let props = RequestPurchaseIosProps::default();
        let err = ds.request_purchase(&props).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DeveloperError);
        assert!(err.message.contains("requires a SKU"));
        assert_eq!(bridge.call_count("requestPurchase"), 0);
    }

    #[tokio::test]
    async fn request_purchase_null_result_means_event_delivery() {
        let bridge = MockBridge::new().install();
        let ds = datasource(bridge.clone());
        let props = RequestPurchaseIosProps {
            sku: "com.app.gems".to_owned(),
            ..Default::default()
        };
        assert_eq!(ds.request_purchase(&props).await.unwrap(), None);
        // The subscription arm renders the same null as an empty vector.
        assert!(ds.request_subscription(&props).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn request_purchase_settled_result_is_normalized() {
        let bridge = MockBridge::new()
            .with_response(
                "requestPurchase",
                json!({
                    "platform": "IOS",
                    "id": "tx-9",
                    "productId": "com.app.gems",
                    "purchaseState": "purchased"
                }),
            )
            .install();
        let ds = datasource(bridge);
        let props = RequestPurchaseIosProps {
            sku: "com.app.gems".to_owned(),
            ..Default::default()
        };
        let purchase = ds.request_purchase(&props).await.unwrap().unwrap();
        assert_eq!(purchase.platform(), IapPlatform::Ios);
        assert_eq!(purchase.purchase_state(), PurchaseState::Purchased);
    }

    #[tokio::test]
    async fn entitlement_getters_render_absence_as_none() {
        let bridge = MockBridge::new().install();
        let ds = datasource(bridge);
        assert_eq!(ds.current_entitlement("a.sku").await.unwrap(), None);
        assert_eq!(ds.latest_transaction("a.sku").await.unwrap(), None);
        assert!(ds.current_entitlement("").await.is_err());
    }

    #[tokio::test]
    async fn sku_not_found_error_is_absence_not_failure() {
        let table = crate::errors::ErrorCodeTable {
            ios: std::collections::HashMap::from([(
                "E_SKU_NOT_FOUND".to_owned(),
                "sku-not-found".to_owned(),
            )]),
            ..Default::default()
        };
        let bridge = MockBridge::new()
            .with_call_error(
                "currentEntitlement",
                BridgeError::new(Some("E_SKU_NOT_FOUND"), "no entitlement"),
            )
            .install();
        let ds = StoreKitDatasourceImpl::new(bridge, ErrorCodeMapper::from_table(&table));
        assert_eq!(ds.current_entitlement("a.sku").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_string_and_bool_getters_apply_null_defaults() {
        // MockBridge answers Null for every uncanned method.
        let bridge = MockBridge::new().install();
        let ds = datasource(bridge);
        assert!(ds.get_pending_transactions().await.unwrap().is_empty());
        assert!(ds.show_manage_subscriptions().await.unwrap().is_empty());
        assert!(ds.subscription_status("a.sku").await.unwrap().is_empty());
        assert_eq!(ds.get_receipt_data().await.unwrap(), "");
        assert_eq!(ds.get_transaction_jws(None).await.unwrap(), "");
        assert!(!ds.clear_transaction().await.unwrap());
        assert_eq!(ds.get_storefront().await.unwrap(), "");
    }

    #[tokio::test]
    async fn validate_receipt_passes_through_normalized_results() {
        let bridge = MockBridge::new()
            .with_response(
                "validateReceipt",
                json!({"isValid": true, "receiptData": "blob", "jwsRepresentation": "jws"}),
            )
            .install();
        let ds = datasource(bridge);
        let result = ds.validate_receipt(&"a.sku".into()).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.receipt_data, "blob");
        assert_eq!(result.jws_representation, "jws");
    }

    #[tokio::test]
    async fn validate_receipt_wraps_legacy_string_results() {
        let bridge = MockBridge::new()
            .with_response("validateReceipt", json!("raw-receipt"))
            .install();
        let ds = datasource(bridge);
        let result = ds.validate_receipt(&"a.sku".into()).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.receipt_data, "raw-receipt");
        let err = ds
            .validate_receipt(&"".into())
            .await
            .unwrap_err();
        assert!(err.message.contains("requires a SKU"));
    }

    #[tokio::test]
    async fn intro_offer_eligibility_requires_group_id() {
        let bridge = MockBridge::new().install();
        let ds = datasource(bridge.clone());
        let err = ds.is_eligible_for_intro_offer("").await.unwrap_err();
        assert!(err.message.contains("requires a groupID"));
        assert!(!ds.is_eligible_for_intro_offer("group-1").await.unwrap());
        assert_eq!(bridge.call_count("isEligibleForIntroOffer"), 1);
    }

    #[tokio::test]
    async fn bridge_failures_carry_platform_and_mapped_code() {
        let bridge = MockBridge::new()
            .with_call_error("sync", BridgeError::new(Some("E_SYNC"), "sync blew up"))
            .install();
        let ds = datasource(bridge);
        let err = ds.sync().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unknown);
        assert_eq!(err.platform, Some(IapPlatform::Ios));
        assert_eq!(err.message, "sync blew up");
    }
}
