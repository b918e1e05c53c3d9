use std::sync::Arc;

use crate::{
    data::{
        datasources::{
            bridge_resolver::{resolve_native_bridge, BridgeRegistry},
            native_bridge::NativeBridge,
            play_billing_datasource::{PlayBillingDatasource, PlayBillingDatasourceImpl},
            store_kit_datasource::{StoreKitDatasource, StoreKitDatasourceImpl},
        },
        repositories::iap_repository_impl::IapRepositoryImpl,
    },
    domain::{
        entities::{
            active_subscription::{ActiveSubscription, SubscriptionStatusIos},
            alternative_billing::{AlternativeBillingModeAndroid, UserChoiceBillingDetailsAndroid},
            app_transaction::AppTransactionIos,
            platform::IapPlatform,
            product::Product,
            purchase::Purchase,
            request::{
                AvailablePurchasesOptions, DeepLinkOptions, FetchProductsProps,
                ReceiptValidationArgIos, ReceiptValidationResult, ReceiptValidationResultIos,
                RequestPurchaseProps, RequestPurchaseResult, ValidateReceiptProps,
            },
        },
        repositories::iap_repository::IapRepository,
    },
    errors::{ErrorCode, ErrorCodeMapper, PurchaseError},
    events::{EventEmitter, EventSubscription},
};

/// Single entry point of the library.
///
/// Wraps the unified repository, the event emitter and the two platform
/// escape hatches (`*_ios` / `*_android` methods). Construct with
/// [`IapClient::connect`] in production or [`IapClient::with_bridge`] when
/// injecting a bridge directly.
pub struct IapClient<R: IapRepository> {
    platform: IapPlatform,
    repository: R,
    store_kit: Arc<dyn StoreKitDatasource>,
    play_billing: Arc<dyn PlayBillingDatasource>,
    emitter: EventEmitter,
}

impl IapClient<IapRepositoryImpl<StoreKitDatasourceImpl, PlayBillingDatasourceImpl>> {
    /// Resolves the native bridge from the registry, wires the event sink
    /// and opens the billing connection.
    pub async fn connect(
        platform: IapPlatform,
        registry: &BridgeRegistry,
    ) -> Result<Self, PurchaseError> {
        Self::connect_with_alternative_billing(platform, registry, AlternativeBillingModeAndroid::None)
            .await
    }

    /// Like [`IapClient::connect`], announcing the given alternative-billing
    /// mode to Play Billing when the connection is opened. Ignored on iOS.
    pub async fn connect_with_alternative_billing(
        platform: IapPlatform,
        registry: &BridgeRegistry,
        mode: AlternativeBillingModeAndroid,
    ) -> Result<Self, PurchaseError> {
        let bridge = resolve_native_bridge(registry)?;
        let client = Self::with_bridge_and_alternative_billing(platform, bridge, mode);
        client.init_connection().await?;
        Ok(client)
    }

    /// Builds a client around an already-resolved bridge handle, without
    /// touching the process-wide resolution cache or opening the connection.
    pub fn with_bridge(platform: IapPlatform, bridge: Arc<dyn NativeBridge>) -> Self {
        Self::with_bridge_and_alternative_billing(platform, bridge, AlternativeBillingModeAndroid::None)
    }

    pub fn with_bridge_and_alternative_billing(
        platform: IapPlatform,
        bridge: Arc<dyn NativeBridge>,
        mode: AlternativeBillingModeAndroid,
    ) -> Self {
        let mapper = ErrorCodeMapper::from_table(&bridge.error_codes());
        let emitter = EventEmitter::new(platform, mapper.clone());
        bridge.set_event_sink(emitter.sink());
        let repository = IapRepositoryImpl::new(
            platform,
            StoreKitDatasourceImpl::new(Arc::clone(&bridge), mapper.clone()),
            PlayBillingDatasourceImpl::new(Arc::clone(&bridge), mapper.clone())
                .with_alternative_billing_mode(mode),
        );
        Self {
            platform,
            repository,
            store_kit: Arc::new(StoreKitDatasourceImpl::new(Arc::clone(&bridge), mapper.clone())),
            play_billing: Arc::new(
                PlayBillingDatasourceImpl::new(bridge, mapper).with_alternative_billing_mode(mode),
            ),
            emitter,
        }
    }
}

impl<R: IapRepository> IapClient<R> {
    pub fn platform(&self) -> IapPlatform {
        self.platform
    }

    fn require_platform(&self, platform: IapPlatform, operation: &str) -> Result<(), PurchaseError> {
        if self.platform != platform {
            return Err(PurchaseError::new(
                ErrorCode::FeatureNotSupported,
                format!("{operation} is only available on {platform}"),
            )
            .with_platform(self.platform));
        }
        Ok(())
    }

    // ---------- Unified surface ----------

    pub async fn init_connection(&self) -> Result<(), PurchaseError> {
        self.repository.init_connection().await
    }

    /// Closes the billing connection and drops every registered listener.
    pub async fn end_connection(&self) -> Result<(), PurchaseError> {
        self.repository.end_connection().await?;
        self.emitter.clear_listeners();
        Ok(())
    }

    pub async fn fetch_products(
        &self,
        props: &FetchProductsProps,
    ) -> Result<Vec<Product>, PurchaseError> {
        self.repository.fetch_products(props).await
    }

    pub async fn request_purchase(
        &self,
        props: &RequestPurchaseProps,
    ) -> Result<RequestPurchaseResult, PurchaseError> {
        self.repository.request_purchase(props).await
    }

    pub async fn finish_transaction(
        &self,
        purchase: &Purchase,
        is_consumable: bool,
    ) -> Result<(), PurchaseError> {
        self.repository.finish_transaction(purchase, is_consumable).await
    }

    pub async fn get_available_purchases(
        &self,
        options: &AvailablePurchasesOptions,
    ) -> Result<Vec<Purchase>, PurchaseError> {
        self.repository.get_available_purchases(options).await
    }

    pub async fn get_active_subscriptions(
        &self,
        subscription_ids: Option<&[String]>,
    ) -> Result<Vec<ActiveSubscription>, PurchaseError> {
        self.repository.get_active_subscriptions(subscription_ids).await
    }

    pub async fn has_active_subscriptions(
        &self,
        subscription_ids: Option<&[String]>,
    ) -> Result<bool, PurchaseError> {
        self.repository.has_active_subscriptions(subscription_ids).await
    }

    pub async fn restore_purchases(&self) -> Result<(), PurchaseError> {
        self.repository.restore_purchases().await
    }

    pub async fn deep_link_to_subscriptions(
        &self,
        options: &DeepLinkOptions,
    ) -> Result<(), PurchaseError> {
        self.repository.deep_link_to_subscriptions(options).await
    }

    pub async fn validate_receipt(
        &self,
        props: &ValidateReceiptProps,
    ) -> Result<ReceiptValidationResult, PurchaseError> {
        self.repository.validate_receipt(props).await
    }

    pub async fn get_storefront(&self) -> Result<String, PurchaseError> {
        self.repository.get_storefront().await
    }

    // ---------- Event listeners ----------

    pub fn purchase_updated_listener(
        &self,
        listener: impl Fn(&Purchase) + Send + Sync + 'static,
    ) -> EventSubscription {
        self.emitter.add_purchase_updated_listener(listener)
    }

    pub fn purchase_error_listener(
        &self,
        listener: impl Fn(&PurchaseError) + Send + Sync + 'static,
    ) -> EventSubscription {
        self.emitter.add_purchase_error_listener(listener)
    }

    pub fn promoted_product_listener_ios(
        &self,
        listener: impl Fn(&Product) + Send + Sync + 'static,
    ) -> EventSubscription {
        self.emitter.add_promoted_product_listener_ios(listener)
    }

    pub fn user_choice_billing_listener_android(
        &self,
        listener: impl Fn(&UserChoiceBillingDetailsAndroid) + Send + Sync + 'static,
    ) -> EventSubscription {
        self.emitter.add_user_choice_billing_listener_android(listener)
    }

    // ---------- iOS escape hatches ----------

    pub async fn sync_ios(&self) -> Result<(), PurchaseError> {
        self.require_platform(IapPlatform::Ios, "sync")?;
        self.store_kit.sync().await
    }

    pub async fn get_pending_transactions_ios(&self) -> Result<Vec<Purchase>, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "getPendingTransactions")?;
        self.store_kit.get_pending_transactions().await
    }

    pub async fn current_entitlement_ios(
        &self,
        sku: &str,
    ) -> Result<Option<Purchase>, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "currentEntitlement")?;
        self.store_kit.current_entitlement(sku).await
    }

    pub async fn latest_transaction_ios(
        &self,
        sku: &str,
    ) -> Result<Option<Purchase>, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "latestTransaction")?;
        self.store_kit.latest_transaction(sku).await
    }

    pub async fn show_manage_subscriptions_ios(&self) -> Result<Vec<Purchase>, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "showManageSubscriptions")?;
        self.store_kit.show_manage_subscriptions().await
    }

    pub async fn subscription_status_ios(
        &self,
        sku: &str,
    ) -> Result<Vec<SubscriptionStatusIos>, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "subscriptionStatus")?;
        self.store_kit.subscription_status(sku).await
    }

    pub async fn get_receipt_data_ios(&self) -> Result<String, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "getReceiptData")?;
        self.store_kit.get_receipt_data().await
    }

    pub async fn get_transaction_jws_ios(
        &self,
        transaction_id: Option<&str>,
    ) -> Result<String, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "getTransactionJws")?;
        self.store_kit.get_transaction_jws(transaction_id).await
    }

    pub async fn clear_transaction_ios(&self) -> Result<bool, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "clearTransaction")?;
        self.store_kit.clear_transaction().await
    }

    pub async fn begin_refund_request_ios(
        &self,
        sku: &str,
    ) -> Result<Option<String>, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "beginRefundRequest")?;
        self.store_kit.begin_refund_request(sku).await
    }

    pub async fn present_code_redemption_sheet_ios(&self) -> Result<(), PurchaseError> {
        self.require_platform(IapPlatform::Ios, "presentCodeRedemptionSheet")?;
        self.store_kit.present_code_redemption_sheet().await
    }

    pub async fn get_app_transaction_ios(
        &self,
    ) -> Result<Option<AppTransactionIos>, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "getAppTransaction")?;
        self.store_kit.get_app_transaction().await
    }

    pub async fn is_eligible_for_intro_offer_ios(
        &self,
        group_id: &str,
    ) -> Result<bool, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "isEligibleForIntroOffer")?;
        self.store_kit.is_eligible_for_intro_offer(group_id).await
    }

    pub async fn get_promoted_product_ios(&self) -> Result<Option<Product>, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "getPromotedProduct")?;
        self.store_kit.get_promoted_product().await
    }

    pub async fn request_purchase_on_promoted_product_ios(&self) -> Result<(), PurchaseError> {
        self.require_platform(IapPlatform::Ios, "requestPurchaseOnPromotedProduct")?;
        self.store_kit.request_purchase_on_promoted_product().await
    }

    pub async fn validate_receipt_ios(
        &self,
        arg: impl Into<ReceiptValidationArgIos>,
    ) -> Result<ReceiptValidationResultIos, PurchaseError> {
        self.require_platform(IapPlatform::Ios, "validateReceipt")?;
        self.store_kit.validate_receipt(&arg.into()).await
    }

    // ---------- Android escape hatches ----------

    pub async fn consume_purchase_android(
        &self,
        purchase_token: &str,
    ) -> Result<(), PurchaseError> {
        self.require_platform(IapPlatform::Android, "consumeProduct")?;
        self.play_billing.consume_purchase(purchase_token).await
    }

    pub async fn acknowledge_purchase_android(
        &self,
        purchase_token: &str,
    ) -> Result<(), PurchaseError> {
        self.require_platform(IapPlatform::Android, "acknowledgePurchase")?;
        self.play_billing.acknowledge_purchase(purchase_token).await
    }

    pub async fn check_alternative_billing_availability_android(
        &self,
    ) -> Result<bool, PurchaseError> {
        self.require_platform(IapPlatform::Android, "checkAlternativeBillingAvailability")?;
        self.play_billing.check_alternative_billing_availability().await
    }

    pub async fn show_alternative_billing_dialog_android(&self) -> Result<bool, PurchaseError> {
        self.require_platform(IapPlatform::Android, "showAlternativeBillingInformationDialog")?;
        self.play_billing.show_alternative_billing_dialog().await
    }

    pub async fn create_alternative_billing_token_android(
        &self,
    ) -> Result<Option<String>, PurchaseError> {
        self.require_platform(IapPlatform::Android, "createAlternativeBillingReportingToken")?;
        self.play_billing.create_alternative_billing_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use serde_json::json;

    use crate::{
        data::datasources::native_bridge::NativeEventKind, test_support::MockBridge,
    };

    #[tokio::test]
    async fn connect_wires_the_sink_and_opens_the_connection() {
        let bridge = MockBridge::new().install();
        let client = IapClient::with_bridge(IapPlatform::Ios, bridge.clone());
        client.init_connection().await.unwrap();
        assert_eq!(bridge.call_count("initConnection"), 1);
        // The sink was installed by construction: native events reach
        // client listeners.
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        client.purchase_updated_listener(move |p| {
            sink_seen.lock().unwrap().push(p.product_id().to_owned());
        });
        bridge.emit(
            NativeEventKind::PurchaseUpdated,
            json!({"platform": "ios", "id": "tx-1", "productId": "com.app.gems"}),
        );
        assert_eq!(*seen.lock().unwrap(), vec!["com.app.gems".to_owned()]);
    }

    #[tokio::test]
    async fn configured_billing_mode_reaches_the_connection_call() {
        let bridge = MockBridge::new().install();
        let client = IapClient::with_bridge_and_alternative_billing(
            IapPlatform::Android,
            bridge.clone(),
            AlternativeBillingModeAndroid::AlternativeOnly,
        );
        client.init_connection().await.unwrap();
        let (method, args) = bridge.calls().into_iter().next().unwrap();
        assert_eq!(method, "initConnection");
        assert_eq!(args["alternativeBillingModeAndroid"], json!("alternative-only"));
    }

    #[tokio::test]
    async fn end_connection_tears_down_listeners() {
        let bridge = MockBridge::new().install();
        let client = IapClient::with_bridge(IapPlatform::Ios, bridge.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let listener_fired = Arc::clone(&fired);
        client.purchase_updated_listener(move |_| {
            listener_fired.fetch_add(1, Ordering::SeqCst);
        });
        client.end_connection().await.unwrap();
        assert_eq!(bridge.call_count("endConnection"), 1);
        bridge.emit(
            NativeEventKind::PurchaseUpdated,
            json!({"platform": "ios", "id": "tx-1", "productId": "com.app.gems"}),
        );
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn escape_hatches_enforce_the_running_platform() {
        let bridge = MockBridge::new().install();
        let client = IapClient::with_bridge(IapPlatform::Android, bridge.clone());
        let err = client.sync_ios().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FeatureNotSupported);
        assert_eq!(bridge.call_count("sync"), 0);
        let err = client.get_receipt_data_ios().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FeatureNotSupported);
        client.consume_purchase_android("token-1").await.unwrap();
        assert_eq!(bridge.call_count("consumeProduct"), 1);
    }

    #[tokio::test]
    async fn ios_escape_hatches_reach_the_store_kit_surface() {
        let bridge = MockBridge::new()
            .with_response("getStorefront", json!("USA"))
            .with_response("clearTransaction", json!(true))
            .install();
        let client = IapClient::with_bridge(IapPlatform::Ios, bridge.clone());
        assert!(client.clear_transaction_ios().await.unwrap());
        assert_eq!(client.get_storefront().await.unwrap(), "USA");
        assert!(client.get_pending_transactions_ios().await.unwrap().is_empty());
        let err = client
            .consume_purchase_android("token-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FeatureNotSupported);
    }

    #[tokio::test]
    async fn error_events_flow_through_the_bridge_error_table() {
        let table = crate::errors::ErrorCodeTable {
            android: std::collections::HashMap::from([(
                "1".to_owned(),
                "user-cancelled".to_owned(),
            )]),
            ..Default::default()
        };
        let bridge = MockBridge::new().with_error_codes(table).install();
        let client = IapClient::with_bridge(IapPlatform::Android, bridge.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        client.purchase_error_listener(move |e| {
            sink_seen.lock().unwrap().push(e.code);
        });
        bridge.emit(
            NativeEventKind::PurchaseError,
            json!({"code": "1", "message": "backed out"}),
        );
        assert_eq!(*seen.lock().unwrap(), vec![ErrorCode::UserCancelled]);
    }
}
