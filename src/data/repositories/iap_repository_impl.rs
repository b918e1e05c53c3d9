use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::{
    data::datasources::{
        play_billing_datasource::PlayBillingDatasource, store_kit_datasource::StoreKitDatasource,
    },
    domain::{
        entities::{
            active_subscription::ActiveSubscription,
            platform::IapPlatform,
            product::Product,
            purchase::Purchase,
            request::{
                AvailablePurchasesOptions, DeepLinkOptions, FetchProductsProps,
                ReceiptValidationResult, RequestPurchaseProps, RequestPurchaseResult,
                ValidateReceiptProps,
            },
        },
        repositories::iap_repository::IapRepository,
    },
    errors::{ErrorCode, PurchaseError},
};

/// Platform-dispatching [`IapRepository`] over the two store facades.
///
/// The running platform is fixed at construction; only that platform's
/// datasource is ever invoked.
pub struct IapRepositoryImpl<A: StoreKitDatasource, B: PlayBillingDatasource> {
    platform: IapPlatform,
    store_kit: A,
    play_billing: B,
}

impl<A: StoreKitDatasource, B: PlayBillingDatasource> IapRepositoryImpl<A, B> {
    pub fn new(platform: IapPlatform, store_kit: A, play_billing: B) -> Self {
        Self {
            platform,
            store_kit,
            play_billing,
        }
    }

    fn missing_platform_props(&self) -> PurchaseError {
        PurchaseError::new(
            ErrorCode::DeveloperError,
            format!(
                "requestPurchase requires request props for platform {}",
                self.platform
            ),
        )
        .with_platform(self.platform)
    }

    /// Catalog responses can contain entries the caller never asked for or
    /// of the wrong type; the dispatcher filters rather than trusts.
    fn filter_products(&self, products: Vec<Product>, props: &FetchProductsProps) -> Vec<Product> {
        products
            .into_iter()
            .filter(|p| {
                p.platform() == self.platform
                    && props.skus.iter().any(|sku| sku == p.id())
                    && props.query_type.includes(p.product_type())
            })
            .collect()
    }

    fn is_subscription_shaped(purchase: &Purchase) -> bool {
        purchase.is_auto_renewing() || purchase.expiration_date().is_some()
    }
}

#[async_trait]
impl<A: StoreKitDatasource, B: PlayBillingDatasource> IapRepository for IapRepositoryImpl<A, B> {
    async fn init_connection(&self) -> Result<(), PurchaseError> {
        match self.platform {
            IapPlatform::Ios => self.store_kit.init_connection().await,
            IapPlatform::Android => self.play_billing.init_connection().await,
        }
    }

    async fn end_connection(&self) -> Result<(), PurchaseError> {
        match self.platform {
            IapPlatform::Ios => self.store_kit.end_connection().await,
            IapPlatform::Android => self.play_billing.end_connection().await,
        }
    }

    async fn fetch_products(
        &self,
        props: &FetchProductsProps,
    ) -> Result<Vec<Product>, PurchaseError> {
        if props.skus.is_empty() || props.skus.iter().all(|s| s.trim().is_empty()) {
            return Err(PurchaseError::new(
                ErrorCode::EmptySkuList,
                "fetchProducts requires a non-empty skus array",
            ));
        }
        let products = match self.platform {
            IapPlatform::Ios => self.store_kit.fetch_products(props).await?,
            IapPlatform::Android => self.play_billing.fetch_products(props).await?,
        };
        Ok(self.filter_products(products, props))
    }

    async fn request_purchase(
        &self,
        props: &RequestPurchaseProps,
    ) -> Result<RequestPurchaseResult, PurchaseError> {
        match props {
            RequestPurchaseProps::InApp {
                request,
                use_alternative_billing,
            } => match self.platform {
                IapPlatform::Ios => {
                    let ios = request.ios.as_ref().ok_or_else(|| self.missing_platform_props())?;
                    let purchase = self.store_kit.request_purchase(ios).await?;
                    Ok(RequestPurchaseResult::OneTime(purchase))
                }
                IapPlatform::Android => {
                    let android = request
                        .android
                        .as_ref()
                        .ok_or_else(|| self.missing_platform_props())?;
                    let purchases = self
                        .play_billing
                        .request_purchase(android, *use_alternative_billing)
                        .await?;
                    Ok(RequestPurchaseResult::OneTime(purchases.into_iter().next()))
                }
            },
            RequestPurchaseProps::Subs {
                request,
                use_alternative_billing,
            } => match self.platform {
                IapPlatform::Ios => {
                    let ios = request.ios.as_ref().ok_or_else(|| self.missing_platform_props())?;
                    let purchases = self.store_kit.request_subscription(ios).await?;
                    Ok(RequestPurchaseResult::Subscriptions(purchases))
                }
                IapPlatform::Android => {
                    let android = request
                        .android
                        .as_ref()
                        .ok_or_else(|| self.missing_platform_props())?;
                    let purchases = self
                        .play_billing
                        .request_subscription(android, *use_alternative_billing)
                        .await?;
                    Ok(RequestPurchaseResult::Subscriptions(purchases))
                }
            },
        }
    }

    async fn finish_transaction(
        &self,
        purchase: &Purchase,
        is_consumable: bool,
    ) -> Result<(), PurchaseError> {
        match self.platform {
            IapPlatform::Ios => self.store_kit.finish_transaction(purchase.transaction_id()).await,
            IapPlatform::Android => {
                let token = purchase.purchase_token();
                if token.is_empty() {
                    return Err(PurchaseError::new(
                        ErrorCode::DeveloperError,
                        "purchase.purchaseToken required to finish transaction",
                    )
                    .with_product_id(purchase.product_id())
                    .with_platform(IapPlatform::Android));
                }
                if is_consumable {
                    self.play_billing.consume_purchase(token).await
                } else {
                    self.play_billing.acknowledge_purchase(token).await
                }
            }
        }
    }

    async fn get_available_purchases(
        &self,
        options: &AvailablePurchasesOptions,
    ) -> Result<Vec<Purchase>, PurchaseError> {
        match self.platform {
            IapPlatform::Ios => self.store_kit.get_available_purchases(options).await,
            IapPlatform::Android => self.play_billing.get_available_purchases().await,
        }
    }

    async fn get_active_subscriptions(
        &self,
        subscription_ids: Option<&[String]>,
    ) -> Result<Vec<ActiveSubscription>, PurchaseError> {
        let purchases = self
            .get_available_purchases(&AvailablePurchasesOptions::default())
            .await?;
        let now_millis = Utc::now().timestamp_millis();
        Ok(purchases
            .iter()
            .filter(|p| match subscription_ids {
                Some(ids) => ids.iter().any(|id| id == p.product_id()),
                None => Self::is_subscription_shaped(p),
            })
            .map(|p| ActiveSubscription::from_purchase(p, now_millis))
            .collect())
    }

    async fn has_active_subscriptions(
        &self,
        subscription_ids: Option<&[String]>,
    ) -> Result<bool, PurchaseError> {
        Ok(!self.get_active_subscriptions(subscription_ids).await?.is_empty())
    }

    async fn restore_purchases(&self) -> Result<(), PurchaseError> {
        if self.platform == IapPlatform::Ios {
            // Best effort: a failed sync must not abort the restore.
            if let Err(error) = self.store_kit.sync().await {
                debug!(%error, "storekit sync failed during restore");
            }
        }
        self.get_available_purchases(&AvailablePurchasesOptions::default())
            .await?;
        Ok(())
    }

    async fn deep_link_to_subscriptions(
        &self,
        options: &DeepLinkOptions,
    ) -> Result<(), PurchaseError> {
        match self.platform {
            IapPlatform::Ios => {
                self.store_kit.show_manage_subscriptions().await?;
                Ok(())
            }
            IapPlatform::Android => self.play_billing.deep_link_to_subscriptions(options).await,
        }
    }

    async fn validate_receipt(
        &self,
        props: &ValidateReceiptProps,
    ) -> Result<ReceiptValidationResult, PurchaseError> {
        match self.platform {
            IapPlatform::Ios => {
                let result = self
                    .store_kit
                    .validate_receipt(&props.sku.clone().into())
                    .await?;
                Ok(ReceiptValidationResult::Ios(result))
            }
            IapPlatform::Android => {
                let result = self.play_billing.validate_receipt(props).await?;
                Ok(ReceiptValidationResult::Android(result))
            }
        }
    }

    async fn get_storefront(&self) -> Result<String, PurchaseError> {
        match self.platform {
            IapPlatform::Ios => self.store_kit.get_storefront().await,
            IapPlatform::Android => self.play_billing.get_storefront().await,
        }
    }
}
