use async_trait::async_trait;

use crate::{
    domain::entities::{
        active_subscription::ActiveSubscription,
        product::Product,
        purchase::Purchase,
        request::{
            AvailablePurchasesOptions, DeepLinkOptions, FetchProductsProps,
            ReceiptValidationResult, RequestPurchaseProps, RequestPurchaseResult,
            ValidateReceiptProps,
        },
    },
    errors::PurchaseError,
};

/// Unified purchase surface over both store backends.
///
/// One implementation runs per process, bound to the single resolved native
/// bridge; every method dispatches on the running platform and returns
/// already-normalized entities. Malformed input fails synchronously, before
/// any native call.
#[async_trait]
pub trait IapRepository: Send + Sync {
    /// Opens the native billing connection. Safe to call more than once.
    async fn init_connection(&self) -> Result<(), PurchaseError>;

    /// Closes the native billing connection.
    async fn end_connection(&self) -> Result<(), PurchaseError>;

    /// Catalog lookup for the given SKUs. An empty SKU list is rejected
    /// before any native call; results are filtered to the requested SKUs
    /// and query type.
    async fn fetch_products(
        &self,
        props: &FetchProductsProps,
    ) -> Result<Vec<Product>, PurchaseError>;

    /// Starts the platform purchase flow. The result carries the settled
    /// transactions when the native layer returns them inline; pending flows
    /// resolve through the purchase-updated event instead.
    async fn request_purchase(
        &self,
        props: &RequestPurchaseProps,
    ) -> Result<RequestPurchaseResult, PurchaseError>;

    /// Completes a delivered purchase: finish on iOS, consume or acknowledge
    /// on Android depending on `is_consumable`. A finished transaction never
    /// transitions back.
    async fn finish_transaction(
        &self,
        purchase: &Purchase,
        is_consumable: bool,
    ) -> Result<(), PurchaseError>;

    /// Purchases the user currently owns, per the platform's notion of
    /// "available".
    async fn get_available_purchases(
        &self,
        options: &AvailablePurchasesOptions,
    ) -> Result<Vec<Purchase>, PurchaseError>;

    /// Subscription view derived from the available purchases, recomputed on
    /// every call. `subscription_ids` narrows the result; `None` includes
    /// every subscription-shaped purchase.
    async fn get_active_subscriptions(
        &self,
        subscription_ids: Option<&[String]>,
    ) -> Result<Vec<ActiveSubscription>, PurchaseError>;

    async fn has_active_subscriptions(
        &self,
        subscription_ids: Option<&[String]>,
    ) -> Result<bool, PurchaseError>;

    /// Triggers a refresh of owned purchases; results arrive through the
    /// normal query/event paths, so this resolves to `()`.
    async fn restore_purchases(&self) -> Result<(), PurchaseError>;

    /// Opens the platform's subscription-management surface.
    async fn deep_link_to_subscriptions(
        &self,
        options: &DeepLinkOptions,
    ) -> Result<(), PurchaseError>;

    async fn validate_receipt(
        &self,
        props: &ValidateReceiptProps,
    ) -> Result<ReceiptValidationResult, PurchaseError>;

    /// Storefront country code, `""` when the store reports none.
    async fn get_storefront(&self) -> Result<String, PurchaseError>;
}
