//! Unified in-app purchase client over StoreKit and Play Billing.
//!
//! One [`util::IapClient`] per process wraps the single resolved native
//! bridge, normalizes every payload that crosses the boundary and maps every
//! native failure onto the canonical [`errors::ErrorCode`] set. Purchase
//! lifecycle events are distributed by [`events::EventEmitter`], fed by the
//! bridge's event sink.

pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod bridge_resolver;
        pub(crate) mod native_bridge;
        pub(crate) mod play_billing_datasource;
        pub(crate) mod store_kit_datasource;
        mod utils;
    }
    pub(crate) mod models {
        pub(crate) mod normalize;
        pub(crate) mod play_billing {
            pub(crate) mod product_model;
            pub(crate) mod purchase_model;
        }
        pub(crate) mod store_kit {
            pub(crate) mod product_model;
            pub(crate) mod purchase_model;
            pub(crate) mod subscription_status_model;
        }
    }
    pub(crate) mod repositories {
        pub(crate) mod iap_repository_impl;
    }
}

pub mod domain {
    pub mod entities {
        pub mod active_subscription;
        pub mod alternative_billing;
        pub mod app_transaction;
        pub mod platform;
        pub mod product;
        pub mod purchase;
        pub mod request;
    }
    pub mod repositories {
        pub mod iap_repository;
    }
}

pub mod errors;
pub mod events;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use data::datasources::{
    bridge_resolver::{resolve_native_bridge, BridgeCandidate, BridgeLoadError, BridgeRegistry},
    native_bridge::{BridgeError, EventSink, NativeBridge, NativeEvent, NativeEventKind},
    play_billing_datasource::PlayBillingDatasource,
    store_kit_datasource::StoreKitDatasource,
};
