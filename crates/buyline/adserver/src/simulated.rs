//! Deterministic in-process stand-in for a real ad server.
//!
//! Order ids derive from the media buy id, so repeated create calls
//! for the same buy return the same order and idempotency is visible
//! in logs and tests. Failures are injected per operation to exercise
//! the executor's failure paths.

use crate::adapter::{AdServerAdapter, OrderRequest};
use crate::{AdServerError, AdServerResult};
use async_trait::async_trait;
use buyline_types::{LineItemClass, ProductConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::info;

/// Simulated ad server backend.
#[derive(Default)]
pub struct SimulatedAdServer {
    /// Per-product overrides consulted before the line-item-type rules.
    classifications: RwLock<HashMap<String, LineItemClass>>,
    fail_create: AtomicBool,
    fail_activate: AtomicBool,
    create_calls: AtomicU64,
    activate_calls: AtomicU64,
}

impl SimulatedAdServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a product id to a class, overriding the line-item-type rules.
    pub fn set_classification(&self, product_id: impl Into<String>, class: LineItemClass) {
        if let Ok(mut guard) = self.classifications.write() {
            guard.insert(product_id.into(), class);
        }
    }

    /// Make subsequent `create_order` calls fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `activate_order` calls fail.
    pub fn set_fail_activate(&self, fail: bool) {
        self.fail_activate.store(fail, Ordering::SeqCst);
    }

    /// Number of `create_order` calls observed, including failed ones.
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `activate_order` calls observed, including failed ones.
    pub fn activate_calls(&self) -> u64 {
        self.activate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdServerAdapter for SimulatedAdServer {
    async fn create_order(&self, order: OrderRequest<'_>) -> AdServerResult<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AdServerError::OrderRejected(
                "injected creation failure".to_string(),
            ));
        }

        let order_id = format!("sim-order-{}", order.media_buy_id.as_uuid().simple());
        info!(
            media_buy_id = %order.media_buy_id,
            order_id = %order_id,
            packages = order.packages.len(),
            budget = order.budget,
            "Simulated ad server created order"
        );
        Ok(order_id)
    }

    async fn activate_order(&self, external_order_id: &str) -> AdServerResult<()> {
        self.activate_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_activate.load(Ordering::SeqCst) {
            return Err(AdServerError::ActivationFailed(
                "injected activation failure".to_string(),
            ));
        }

        if !external_order_id.starts_with("sim-order-") {
            return Err(AdServerError::OrderNotFound(external_order_id.to_string()));
        }

        info!(order_id = %external_order_id, "Simulated ad server activated order");
        Ok(())
    }

    async fn classify_line_item(
        &self,
        product: &ProductConfig,
    ) -> AdServerResult<LineItemClass> {
        let overrides = self
            .classifications
            .read()
            .map_err(|_| AdServerError::Unavailable("classification table poisoned".to_string()))?;
        if let Some(class) = overrides.get(&product.product_id) {
            return Ok(*class);
        }
        drop(overrides);

        match product.line_item_type.as_str() {
            "standard" | "sponsorship" | "guaranteed" => Ok(LineItemClass::Guaranteed),
            "price_priority" | "network" | "bulk" | "house" | "non_guaranteed" => {
                Ok(LineItemClass::NonGuaranteed)
            }
            other => Err(AdServerError::UnknownLineItemType(other.to_string())),
        }
    }

    fn order_url(&self, external_order_id: &str) -> Option<String> {
        Some(format!(
            "https://adserver.invalid/orders/{external_order_id}"
        ))
    }
}
