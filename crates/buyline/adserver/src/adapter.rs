use crate::AdServerResult;
use async_trait::async_trait;
use buyline_types::{
    FlightWindow, LineItemClass, MediaBuyId, PackageRequest, PrincipalId, ProductConfig,
};

/// One order-creation call, borrowed from the intake request.
///
/// The adapter owns translation into its wire format; callers hand over
/// domain records and get back an opaque external order id.
#[derive(Debug, Clone, Copy)]
pub struct OrderRequest<'a> {
    pub media_buy_id: &'a MediaBuyId,
    pub buyer: &'a PrincipalId,
    pub budget: f64,
    pub flight: &'a FlightWindow,
    pub packages: &'a [PackageRequest],
}

/// Capability consumed by the workflow engine for every ad server
/// interaction.
///
/// Calls are at-least-once: the engine may repeat a call after a
/// partial failure, so implementations must be idempotent per media
/// buy.
#[async_trait]
pub trait AdServerAdapter: Send + Sync {
    /// Create an order with one line item per package. Returns the ad
    /// server's order id.
    async fn create_order(&self, order: OrderRequest<'_>) -> AdServerResult<String>;

    /// Activate a previously created order.
    async fn activate_order(&self, external_order_id: &str) -> AdServerResult<()>;

    /// Classify the line item a product maps onto.
    async fn classify_line_item(&self, product: &ProductConfig)
        -> AdServerResult<LineItemClass>;

    /// Where a human can inspect the order, when the backend has a UI.
    fn order_url(&self, external_order_id: &str) -> Option<String> {
        let _ = external_order_id;
        None
    }
}
