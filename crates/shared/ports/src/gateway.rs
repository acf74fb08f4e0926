use crate::error::GatewayResult;
use async_trait::async_trait;
use std::sync::Arc;
use stopline_core::OrderIntent;

/// Port for order submission
///
/// Fire-and-forget from this system's perspective: the gateway collaborator
/// owns retry and fill semantics. An error gives no guarantee either way
/// about whether the venue saw the order, so callers must not resubmit.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit an order intent to the execution venue
    async fn submit_order(&self, intent: &OrderIntent) -> GatewayResult<()>;
}

#[async_trait]
impl<G: OrderGateway + ?Sized> OrderGateway for Arc<G> {
    async fn submit_order(&self, intent: &OrderIntent) -> GatewayResult<()> {
        (**self).submit_order(intent).await
    }
}
