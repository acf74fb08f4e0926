//! Order intent types
//!
//! An [`OrderIntent`] is what the signal dispatcher hands to the order
//! gateway: instrument, side, fixed lot quantity, and the trigger price.
//! Retry and fill semantics belong to the gateway collaborator.

use crate::values::{Price, Quantity, Symbol, Timestamp};
use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Order submission intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Client-assigned order ID for correlation
    pub client_order_id: String,
    /// Instrument to trade
    pub instrument_id: Symbol,
    /// Buy or sell
    pub side: OrderSide,
    /// Quantity to trade (fixed lot)
    pub quantity: Quantity,
    /// Trigger price (the bar close that produced the signal)
    pub price: Price,
    /// When the signal fired
    pub time: Timestamp,
}

impl OrderIntent {
    /// Create a new order intent
    pub fn new(
        client_order_id: impl Into<String>,
        instrument_id: impl Into<Symbol>,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        time: Timestamp,
    ) -> Self {
        Self {
            client_order_id: client_order_id.into(),
            instrument_id: instrument_id.into(),
            side,
            quantity,
            price,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_labels() {
        assert_eq!(OrderSide::Buy.as_str(), "buy");
        assert_eq!(OrderSide::Sell.as_str(), "sell");
    }

    #[test]
    fn test_intent_creation() {
        let intent = OrderIntent::new(
            "sl-1",
            "A2203.XDCE",
            OrderSide::Buy,
            dec!(10),
            dec!(5123),
            Utc::now(),
        );
        assert_eq!(intent.instrument_id, "A2203.XDCE");
        assert_eq!(intent.side, OrderSide::Buy);
        assert_eq!(intent.quantity, dec!(10));
    }
}
