//! Lifecycle events for position tracking.

use clmm_yield_domain::{Address, PositionId};
use serde::{Deserialize, Serialize};

/// Type of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEventType {
    /// Position was opened.
    PositionOpened,
    /// Liquidity was increased.
    LiquidityIncreased,
    /// Liquidity was decreased.
    LiquidityDecreased,
    /// Fees were collected.
    FeesCollected,
    /// Position was closed.
    PositionClosed,
    /// Tokens were swapped through the router.
    Swapped,
    /// Surplus from a withdrawal was deployed again.
    Redeployed,
    /// A position was handed over for custody.
    PositionReceived,
    /// A custodied position was returned to its owner.
    PositionRetrieved,
}

/// A lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event ID.
    pub id: String,
    /// Event type.
    pub event_type: LifecycleEventType,
    /// Position, if the event concerns one.
    pub position: Option<PositionId>,
    /// Pool address.
    pub pool: Address,
    /// Timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Event-specific data.
    pub data: EventData,
}

impl LifecycleEvent {
    /// Creates a new lifecycle event.
    pub fn new(
        event_type: LifecycleEventType,
        position: Option<PositionId>,
        pool: Address,
        data: EventData,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            position,
            pool,
            timestamp: chrono::Utc::now(),
            data,
        }
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventData {
    /// Position opened data.
    PositionOpened(PositionOpenedData),
    /// Liquidity change data.
    LiquidityChange(LiquidityChangeData),
    /// Fees collected data.
    FeesCollected(FeesCollectedData),
    /// Position closed data.
    PositionClosed(PositionClosedData),
    /// Swap data.
    Swap(SwapData),
    /// Redeploy data.
    Redeploy(RedeployData),
    /// Custody transfer data.
    Custody(CustodyData),
}

/// Data for position opened event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOpenedData {
    /// Owner recorded for the position.
    pub owner: Address,
    /// Lower tick.
    pub tick_lower: i32,
    /// Upper tick.
    pub tick_upper: i32,
    /// Initial liquidity.
    pub liquidity: u128,
    /// Token0 amount deposited.
    pub amount0: u128,
    /// Token1 amount deposited.
    pub amount1: u128,
}

/// Data for liquidity change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityChangeData {
    /// Whether liquidity was increased (true) or decreased (false).
    pub is_increase: bool,
    /// Liquidity delta.
    pub liquidity_delta: u128,
    /// Token0 amount.
    pub amount0: u128,
    /// Token1 amount.
    pub amount1: u128,
    /// New total liquidity.
    pub new_liquidity: u128,
}

/// Data for fees collected event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesCollectedData {
    /// Token0 collected.
    pub amount0: u128,
    /// Token1 collected.
    pub amount1: u128,
    /// Where the tokens were sent.
    pub recipient: Address,
}

/// Data for position closed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionClosedData {
    /// Final liquidity removed.
    pub liquidity_removed: u128,
    /// Token0 credited.
    pub amount0: u128,
    /// Token1 credited.
    pub amount1: u128,
}

/// Data for swap event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapData {
    /// Token sold.
    pub token_in: Address,
    /// Token bought.
    pub token_out: Address,
    /// Amount sold.
    pub amount_in: u128,
    /// Amount received.
    pub amount_out: u128,
}

/// Data for redeploy event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeployData {
    /// Amount requested by the withdrawal.
    pub requested: u128,
    /// Amount realized by the sweep.
    pub realized: u128,
    /// Surplus deployed again.
    pub surplus: u128,
}

/// Data for custody events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyData {
    /// Original owner of the position.
    pub owner: Address,
    /// Liquidity at the time of the transfer.
    pub liquidity: u128,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clmm_yield_domain::token::address_from_u64;

    #[test]
    fn test_lifecycle_event_creation() {
        let event = LifecycleEvent::new(
            LifecycleEventType::PositionOpened,
            Some(PositionId(1)),
            address_from_u64(0xA001),
            EventData::PositionOpened(PositionOpenedData {
                owner: address_from_u64(7),
                tick_lower: 1020,
                tick_upper: 6960,
                liquidity: 1_000_000,
                amount0: 1_000_000,
                amount1: 0,
            }),
        );

        assert_eq!(event.event_type, LifecycleEventType::PositionOpened);
        assert_eq!(event.position, Some(PositionId(1)));
        assert_eq!(event.id.len(), 36);
    }

    #[test]
    fn test_event_serializes_to_json() {
        let event = LifecycleEvent::new(
            LifecycleEventType::Swapped,
            None,
            address_from_u64(0xA001),
            EventData::Swap(SwapData {
                token_in: address_from_u64(0x1001),
                token_out: address_from_u64(0x1000),
                amount_in: 10,
                amount_out: 9,
            }),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "Swapped");
        assert!(json["position"].is_null());
    }
}
