//! Lifecycle tracker for position history.

use super::{
    CustodyData, EventData, FeesCollectedData, LifecycleEvent, LifecycleEventType,
    LiquidityChangeData, PositionClosedData, PositionOpenedData, RedeployData, SwapData,
};
use clmm_yield_domain::{Address, PositionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Summary of a position's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSummary {
    /// Position handle.
    pub position: PositionId,
    /// Pool address.
    pub pool: Address,
    /// Owner recorded at open.
    pub owner: Address,
    /// When position was opened.
    pub opened_at: chrono::DateTime<chrono::Utc>,
    /// When position was closed (if closed).
    pub closed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Liquidity minted at open.
    pub initial_liquidity: u128,
    /// Liquidity as of the last recorded event.
    pub liquidity: u128,
    /// Token0 deposited over the lifetime.
    pub deposited0: u128,
    /// Token1 deposited over the lifetime.
    pub deposited1: u128,
    /// Token0 collected over the lifetime.
    pub collected0: u128,
    /// Token1 collected over the lifetime.
    pub collected1: u128,
    /// Whether position is still open.
    pub is_open: bool,
}

/// Records notifications emitted by the manager.
///
/// Notifications are observational. Nothing in the manager reads them back.
pub struct LifecycleTracker {
    /// Journal of every event in emission order.
    events: Arc<RwLock<Vec<LifecycleEvent>>>,
    /// Position summaries.
    summaries: Arc<RwLock<HashMap<PositionId, PositionSummary>>>,
}

impl LifecycleTracker {
    /// Creates a new lifecycle tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            summaries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Records a position opened event.
    pub async fn record_position_opened(&self, position: PositionId, pool: Address, data: PositionOpenedData) {
        let event = LifecycleEvent::new(
            LifecycleEventType::PositionOpened,
            Some(position),
            pool,
            EventData::PositionOpened(data.clone()),
        );
        let opened_at = event.timestamp;
        self.add_event(event).await;

        let summary = PositionSummary {
            position,
            pool,
            owner: data.owner,
            opened_at,
            closed_at: None,
            initial_liquidity: data.liquidity,
            liquidity: data.liquidity,
            deposited0: data.amount0,
            deposited1: data.amount1,
            collected0: 0,
            collected1: 0,
            is_open: true,
        };
        self.summaries.write().await.insert(position, summary);

        info!(
            position = %position,
            tick_lower = data.tick_lower,
            tick_upper = data.tick_upper,
            liquidity = data.liquidity,
            amount0 = data.amount0,
            amount1 = data.amount1,
            "Position opened"
        );
    }

    /// Records a liquidity change event.
    pub async fn record_liquidity_change(&self, position: PositionId, pool: Address, data: LiquidityChangeData) {
        let event_type = if data.is_increase {
            LifecycleEventType::LiquidityIncreased
        } else {
            LifecycleEventType::LiquidityDecreased
        };

        let event = LifecycleEvent::new(
            event_type,
            Some(position),
            pool,
            EventData::LiquidityChange(data.clone()),
        );
        self.add_event(event).await;

        if let Some(summary) = self.summaries.write().await.get_mut(&position) {
            summary.liquidity = data.new_liquidity;
            if data.is_increase {
                summary.deposited0 = summary.deposited0.saturating_add(data.amount0);
                summary.deposited1 = summary.deposited1.saturating_add(data.amount1);
            }
        }

        debug!(
            position = %position,
            is_increase = data.is_increase,
            delta = data.liquidity_delta,
            new_liquidity = data.new_liquidity,
            "Liquidity changed"
        );
    }

    /// Records a fees collected event.
    pub async fn record_fees_collected(&self, position: PositionId, pool: Address, data: FeesCollectedData) {
        let event = LifecycleEvent::new(
            LifecycleEventType::FeesCollected,
            Some(position),
            pool,
            EventData::FeesCollected(data.clone()),
        );
        self.add_event(event).await;

        if let Some(summary) = self.summaries.write().await.get_mut(&position) {
            summary.collected0 = summary.collected0.saturating_add(data.amount0);
            summary.collected1 = summary.collected1.saturating_add(data.amount1);
        }

        info!(
            position = %position,
            amount0 = data.amount0,
            amount1 = data.amount1,
            recipient = %data.recipient,
            "Fees collected"
        );
    }

    /// Records a position closed event.
    pub async fn record_position_closed(&self, position: PositionId, pool: Address, data: PositionClosedData) {
        let event = LifecycleEvent::new(
            LifecycleEventType::PositionClosed,
            Some(position),
            pool,
            EventData::PositionClosed(data.clone()),
        );
        let closed_at = event.timestamp;
        self.add_event(event).await;

        if let Some(summary) = self.summaries.write().await.get_mut(&position) {
            summary.closed_at = Some(closed_at);
            summary.liquidity = 0;
            summary.is_open = false;
        }

        info!(
            position = %position,
            liquidity_removed = data.liquidity_removed,
            amount0 = data.amount0,
            amount1 = data.amount1,
            "Position closed"
        );
    }

    /// Records a router swap.
    pub async fn record_swap(&self, pool: Address, data: SwapData) {
        info!(
            token_in = %data.token_in,
            token_out = %data.token_out,
            amount_in = data.amount_in,
            amount_out = data.amount_out,
            "Swapped"
        );
        self.add_event(LifecycleEvent::new(
            LifecycleEventType::Swapped,
            None,
            pool,
            EventData::Swap(data),
        ))
        .await;
    }

    /// Records a surplus redeploy after a withdrawal.
    pub async fn record_redeploy(&self, position: PositionId, pool: Address, data: RedeployData) {
        info!(
            position = %position,
            requested = data.requested,
            realized = data.realized,
            surplus = data.surplus,
            "Surplus redeployed"
        );
        self.add_event(LifecycleEvent::new(
            LifecycleEventType::Redeployed,
            Some(position),
            pool,
            EventData::Redeploy(data),
        ))
        .await;
    }

    /// Records a position entering or leaving custody.
    pub async fn record_custody(
        &self,
        event_type: LifecycleEventType,
        position: PositionId,
        pool: Address,
        data: CustodyData,
    ) {
        info!(
            position = %position,
            owner = %data.owner,
            liquidity = data.liquidity,
            event = ?event_type,
            "Custody changed"
        );
        self.add_event(LifecycleEvent::new(
            event_type,
            Some(position),
            pool,
            EventData::Custody(data),
        ))
        .await;
    }

    async fn add_event(&self, event: LifecycleEvent) {
        self.events.write().await.push(event);
    }

    /// Gets all events for a position.
    pub async fn get_events(&self, position: &PositionId) -> Vec<LifecycleEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.position.as_ref() == Some(position))
            .cloned()
            .collect()
    }

    /// Gets every event in emission order.
    pub async fn all_events(&self) -> Vec<LifecycleEvent> {
        self.events.read().await.clone()
    }

    /// Number of events of one type.
    pub async fn count(&self, event_type: LifecycleEventType) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Gets the summary for a position.
    pub async fn get_summary(&self, position: &PositionId) -> Option<PositionSummary> {
        self.summaries.read().await.get(position).cloned()
    }

    /// Gets all position summaries, ordered by position.
    pub async fn get_all_summaries(&self) -> Vec<PositionSummary> {
        let mut summaries: Vec<_> = self.summaries.read().await.values().cloned().collect();
        summaries.sort_by_key(|s| s.position);
        summaries
    }

    /// Gets aggregate statistics.
    pub async fn get_aggregate_stats(&self) -> AggregateStats {
        let mut stats = AggregateStats::default();

        for summary in self.summaries.read().await.values() {
            stats.total_positions += 1;
            if summary.is_open {
                stats.open_positions += 1;
            } else {
                stats.closed_positions += 1;
            }
            stats.total_collected0 = stats.total_collected0.saturating_add(summary.collected0);
            stats.total_collected1 = stats.total_collected1.saturating_add(summary.collected1);
        }

        for event in self.events.read().await.iter() {
            match event.event_type {
                LifecycleEventType::Swapped => stats.total_swaps += 1,
                LifecycleEventType::Redeployed => stats.total_redeploys += 1,
                _ => {}
            }
        }

        stats
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate statistics across all positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Total positions tracked.
    pub total_positions: u32,
    /// Currently open positions.
    pub open_positions: u32,
    /// Closed positions.
    pub closed_positions: u32,
    /// Token0 collected across all positions.
    pub total_collected0: u128,
    /// Token1 collected across all positions.
    pub total_collected1: u128,
    /// Router swaps performed.
    pub total_swaps: u32,
    /// Surplus redeploys performed.
    pub total_redeploys: u32,
}
