use clmm_yield_domain::math::MAX_TICK;
use clmm_yield_domain::token::address_from_u64;
use clmm_yield_domain::{Address, DepositSide, PositionId, TickRange};
use clmm_yield_execution::prelude::*;
use clmm_yield_protocols::prelude::*;
use std::sync::Arc;

fn account() -> Address {
    address_from_u64(0x5EED)
}

struct Harness {
    amm: Arc<InMemoryAmm>,
    manager: Rebalancer,
}

impl Harness {
    async fn new(side: DepositSide, tick: i32) -> Self {
        let amm = Arc::new(
            InMemoryAmm::new(MemoryPoolConfig {
                initial_tick: tick,
                ..Default::default()
            })
            .unwrap(),
        );
        let reference = amm.reference().await.unwrap();
        let manager = Rebalancer::new(
            AmmClients::from_shared(amm.clone()),
            reference.token(side),
            account(),
            ManagerConfig::default(),
            Arc::new(LifecycleTracker::new()),
        )
        .await
        .unwrap();
        Self { amm, manager }
    }

    async fn fund(&self, amount: u128) {
        self.amm.fund(self.manager.asset(), account(), amount).await.unwrap();
    }

    async fn idle(&self) -> u128 {
        self.manager.idle_assets().await.unwrap()
    }

    async fn assert_registry_matches_ledger(&self) {
        let state = self.amm.snapshot().await;
        for position in self.manager.ledger().iter() {
            assert_eq!(state.positions[&position.id].liquidity, position.liquidity);
        }
    }
}

#[tokio::test]
async fn deploy_opens_one_single_sided_position() {
    for side in [DepositSide::Token0, DepositSide::Token1] {
        let mut h = Harness::new(side, 0).await;
        h.fund(1_000_000).await;

        let outcome = h.manager.deploy(1_000_000).await.unwrap();

        assert_eq!(h.manager.position_count(), 1);
        let position = h.manager.position_at(0).unwrap();
        assert_eq!(position.id, outcome.id);
        assert!(position.liquidity > 0);
        assert_eq!(position.amount(side), 1_000_000);
        assert_eq!(position.amount(side.opposite()), 0);
        assert_eq!(h.idle().await, 0);

        let expected = match side {
            DepositSide::Token0 => TickRange { lower: 60, upper: 6000 },
            DepositSide::Token1 => TickRange { lower: -6000, upper: -60 },
        };
        assert_eq!(position.range, expected);
    }
}

#[tokio::test]
async fn free_after_two_deposits_closes_everything_without_redeploy() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    h.fund(1_000_000).await;
    h.manager.deploy(500_000).await.unwrap();
    h.manager.deploy(500_000).await.unwrap();

    let outcome = h.manager.free(1_000_000).await.unwrap();

    assert!(outcome.realized >= 1_000_000);
    assert!(outcome.redeployed.is_none());
    assert_eq!(h.manager.position_count(), 2);
    assert!(h.manager.ledger().iter().all(|p| p.liquidity == 0));
    assert_eq!(h.idle().await, 1_000_000);
}

#[tokio::test]
async fn free_with_surplus_redeploys_once() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    h.fund(700_000).await;
    h.manager.deploy(700_000).await.unwrap();

    let outcome = h.manager.free(500_000).await.unwrap();

    assert_eq!(outcome.realized, 700_000);
    let redeployed = outcome.redeployed.unwrap();
    assert_eq!(redeployed.amount0, 200_000);
    assert_eq!(h.manager.position_count(), 2);
    assert_eq!(h.manager.ledger().open_count(), 1);
    assert_eq!(h.manager.position_at(1).unwrap().id, redeployed.id);
    assert_eq!(h.idle().await, 500_000);
    assert_eq!(h.manager.lifecycle().count(LifecycleEventType::Redeployed).await, 1);
}

#[tokio::test]
async fn deploy_then_free_conserves_asset_away_from_tick_zero() {
    let mut h = Harness::new(DepositSide::Token1, -1200).await;
    h.fund(2_500_000).await;
    h.manager.deploy(2_500_000).await.unwrap();
    assert_eq!(
        h.manager.position_at(0).unwrap().range,
        TickRange { lower: -7200, upper: -1260 }
    );

    let outcome = h.manager.free(2_500_000).await.unwrap();

    assert!(outcome.realized >= 2_500_000);
    assert_eq!(h.idle().await, 2_500_000);
}

#[tokio::test]
async fn non_asset_fees_are_swapped_in_one_call() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    h.fund(1_000_000).await;
    let opened = h.manager.deploy(1_000_000).await.unwrap();
    h.amm.accrue_fees(opened.id, 100, 50).await.unwrap();
    let pool = h.manager.pool().pool;
    h.amm.fund(h.manager.asset(), pool, 1_000_000).await.unwrap();

    let outcome = h.manager.free(1_000_000).await.unwrap();

    assert_eq!(outcome.realized, 1_000_150);
    assert_eq!(outcome.redeployed.unwrap().amount0, 150);
    assert_eq!(h.manager.lifecycle().count(LifecycleEventType::Swapped).await, 1);
    assert_eq!(h.idle().await, 1_000_000);
}

#[tokio::test]
async fn collect_all_and_swap_leaves_positions_open() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    h.fund(1_000_000).await;
    let opened = h.manager.deploy(1_000_000).await.unwrap();
    h.amm.accrue_fees(opened.id, 300, 0).await.unwrap();

    let realized = h.manager.collect_all_and_swap().await.unwrap();

    assert_eq!(realized, 300);
    assert_eq!(h.manager.ledger().open_count(), 1);
    assert_eq!(h.idle().await, 300);
    assert_eq!(h.manager.lifecycle().count(LifecycleEventType::Swapped).await, 0);
}

#[tokio::test]
async fn failure_mid_sweep_rolls_back_and_free_can_be_retried() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    h.fund(1_000_000).await;
    h.manager.deploy(400_000).await.unwrap();
    h.manager.deploy(600_000).await.unwrap();
    let before = h.manager.ledger().clone();
    h.amm.fail_nth(AmmCall::DecreaseLiquidity, 2).await;

    let err = h.manager.free(1_000_000).await.unwrap_err();

    assert!(matches!(
        err,
        ManagerError::ExternalCallFailed {
            call: "decreaseLiquidity",
            ..
        }
    ));
    assert_eq!(h.manager.ledger(), &before);
    assert_eq!(h.manager.ledger().open_count(), 2);
    h.assert_registry_matches_ledger().await;
    assert_eq!(h.idle().await, 0);

    let retried = h.manager.free(1_000_000).await.unwrap();

    assert_eq!(retried.realized, 1_000_000);
    assert!(retried.redeployed.is_none());
    assert_eq!(h.manager.ledger().open_count(), 0);
    h.assert_registry_matches_ledger().await;
    assert_eq!(h.idle().await, 1_000_000);
}

#[tokio::test]
async fn failed_surplus_redeploy_rolls_back_the_sweep() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    h.fund(700_000).await;
    h.manager.deploy(700_000).await.unwrap();
    let before = h.manager.ledger().clone();
    let minted = h.amm.position_count().await;
    h.amm.fail_next(AmmCall::Mint).await;

    let err = h.manager.free(500_000).await.unwrap_err();

    assert!(matches!(err, ManagerError::ExternalCallFailed { call: "mint", .. }));
    assert_eq!(h.manager.ledger(), &before);
    h.assert_registry_matches_ledger().await;
    assert_eq!(h.amm.position_count().await, minted);
    assert_eq!(h.idle().await, 0);

    let retried = h.manager.free(500_000).await.unwrap();

    assert_eq!(retried.realized, 700_000);
    assert_eq!(retried.redeployed.unwrap().amount0, 200_000);
    h.assert_registry_matches_ledger().await;
    assert_eq!(h.idle().await, 500_000);
}

#[tokio::test]
async fn failed_swap_fails_the_whole_free() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    h.fund(1_000_000).await;
    let opened = h.manager.deploy(1_000_000).await.unwrap();
    h.amm.accrue_fees(opened.id, 0, 50).await.unwrap();
    h.amm.fail_next(AmmCall::Swap).await;
    let before = h.manager.ledger().clone();

    let err = h.manager.free(1_000_000).await.unwrap_err();

    assert!(matches!(
        err,
        ManagerError::ExternalCallFailed {
            call: "exactInputSingle",
            ..
        }
    ));
    assert_eq!(h.manager.ledger(), &before);
    h.assert_registry_matches_ledger().await;
    assert_eq!(h.amm.positions(opened.id).await.unwrap().tokens_owed1, 50);
}

#[tokio::test]
async fn zero_amounts_rejected() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;

    assert_eq!(h.manager.deploy(0).await, Err(ManagerError::InvalidAmount));
    assert_eq!(h.manager.free(0).await, Err(ManagerError::InvalidAmount));
    assert_eq!(h.manager.position_count(), 0);
}

#[tokio::test]
async fn deploy_at_domain_edge_is_degenerate() {
    let mut h = Harness::new(DepositSide::Token0, MAX_TICK - 10).await;
    h.fund(1_000).await;

    let err = h.manager.deploy(1_000).await.unwrap_err();

    assert!(matches!(err, ManagerError::DegenerateRange { .. }));
    assert_eq!(h.manager.position_count(), 0);
    assert_eq!(h.amm.position_count().await, 0);
}

#[tokio::test]
async fn foreign_asset_rejected_at_construction() {
    let amm = Arc::new(InMemoryAmm::new(MemoryPoolConfig::default()).unwrap());
    let foreign = address_from_u64(0xF00);

    let result = Rebalancer::new(
        AmmClients::from_shared(amm),
        foreign,
        account(),
        ManagerConfig::default(),
        Arc::new(LifecycleTracker::new()),
    )
    .await;

    assert!(matches!(result, Err(ManagerError::AssetNotInPool(a)) if a == foreign));
}

#[tokio::test]
async fn allowances_are_zero_after_every_invocation() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    let reference = h.amm.reference().await.unwrap();
    h.fund(1_000_000).await;
    let opened = h.manager.deploy(1_000_000).await.unwrap();
    h.amm.accrue_fees(opened.id, 0, 75).await.unwrap();
    h.amm.fund(reference.token0, reference.pool, 1_000).await.unwrap();

    h.manager.free(500_000).await.unwrap();

    for token in [reference.token0, reference.token1] {
        for spender in [reference.registry, reference.router] {
            assert_eq!(h.amm.allowance(token, account(), spender).await.unwrap(), 0);
        }
    }
}

#[tokio::test]
async fn custodied_positions_are_not_swept() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    let reference = h.amm.reference().await.unwrap();
    let alice = address_from_u64(0xA11CE);

    h.amm.fund(reference.token0, alice, 5_000).await.unwrap();
    h.amm.approve(reference.token0, alice, reference.registry, 5_000).await.unwrap();
    let minted = h
        .amm
        .mint(MintParams {
            token0: reference.token0,
            token1: reference.token1,
            fee: reference.fee,
            tick_lower: 60,
            tick_upper: 600,
            amount0_desired: 5_000,
            amount1_desired: 0,
            amount0_min: 0,
            amount1_min: 0,
            payer: alice,
            recipient: alice,
            deadline: i64::MAX,
        })
        .await
        .unwrap();
    h.amm.transfer_position(minted.id, alice, account()).await.unwrap();
    h.manager.receive_position(alice, minted.id).await.unwrap();

    h.fund(1_000_000).await;
    h.manager.deploy(1_000_000).await.unwrap();
    h.manager.free(1_000_000).await.unwrap();

    assert_eq!(h.manager.position_count(), 1);
    assert_eq!(h.amm.positions(minted.id).await.unwrap().liquidity, minted.liquidity);
    assert_eq!(h.manager.custody().get(minted.id).unwrap().liquidity, minted.liquidity);

    let stranger = address_from_u64(0xBAD);
    assert_eq!(
        h.manager.close_position(stranger, minted.id).await,
        Err(ManagerError::NotPositionOwner {
            id: minted.id,
            caller: stranger
        })
    );
    let closed = h.manager.close_position(alice, minted.id).await.unwrap();
    assert_eq!(closed.amount0, 5_000);
}

#[tokio::test]
async fn estimated_total_assets_counts_idle_and_deployed() {
    let mut h = Harness::new(DepositSide::Token0, 0).await;
    h.fund(1_500_000).await;
    h.manager.deploy(1_000_000).await.unwrap();

    assert_eq!(h.manager.estimated_total_assets().await.unwrap(), 1_500_000);
}

#[tokio::test]
async fn strategy_entry_points_respect_roles() {
    let h = Harness::new(DepositSide::Token0, 0).await;
    let (vault, keeper) = (address_from_u64(0x1), address_from_u64(0x2));
    h.fund(1_000_000).await;
    let amm = h.amm.clone();
    let access = AllowList::new()
        .with(Role::Vault, vault)
        .with(Role::Keeper, keeper);
    let mut strategy = Strategy::new(h.manager, access);

    assert_eq!(
        strategy.deploy_funds(keeper, 1_000_000).await,
        Err(ManagerError::Unauthorized {
            caller: keeper,
            role: Role::Vault
        })
    );

    strategy.deploy_funds(vault, 600_000).await.unwrap();
    assert!(strategy.tend_trigger().await.unwrap());
    let tended = strategy.tend(keeper).await.unwrap().unwrap();
    assert_eq!(tended.amount0, 400_000);
    assert_eq!(strategy.tend(keeper).await.unwrap(), None);

    let id: PositionId = tended.id;
    amm.accrue_fees(id, 1_000, 0).await.unwrap();
    let total = strategy.harvest_and_report(keeper).await.unwrap();
    assert_eq!(total, 1_001_000);

    // Harvested fees are already idle, so the sweep realizes principal only.
    let freed = strategy.free_funds(vault, 1_001_000).await.unwrap();
    assert_eq!(freed.realized, 1_000_000);
    assert!(freed.redeployed.is_none());
    assert_eq!(strategy.manager().idle_assets().await.unwrap(), 1_001_000);
    assert!(strategy.harvest_and_report(vault).await.is_err());
}
