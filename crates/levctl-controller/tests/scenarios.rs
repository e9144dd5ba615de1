//! End-to-end controller scenarios against the paper collaborators.

use std::sync::Arc;

use levctl_controller::{
    BasisController, ControllerError, LeverageController, PaperAccount, PaperLedger, PaperVenue,
    Precondition, VenueAdapter,
};
use levctl_core::{
    ActionCode, BaseUnits, Caller, ExchangeSettings, ExecutionSettings, IncentiveSettings,
    LeverageRatio, MethodologySettings, PrincipalId, StrategySettings, VenueRoute,
};
use levctl_engine::RebalancePhase;
use levctl_policy::BoundsViolation;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const HOUR: u64 = 3_600_000;
const DAY: u64 = 24 * HOUR;

fn lev(value: Decimal) -> LeverageRatio {
    LeverageRatio::new(value)
}

fn route(name: &str, max: Decimal, incentivized_max: Decimal) -> VenueRoute {
    VenueRoute {
        name: name.to_string(),
        twap_max_trade_size: max,
        incentivized_twap_max_trade_size: incentivized_max,
    }
}

/// target -1.0, band [-0.9, -1.1], speed 0.05, ripcord beyond -1.3.
fn short_settings(legs: Vec<VenueRoute>) -> StrategySettings {
    StrategySettings {
        methodology: MethodologySettings {
            target_leverage_ratio: lev(dec!(-1)),
            min_leverage_ratio: lev(dec!(-0.9)),
            max_leverage_ratio: lev(dec!(-1.1)),
            recentering_speed: dec!(0.05),
            rebalance_interval_ms: DAY,
            reinvest_interval_ms: 7 * DAY,
            performance_fee_percentage: dec!(0.1),
        },
        execution: ExecutionSettings {
            twap_cooldown_period_ms: HOUR,
            slippage_tolerance: dec!(0.01),
        },
        incentive: IncentiveSettings {
            incentivized_twap_cooldown_period_ms: 60_000,
            incentivized_slippage_tolerance: dec!(0.05),
            reward_amount: dec!(1),
            incentivized_leverage_ratio: lev(dec!(-1.3)),
        },
        exchange: ExchangeSettings {
            base_asset: "ETH".to_string(),
            quote_asset: "USDC".to_string(),
            legs,
        },
    }
}

fn owner() -> Caller {
    Caller::direct("owner")
}

fn keeper() -> Caller {
    Caller::direct("keeper")
}

fn leverage_controller(ledger: &PaperLedger, max_trade_size: Decimal) -> LeverageController {
    let perp: Arc<dyn VenueAdapter> = Arc::new(PaperVenue::perp(ledger.clone()));
    let mut controller = LeverageController::new(
        PrincipalId::new("owner"),
        short_settings(vec![route("perp", max_trade_size, dec!(2))]),
        Arc::new(ledger.clone()),
        vec![perp],
    )
    .unwrap();
    controller
        .update_authorized_callers(&owner(), &[PrincipalId::new("keeper")], &[true])
        .unwrap();
    controller
}

fn basis_controller(ledger: &PaperLedger, max_trade_size: Decimal) -> BasisController {
    let perp: Arc<dyn VenueAdapter> = Arc::new(PaperVenue::perp(ledger.clone()));
    let spot: Arc<dyn VenueAdapter> = Arc::new(PaperVenue::spot(ledger.clone()));
    let mut controller = BasisController::new(
        PrincipalId::new("owner"),
        short_settings(vec![
            route("perp", max_trade_size, dec!(20)),
            route("spot", max_trade_size, dec!(20)),
        ]),
        Arc::new(ledger.clone()),
        vec![perp, spot],
    )
    .unwrap();
    controller
        .update_authorized_callers(&owner(), &[PrincipalId::new("keeper")], &[true])
        .unwrap();
    controller
}

fn positioned(account_value: Decimal, base: Decimal, price: Decimal) -> PaperLedger {
    PaperLedger::new(PaperAccount::with_position(
        account_value,
        BaseUnits::new(base),
        price,
        dec!(1),
    ))
}

/// Perp position hedged by an equal spot balance.
fn hedged(account_value: Decimal, base: Decimal, price: Decimal) -> PaperLedger {
    PaperLedger::new(PaperAccount {
        spot_balance: BaseUnits::new(-base),
        ..PaperAccount::with_position(account_value, BaseUnits::new(base), price, dec!(1))
    })
}

fn assert_spot_mirrors_perp(ledger: &PaperLedger) {
    let account = ledger.account();
    assert_eq!(account.spot_balance.inner(), -account.base_balance.inner());
}

// =============================================================================
// Scenario A: first engagement takes the target's sign
// =============================================================================

#[test]
fn scenario_a_engage_reaches_target_exactly() {
    let ledger = PaperLedger::new(PaperAccount::funded(dec!(1000), dec!(2000), dec!(1)));
    let mut controller = leverage_controller(&ledger, dec!(1));

    assert_eq!(controller.get_current_leverage_ratio().unwrap(), LeverageRatio::ZERO);
    assert_eq!(controller.phase().unwrap(), RebalancePhase::Idle);
    assert_eq!(controller.should_rebalance(DAY).unwrap(), ActionCode::None);

    let outcome = controller.engage(&owner(), DAY).unwrap();
    assert_eq!(outcome.chunk.notional, BaseUnits::new(dec!(-0.5)));
    assert_eq!(outcome.new_leverage, lev(dec!(-1)));
    assert!(!outcome.twap_pending());
    assert_eq!(controller.phase().unwrap(), RebalancePhase::EngagedStable);
}

#[test]
fn scenario_a_basis_engage_reaches_target_exactly() {
    let ledger = PaperLedger::new(PaperAccount::funded(dec!(1000), dec!(100), dec!(1)));
    let mut controller = basis_controller(&ledger, dec!(10));

    let outcome = controller.engage(&owner(), DAY).unwrap();
    assert_eq!(outcome.new_leverage, lev(dec!(-1)));

    let account = ledger.account();
    assert_eq!(account.base_balance, BaseUnits::new(dec!(-5)));
    assert_eq!(account.spot_balance, BaseUnits::new(dec!(5)));
    assert_eq!(account.account_value(), dec!(500));
}

// =============================================================================
// Scenario B: recentering on magnitudes, resigned negative
// =============================================================================

#[test]
fn scenario_b_rebalance_recenters_toward_target() {
    // -950 / 1000 = -0.95, inside the band
    let ledger = positioned(dec!(1000), dec!(-0.95), dec!(1000));
    let mut controller = leverage_controller(&ledger, dec!(1));

    let outcome = controller.rebalance(&keeper(), DAY).unwrap();
    assert_eq!(outcome.prev_leverage, lev(dec!(-0.95)));
    assert_eq!(outcome.new_leverage, lev(dec!(-0.9525)));
    assert_eq!(outcome.chunk.notional, BaseUnits::new(dec!(-0.0025)));
    assert!(!outcome.twap_pending());
}

// =============================================================================
// Scenario C: chunked rebalance starts a TWAP
// =============================================================================

#[test]
fn scenario_c_partial_chunk_sets_twap_target() {
    // -1200 / 1500 = -0.8, next clamps to -0.9, total = -12 * -0.1 / -0.8 = -1.5
    let ledger = positioned(dec!(1500), dec!(-12), dec!(100));
    let mut controller = leverage_controller(&ledger, dec!(1));
    assert_eq!(controller.should_rebalance(DAY).unwrap(), ActionCode::Rebalance);

    let outcome = controller.rebalance(&keeper(), DAY).unwrap();
    assert_eq!(outcome.chunk.total, BaseUnits::new(dec!(-1.5)));
    assert_eq!(outcome.chunk.notional, BaseUnits::new(dec!(-1)));
    assert_eq!(controller.twap_leverage_ratio(), lev(dec!(-0.9)));
    assert_eq!(controller.phase().unwrap(), RebalancePhase::EngagedTwap);

    // A regular rebalance is not allowed mid-TWAP
    assert_eq!(
        controller.rebalance(&keeper(), 3 * DAY).unwrap_err(),
        ControllerError::PreconditionFailed(Precondition::TwapInProgress)
    );

    assert_eq!(controller.should_rebalance(DAY + HOUR - 1).unwrap(), ActionCode::None);
    assert_eq!(controller.should_rebalance(DAY + HOUR).unwrap(), ActionCode::IterateTwap);
    assert!(matches!(
        controller.iterate_rebalance(&keeper(), DAY + HOUR - 1),
        Err(ControllerError::CooldownNotElapsed { .. })
    ));

    let outcome = controller.iterate_rebalance(&keeper(), DAY + HOUR).unwrap();
    assert!(outcome.chunk.is_complete());
    assert!(!outcome.twap_pending());
    assert_eq!(outcome.new_leverage.inner().round_dp(6), dec!(-0.9));
    assert_eq!(controller.phase().unwrap(), RebalancePhase::EngagedStable);
}

#[test]
fn twap_ends_without_trade_on_advantageous_move() {
    let ledger = positioned(dec!(1500), dec!(-12), dec!(100));
    let mut controller = leverage_controller(&ledger, dec!(1));
    controller.rebalance(&keeper(), DAY).unwrap();

    // -13 * 103 / (2800 - 1339) = -0.9165, already past the -0.9 TWAP target
    ledger.set_price(dec!(103));
    let outcome = controller.iterate_rebalance(&keeper(), DAY + HOUR).unwrap();

    assert!(outcome.chunk.notional.is_zero());
    assert!(!outcome.twap_pending());
    assert_eq!(ledger.account().base_balance, BaseUnits::new(dec!(-13)));
    assert_eq!(controller.state().last_trade_timestamp_ms, DAY + HOUR);
}

#[test]
fn twap_iteration_recomputes_toward_stored_target() {
    let ledger = positioned(dec!(1500), dec!(-12), dec!(100));
    let mut controller = leverage_controller(&ledger, dec!(1));
    controller.rebalance(&keeper(), DAY).unwrap();

    // Price fell after the first chunk. The remaining gap was -0.5 at the
    // original price; the iteration recomputes toward -0.9 from the new
    // leverage, so the gap widens and the TWAP keeps going. Long TWAPs drift
    // from the original total this way.
    ledger.set_price(dec!(95));
    let outcome = controller.iterate_rebalance(&keeper(), DAY + HOUR).unwrap();

    assert!(outcome.chunk.total.abs() > dec!(1));
    assert_eq!(outcome.chunk.notional, BaseUnits::new(dec!(-1)));
    assert_eq!(controller.twap_leverage_ratio(), lev(dec!(-0.9)));
}

#[test]
fn partial_engage_completes_through_iteration() {
    let ledger = PaperLedger::new(PaperAccount::funded(dec!(1000), dec!(2000), dec!(1)));
    let mut controller = leverage_controller(&ledger, dec!(0.2));

    let outcome = controller.engage(&owner(), DAY).unwrap();
    assert_eq!(outcome.twap_leverage_ratio, lev(dec!(-1)));

    let mut now = DAY;
    for _ in 0..10 {
        if !controller.twap_leverage_ratio().is_zero() {
            now += HOUR;
            controller.iterate_rebalance(&keeper(), now).unwrap();
        }
    }
    assert!(controller.twap_leverage_ratio().is_zero());
    assert_eq!(ledger.account().base_balance, BaseUnits::new(dec!(-0.5)));
    assert_eq!(controller.get_current_leverage_ratio().unwrap(), lev(dec!(-1)));
}

// =============================================================================
// Scenario D: back-to-back ripcords
// =============================================================================

#[test]
fn scenario_d_second_ripcord_within_cooldown_fails() {
    // -1400 / 1000 = -1.4, beyond -1.3
    let ledger = positioned(dec!(1000), dec!(-14), dec!(100));
    let mut controller = leverage_controller(&ledger, dec!(1));
    controller.fund_incentive(dec!(5)).unwrap();
    assert_eq!(controller.should_rebalance(DAY).unwrap(), ActionCode::Ripcord);

    let anyone = Caller::direct("anyone");
    let outcome = controller.ripcord(&anyone, DAY).unwrap();
    // Gap to -1.1 is +3, capped at the incentivized size 2
    assert_eq!(outcome.chunk.notional, BaseUnits::new(dec!(2)));
    assert_eq!(outcome.new_leverage, lev(dec!(-1.2)));
    assert_eq!(outcome.reward_paid, dec!(1));
    assert!(controller.twap_leverage_ratio().is_zero());

    assert_eq!(
        controller.ripcord(&anyone, DAY).unwrap_err(),
        ControllerError::CooldownNotElapsed {
            required_ms: 60_000,
            elapsed_ms: 0
        }
    );
    assert!(matches!(
        controller.ripcord(&anyone, DAY + 59_999),
        Err(ControllerError::CooldownNotElapsed { .. })
    ));
    // After the cooldown the breach is gone
    assert_eq!(
        controller.ripcord(&anyone, DAY + 60_000).unwrap_err(),
        ControllerError::PreconditionFailed(Precondition::BelowIncentivizedLeverage)
    );
    assert_eq!(controller.incentive_balance(), dec!(4));
}

#[test]
fn ripcord_rejects_relayed_caller() {
    let ledger = positioned(dec!(1000), dec!(-14), dec!(100));
    let mut controller = leverage_controller(&ledger, dec!(1));

    let err = controller.ripcord(&Caller::relayed("bundler"), DAY).unwrap_err();
    assert_eq!(err.kind(), "authorization");
    assert_eq!(ledger.account().base_balance, BaseUnits::new(dec!(-14)));
}

#[test]
fn ripcord_clears_in_progress_twap() {
    let ledger = positioned(dec!(1500), dec!(-12), dec!(100));
    let mut controller = leverage_controller(&ledger, dec!(1));
    controller.rebalance(&keeper(), DAY).unwrap();
    assert!(!controller.twap_leverage_ratio().is_zero());

    // -13 * 160 / (2800 - 2080) = -2.89
    ledger.set_price(dec!(160));
    assert_eq!(controller.should_rebalance(DAY + HOUR).unwrap(), ActionCode::Ripcord);
    assert_eq!(
        controller.iterate_rebalance(&keeper(), DAY + HOUR).unwrap_err(),
        ControllerError::PreconditionFailed(Precondition::AboveIncentivizedLeverage)
    );

    let outcome = controller.ripcord(&keeper(), DAY + HOUR).unwrap();
    assert!(!outcome.chunk.is_complete());
    assert!(controller.twap_leverage_ratio().is_zero());
}

// =============================================================================
// Scenario E: partial reward near depletion
// =============================================================================

#[test]
fn scenario_e_ripcord_pays_what_is_left() {
    let ledger = positioned(dec!(1000), dec!(-14), dec!(100));
    let mut controller = leverage_controller(&ledger, dec!(1));
    controller.fund_incentive(dec!(0.01)).unwrap();
    assert_eq!(controller.get_current_incentive_reward(), dec!(0.01));

    let outcome = controller.ripcord(&Caller::direct("anyone"), DAY).unwrap();
    assert_eq!(outcome.reward_paid, dec!(0.01));
    assert_eq!(controller.incentive_balance(), Decimal::ZERO);
    assert_eq!(controller.get_current_incentive_reward(), Decimal::ZERO);
}

// =============================================================================
// Disengage
// =============================================================================

#[test]
fn disengage_unwinds_in_chunks() {
    let ledger = positioned(dec!(1000), dec!(-2.5), dec!(100));
    let mut controller = leverage_controller(&ledger, dec!(1));

    assert_eq!(
        controller.disengage(&keeper(), DAY).unwrap_err().kind(),
        "authorization"
    );

    let first = controller.disengage(&owner(), DAY).unwrap();
    assert_eq!(first.chunk.notional, BaseUnits::new(dec!(1)));
    assert!(!first.twap_pending());
    controller.disengage(&owner(), DAY + 1).unwrap();
    let last = controller.disengage(&owner(), DAY + 2).unwrap();
    assert_eq!(last.chunk.notional, BaseUnits::new(dec!(0.5)));
    assert!(last.new_leverage.is_zero());
    assert_eq!(ledger.account().account_value(), dec!(1000));

    assert_eq!(
        controller.disengage(&owner(), DAY + 3).unwrap_err(),
        ControllerError::PreconditionFailed(Precondition::NotEngaged)
    );
}

#[test]
fn basis_disengage_sells_spot_leg() {
    let ledger = PaperLedger::new(PaperAccount::funded(dec!(1000), dec!(100), dec!(1)));
    let mut controller = basis_controller(&ledger, dec!(10));
    controller.engage(&owner(), DAY).unwrap();

    let outcome = controller.disengage(&owner(), DAY + 1).unwrap();
    assert!(outcome.new_leverage.is_zero());
    let account = ledger.account();
    assert!(account.base_balance.is_zero());
    assert!(account.spot_balance.is_zero());
    assert_eq!(account.cash, dec!(1000));
}

// =============================================================================
// Reinvest (dual venue)
// =============================================================================

#[test]
fn basis_reinvest_preserves_leverage() {
    let ledger = PaperLedger::new(PaperAccount::funded(dec!(1000), dec!(100), dec!(1)));
    let mut controller = basis_controller(&ledger, dec!(10));
    controller.engage(&owner(), DAY).unwrap();

    // Nothing settled yet
    assert_eq!(controller.should_rebalance(8 * DAY).unwrap(), ActionCode::None);
    assert_eq!(
        controller.reinvest(&keeper(), 8 * DAY).unwrap_err(),
        ControllerError::PreconditionFailed(Precondition::NothingToReinvest)
    );

    ledger.accrue_funding(dec!(110));
    assert_eq!(controller.should_rebalance(8 * DAY).unwrap(), ActionCode::Reinvest);

    // fee 11, net 99, spot spend 99 * 1 / 2 = 49.5 -> 0.495 base
    let outcome = controller.reinvest(&keeper(), 8 * DAY).unwrap();
    assert_eq!(outcome.performance_fee, dec!(11));
    assert_eq!(outcome.spot_spend, dec!(49.5));
    assert_eq!(outcome.base_quantity, BaseUnits::new(dec!(-0.495)));
    assert_eq!(outcome.new_leverage, lev(dec!(-1)));
    assert_eq!(controller.accrued_performance_fees(), dec!(11));

    let account = ledger.account();
    assert_eq!(account.spot_balance, BaseUnits::new(dec!(5.495)));
    assert_eq!(account.settled_funding, Decimal::ZERO);
    assert_eq!(account.account_value(), dec!(549.5));

    ledger.accrue_funding(dec!(10));
    assert!(matches!(
        controller.reinvest(&keeper(), 9 * DAY),
        Err(ControllerError::CooldownNotElapsed { .. })
    ));

    assert_eq!(controller.withdraw_performance_fees(&owner()).unwrap(), dec!(11));
    assert_eq!(controller.accrued_performance_fees(), Decimal::ZERO);
}

#[test]
fn basis_reinvest_refused_by_venue_changes_nothing() {
    let ledger = PaperLedger::new(PaperAccount {
        cash: dec!(1000),
        base_balance: BaseUnits::new(dec!(-5)),
        spot_balance: BaseUnits::new(dec!(5)),
        base_price: dec!(100),
        total_supply: dec!(1),
        settled_funding: dec!(110),
    });
    // Perp sells fill at half the oracle price, far outside slippage
    let perp: Arc<dyn VenueAdapter> =
        Arc::new(PaperVenue::perp(ledger.clone()).with_price_impact(dec!(0.5)));
    let spot: Arc<dyn VenueAdapter> = Arc::new(PaperVenue::spot(ledger.clone()));
    let mut controller = BasisController::new(
        PrincipalId::new("owner"),
        short_settings(vec![
            route("perp", dec!(10), dec!(20)),
            route("spot", dec!(10), dec!(20)),
        ]),
        Arc::new(ledger.clone()),
        vec![perp, spot],
    )
    .unwrap();
    controller
        .update_authorized_callers(&owner(), &[PrincipalId::new("keeper")], &[true])
        .unwrap();
    let before = ledger.account();
    assert_eq!(controller.should_rebalance(8 * DAY).unwrap(), ActionCode::Reinvest);

    let err = controller.reinvest(&keeper(), 8 * DAY).unwrap_err();
    assert_eq!(err.kind(), "venue");
    assert_eq!(ledger.account(), before);
    assert_eq!(controller.accrued_performance_fees(), Decimal::ZERO);
    assert_eq!(controller.state().last_reinvest_timestamp_ms, 0);
    // Still due
    assert_eq!(controller.should_rebalance(8 * DAY).unwrap(), ActionCode::Reinvest);
}

// =============================================================================
// Basis rebalancing (dual venue)
// =============================================================================

#[test]
fn basis_rejects_long_target() {
    let ledger = PaperLedger::new(PaperAccount::funded(dec!(1000), dec!(100), dec!(1)));
    let perp: Arc<dyn VenueAdapter> = Arc::new(PaperVenue::perp(ledger.clone()));
    let spot: Arc<dyn VenueAdapter> = Arc::new(PaperVenue::spot(ledger.clone()));
    let mut settings = StrategySettings::default();
    settings.exchange.legs = vec![
        route("perp", dec!(10), dec!(20)),
        route("spot", dec!(10), dec!(20)),
    ];

    let err = BasisController::new(
        PrincipalId::new("owner"),
        settings,
        Arc::new(ledger.clone()),
        vec![perp, spot],
    )
    .err()
    .unwrap();
    assert_eq!(
        err,
        ControllerError::ConfigurationInvalid(BoundsViolation::BasisTargetLeverage)
    );
}

#[test]
fn basis_rebalance_lands_on_next_leverage() {
    // -1200 / 1000 = -1.2, above max; next clamps to -1.1
    let ledger = hedged(dec!(1000), dec!(-12), dec!(100));
    let mut controller = basis_controller(&ledger, dec!(10));
    assert_eq!(controller.should_rebalance(DAY).unwrap(), ActionCode::Rebalance);

    // -12 * 0.1 / (-1.2 * 2.1) = 0.476190...
    let outcome = controller.rebalance(&keeper(), DAY).unwrap();
    assert_eq!(outcome.prev_leverage, lev(dec!(-1.2)));
    assert_eq!(outcome.chunk.total.inner().round_dp(6), dec!(0.476190));
    assert!(outcome.chunk.is_complete());
    assert!(!outcome.twap_pending());
    assert_eq!(outcome.new_leverage.inner().round_dp(6), dec!(-1.1));
    assert_eq!(controller.phase().unwrap(), RebalancePhase::EngagedStable);

    // Perp buy and spot sale settle against the same cash
    assert_spot_mirrors_perp(&ledger);
    assert_eq!(ledger.account().cash, dec!(2200));
}

#[test]
fn basis_partial_chunk_sets_twap_target() {
    let ledger = hedged(dec!(1000), dec!(-12), dec!(100));
    let mut controller = basis_controller(&ledger, dec!(0.2));

    let outcome = controller.rebalance(&keeper(), DAY).unwrap();
    assert_eq!(outcome.chunk.notional, BaseUnits::new(dec!(0.2)));
    assert!(!outcome.chunk.is_complete());
    assert_eq!(controller.twap_leverage_ratio(), lev(dec!(-1.1)));
    assert_eq!(controller.phase().unwrap(), RebalancePhase::EngagedTwap);
    assert_eq!(ledger.account().spot_balance, BaseUnits::new(dec!(11.8)));
    assert_spot_mirrors_perp(&ledger);

    assert_eq!(controller.should_rebalance(DAY + HOUR).unwrap(), ActionCode::IterateTwap);
    let mut now = DAY;
    for _ in 0..10 {
        if !controller.twap_leverage_ratio().is_zero() {
            now += HOUR;
            controller.iterate_rebalance(&keeper(), now).unwrap();
        }
    }
    assert!(controller.twap_leverage_ratio().is_zero());
    assert_eq!(
        controller.get_current_leverage_ratio().unwrap().inner().round_dp(6),
        dec!(-1.1)
    );
    assert_spot_mirrors_perp(&ledger);
}

#[test]
fn basis_ripcord_returns_to_max_leverage() {
    // -1400 / 1000 = -1.4, beyond -1.3
    let ledger = hedged(dec!(1000), dec!(-14), dec!(100));
    let mut controller = basis_controller(&ledger, dec!(1));
    controller.fund_incentive(dec!(5)).unwrap();
    assert_eq!(controller.should_rebalance(DAY).unwrap(), ActionCode::Ripcord);

    // -14 * 0.3 / (-1.4 * 2.1) = 1.428571..., within the incentivized size
    let outcome = controller.ripcord(&Caller::direct("anyone"), DAY).unwrap();
    assert_eq!(outcome.prev_leverage, lev(dec!(-1.4)));
    assert!(outcome.chunk.is_complete());
    assert_eq!(outcome.chunk.notional.inner().round_dp(6), dec!(1.428571));
    assert_eq!(outcome.new_leverage.inner().round_dp(6), dec!(-1.1));
    assert_eq!(outcome.reward_paid, dec!(1));
    assert_eq!(controller.incentive_balance(), dec!(4));
    assert_spot_mirrors_perp(&ledger);
}
