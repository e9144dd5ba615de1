//! Keeper loop runs against the paper collaborators.

use levctl_core::{
    ActionCode, ExchangeSettings, IncentiveSettings, LeverageRatio, MethodologySettings,
    VenueRoute,
};
use levctl_keeper::{AppConfig, Application, StrategyVariant};
use rust_decimal_macros::dec;

const DAY: u64 = 24 * 60 * 60 * 1000;

fn route(name: &str) -> VenueRoute {
    VenueRoute {
        name: name.to_string(),
        twap_max_trade_size: dec!(100),
        incentivized_twap_max_trade_size: dec!(200),
    }
}

/// Short -1x, one tick per simulated day, polled every millisecond.
fn short_config(variant: StrategyVariant, max_ticks: u64) -> AppConfig {
    let mut config = AppConfig {
        variant,
        ..AppConfig::default()
    };
    config.keeper.poll_interval_ms = 1;
    config.keeper.tick_duration_ms = DAY;
    config.keeper.max_ticks = max_ticks;
    config.keeper.start_time_ms = Some(0);
    config.methodology = MethodologySettings {
        target_leverage_ratio: LeverageRatio::new(dec!(-1)),
        min_leverage_ratio: LeverageRatio::new(dec!(-0.9)),
        max_leverage_ratio: LeverageRatio::new(dec!(-1.1)),
        recentering_speed: dec!(0.05),
        rebalance_interval_ms: DAY,
        reinvest_interval_ms: 7 * DAY,
        performance_fee_percentage: dec!(0.1),
    };
    config.incentive = IncentiveSettings {
        incentivized_twap_cooldown_period_ms: 60_000,
        incentivized_slippage_tolerance: dec!(0.05),
        reward_amount: dec!(1),
        incentivized_leverage_ratio: LeverageRatio::new(dec!(-1.3)),
    };
    let legs = match variant {
        StrategyVariant::Leverage => vec![route("perp")],
        StrategyVariant::Basis => vec![route("perp"), route("spot")],
    };
    config.exchange = ExchangeSettings {
        legs,
        ..ExchangeSettings::default()
    };
    config.paper.initial_collateral = dec!(1000);
    config.paper.initial_price = dec!(100);
    config.paper.incentive_pool = dec!(5);
    config
}

#[test]
fn test_flat_tick_advises_nothing() {
    let config = short_config(StrategyVariant::Leverage, 1);
    let mut app = Application::new(config).unwrap();

    assert_eq!(app.tick().unwrap(), ActionCode::None);
    assert_eq!(app.clock_ms(), DAY);
    assert!(app.ledger().account().base_balance.is_zero());
}

#[tokio::test]
async fn test_rising_price_triggers_rebalances() {
    let mut config = short_config(StrategyVariant::Leverage, 5);
    // Short loses as price rises 3% a day; leverage leaves the band on day 2
    config.paper.price_drift_per_tick = dec!(0.03);
    let mut app = Application::new(config).unwrap();

    let summary = app.run().await.unwrap();

    assert_eq!(summary.ticks, 5);
    assert!(summary.rebalances >= 1);
    assert_eq!(summary.ripcords, 0);
    assert_eq!(summary.rejected, 0);
    // Engage plus at least one rebalance
    assert!(summary.events >= 2);
    assert!(!summary.final_leverage.is_zero());
    assert!(summary.final_leverage.magnitude() <= dec!(1.3));
    assert!(summary.final_price > dec!(100));
}

#[test]
fn test_basis_keeper_reinvests_weekly_funding() {
    let mut config = short_config(StrategyVariant::Basis, 8);
    config.paper.funding_per_tick = dec!(10);
    let mut app = Application::new(config).unwrap();

    let summary = tokio_test::block_on(app.run()).unwrap();

    assert_eq!(summary.ticks, 8);
    assert_eq!(summary.reinvests, 1);
    assert_eq!(summary.rebalances, 0);
    // Reinvesting at the current ratio leaves leverage untouched
    assert_eq!(summary.final_leverage, LeverageRatio::new(dec!(-1)));

    let account = app.ledger().account();
    // 70 settled by day 7 (fee 7, net 63, spot spend 31.5), then 10 more
    assert_eq!(account.spot_balance.inner(), dec!(5.315));
    assert_eq!(account.settled_funding, dec!(10));
}
