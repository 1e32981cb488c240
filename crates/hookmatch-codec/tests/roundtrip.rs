//! Randomized checks that every representable order and balance survives
//! packing, and that field updates never disturb their neighbours.

use chrono::DateTime;
use hookmatch_codec::{OrderFields, PackedBalance, PackedOrder};
use hookmatch_types::{BalanceEntry, HookmatchError, OrderSide, OrderStatus, OrderType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

const MAX_96: u128 = (1u128 << 96) - 1;

fn random_amount(rng: &mut StdRng) -> Decimal {
    // Mix tiny, ordinary and near-limit values.
    let raw = match rng.gen_range(0..3) {
        0 => rng.gen_range(0..1_000u128),
        1 => rng.gen_range(0..1_000_000_000_000_000u128),
        _ => rng.gen_range(MAX_96 - 1_000_000..=MAX_96),
    };
    hookmatch_codec::from_fixed("amount", raw, 8).unwrap()
}

fn random_fields(rng: &mut StdRng) -> OrderFields {
    let side = if rng.gen_bool(0.5) {
        OrderSide::Buy
    } else {
        OrderSide::Sell
    };
    let order_type = if rng.gen_bool(0.5) {
        OrderType::Limit
    } else {
        OrderType::Market
    };
    let status = match rng.gen_range(0..4) {
        0 => OrderStatus::Active,
        1 => OrderStatus::PartiallyFilled,
        2 => OrderStatus::Filled,
        _ => OrderStatus::Cancelled,
    };
    OrderFields {
        trader_slot: rng.r#gen(),
        side,
        order_type,
        status,
        price: random_amount(rng),
        original_amount: random_amount(rng),
        filled_amount: random_amount(rng),
        placed_at: DateTime::from_timestamp_millis(rng.gen_range(0..4_102_444_800_000)).unwrap(),
    }
}

#[test]
fn random_orders_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0x00C0_FFEE);
    for _ in 0..2_000 {
        let fields = random_fields(&mut rng);
        let packed = PackedOrder::encode(&fields).unwrap();
        assert_eq!(packed.decode().unwrap(), fields);
    }
}

#[test]
fn random_field_updates_are_isolated() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let fields = random_fields(&mut rng);
        let mut packed = PackedOrder::encode(&fields).unwrap();

        let filled = random_amount(&mut rng);
        packed.update_filled(filled).unwrap();
        packed.update_status(OrderStatus::Cancelled).unwrap();

        let decoded = packed.decode().unwrap();
        assert_eq!(
            decoded,
            OrderFields {
                filled_amount: filled,
                status: OrderStatus::Cancelled,
                ..fields
            }
        );
    }
}

#[test]
fn random_balances_roundtrip() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..2_000 {
        let entry = BalanceEntry {
            available: random_amount(&mut rng),
            locked: random_amount(&mut rng),
        };
        assert_eq!(PackedBalance::encode(&entry).unwrap().decode().unwrap(), entry);
    }
}

#[test]
fn out_of_range_values_fail_loudly() {
    let mut rng = StdRng::seed_from_u64(1);
    let base = random_fields(&mut rng);

    let too_big = hookmatch_codec::from_fixed("x", MAX_96, 8).unwrap() + Decimal::new(1, 8);
    let too_precise = Decimal::new(123_456_789, 9);

    for bad in [too_big, too_precise, Decimal::new(-5, 0)] {
        let fields = OrderFields {
            original_amount: bad,
            ..base
        };
        let err = PackedOrder::encode(&fields).unwrap_err();
        assert!(
            matches!(
                err,
                HookmatchError::FieldOverflow { .. } | HookmatchError::PrecisionLoss { .. }
            ),
            "unexpected error for {bad}: {err}"
        );
    }
}
