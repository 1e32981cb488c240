//! Packed order record.
//!
//! ```text
//! word 0: [  0.. 32) trader slot   [ 32..128) price
//! word 1: [  0.. 96) original amt  [ 96..101) flags: side | type | status
//! word 2: [  0.. 96) filled amt
//! word 3: [  0.. 64) placed-at (unix ms)
//! ```
//!
//! The order id is the record's key and is not stored inside it.

use chrono::{DateTime, Utc};
use hookmatch_types::{
    HookmatchError, MarketPair, Order, OrderId, OrderSide, OrderStatus, OrderType, Result, UserId,
    constants,
};
use rust_decimal::Decimal;

use crate::{BitField, PackedWords, from_fixed, to_fixed};

pub const TRADER_SLOT: BitField = BitField::new("trader_slot", 0, 0, 32);
pub const PRICE: BitField = BitField::new("price", 0, 32, 96);
pub const ORIGINAL_AMOUNT: BitField = BitField::new("original_amount", 1, 0, 96);
pub const SIDE: BitField = BitField::new("side", 1, 96, 1);
pub const ORDER_TYPE: BitField = BitField::new("order_type", 1, 97, 1);
pub const STATUS: BitField = BitField::new("status", 1, 98, 3);
pub const FILLED_AMOUNT: BitField = BitField::new("filled_amount", 2, 0, 96);
pub const PLACED_AT: BitField = BitField::new("placed_at", 3, 0, 64);

/// The side, type and status bits taken together.
pub const FLAGS: BitField = BitField::new("flags", 1, 96, 5);

/// Every leaf field of the record.
pub const ORDER_LAYOUT: [BitField; 8] = [
    TRADER_SLOT,
    PRICE,
    ORIGINAL_AMOUNT,
    SIDE,
    ORDER_TYPE,
    STATUS,
    FILLED_AMOUNT,
    PLACED_AT,
];

pub const ORDER_WORDS: usize = 4;

/// Unpacked view of an order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFields {
    pub trader_slot: u32,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub price: Decimal,
    pub original_amount: Decimal,
    pub filled_amount: Decimal,
    pub placed_at: DateTime<Utc>,
}

impl OrderFields {
    /// Fields of `order`, with its trader already interned as `trader_slot`.
    #[must_use]
    pub fn from_order(order: &Order, trader_slot: u32) -> Self {
        Self {
            trader_slot,
            side: order.side,
            order_type: order.order_type,
            status: order.status,
            price: order.price,
            original_amount: order.original_amount,
            filled_amount: order.filled_amount,
            placed_at: order.placed_at,
        }
    }

    /// Rebuild the full order from its key and interned context.
    #[must_use]
    pub fn into_order(self, id: OrderId, trader: UserId, market: MarketPair) -> Order {
        Order {
            id,
            trader,
            market,
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            original_amount: self.original_amount,
            filled_amount: self.filled_amount,
            status: self.status,
            placed_at: self.placed_at,
        }
    }
}

/// A 4-word packed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedOrder {
    words: PackedWords<ORDER_WORDS>,
}

impl PackedOrder {
    /// Pack `fields`.
    ///
    /// # Errors
    /// `FieldOverflow` / `PrecisionLoss` if any value does not fit its field.
    pub fn encode(fields: &OrderFields) -> Result<Self> {
        let mut record = Self::default();
        record
            .words
            .set(&TRADER_SLOT, u128::from(fields.trader_slot))?;
        record.set_decimal(&PRICE, fields.price, constants::PRICE_PRECISION)?;
        record.set_decimal(
            &ORIGINAL_AMOUNT,
            fields.original_amount,
            constants::QTY_PRECISION,
        )?;
        record.update_flags(fields.side, fields.order_type, fields.status)?;
        record.update_filled(fields.filled_amount)?;

        let millis = fields.placed_at.timestamp_millis();
        let millis = u64::try_from(millis).map_err(|_| HookmatchError::FieldOverflow {
            field: PLACED_AT.name,
            width: PLACED_AT.width,
            value: millis.to_string(),
        })?;
        record.words.set(&PLACED_AT, u128::from(millis))?;
        Ok(record)
    }

    /// Unpack every field.
    ///
    /// # Errors
    /// `CorruptRecord` if the bits do not decode to valid values.
    pub fn decode(&self) -> Result<OrderFields> {
        let trader_slot = u32::try_from(self.words.get(&TRADER_SLOT)).map_err(|e| {
            HookmatchError::CorruptRecord {
                field: TRADER_SLOT.name,
                reason: e.to_string(),
            }
        })?;
        let millis = i64::try_from(self.words.get(&PLACED_AT)).map_err(|e| {
            HookmatchError::CorruptRecord {
                field: PLACED_AT.name,
                reason: e.to_string(),
            }
        })?;
        let placed_at =
            DateTime::from_timestamp_millis(millis).ok_or_else(|| HookmatchError::CorruptRecord {
                field: PLACED_AT.name,
                reason: format!("{millis} ms is out of range"),
            })?;

        Ok(OrderFields {
            trader_slot,
            side: self.side(),
            order_type: self.order_type(),
            status: self.status()?,
            price: from_fixed(PRICE.name, self.words.get(&PRICE), constants::PRICE_PRECISION)?,
            original_amount: from_fixed(
                ORIGINAL_AMOUNT.name,
                self.words.get(&ORIGINAL_AMOUNT),
                constants::QTY_PRECISION,
            )?,
            filled_amount: self.filled_amount()?,
            placed_at,
        })
    }

    /// Overwrite the filled amount in place.
    pub fn update_filled(&mut self, filled: Decimal) -> Result<()> {
        self.set_decimal(&FILLED_AMOUNT, filled, constants::QTY_PRECISION)
    }

    /// Overwrite side, type and status in one write.
    pub fn update_flags(
        &mut self,
        side: OrderSide,
        order_type: OrderType,
        status: OrderStatus,
    ) -> Result<()> {
        let flags = side_bits(side)
            | (type_bits(order_type) << (ORDER_TYPE.offset - FLAGS.offset))
            | (status_bits(status) << (STATUS.offset - FLAGS.offset));
        self.words.set(&FLAGS, flags)
    }

    /// Overwrite only the status bits.
    pub fn update_status(&mut self, status: OrderStatus) -> Result<()> {
        self.words.set(&STATUS, status_bits(status))
    }

    #[must_use]
    pub fn trader_slot(&self) -> u32 {
        // The field is 32 bits wide, so the value always fits.
        u32::try_from(self.words.get(&TRADER_SLOT)).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn side(&self) -> OrderSide {
        if self.words.get(&SIDE) == 0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }

    #[must_use]
    pub fn order_type(&self) -> OrderType {
        if self.words.get(&ORDER_TYPE) == 0 {
            OrderType::Limit
        } else {
            OrderType::Market
        }
    }

    pub fn status(&self) -> Result<OrderStatus> {
        match self.words.get(&STATUS) {
            0 => Ok(OrderStatus::Active),
            1 => Ok(OrderStatus::PartiallyFilled),
            2 => Ok(OrderStatus::Filled),
            3 => Ok(OrderStatus::Cancelled),
            other => Err(HookmatchError::CorruptRecord {
                field: STATUS.name,
                reason: format!("unknown status code {other}"),
            }),
        }
    }

    pub fn filled_amount(&self) -> Result<Decimal> {
        from_fixed(
            FILLED_AMOUNT.name,
            self.words.get(&FILLED_AMOUNT),
            constants::QTY_PRECISION,
        )
    }

    #[must_use]
    pub fn words(&self) -> &[u128; ORDER_WORDS] {
        self.words.words()
    }

    fn set_decimal(&mut self, field: &BitField, value: Decimal, scale: u32) -> Result<()> {
        let raw = to_fixed(field.name, value, scale, field.width)?;
        self.words.set(field, raw)
    }
}

fn side_bits(side: OrderSide) -> u128 {
    match side {
        OrderSide::Buy => 0,
        OrderSide::Sell => 1,
    }
}

fn type_bits(order_type: OrderType) -> u128 {
    match order_type {
        OrderType::Limit => 0,
        OrderType::Market => 1,
    }
}

fn status_bits(status: OrderStatus) -> u128 {
    match status {
        OrderStatus::Active => 0,
        OrderStatus::PartiallyFilled => 1,
        OrderStatus::Filled => 2,
        OrderStatus::Cancelled => 3,
    }
}
