//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Tick arithmetic in
//! particular must be exact: a price that is "almost" a multiple of the
//! tick size is rejected by every venue.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Basis points per unit.
pub const BPS_PER_UNIT: Decimal = dec!(10000);

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Number of whole ticks at or below this price: `floor(price / tick)`.
    ///
    /// `None` when the tick size is zero or the quotient overflows.
    #[inline]
    pub fn floor_ticks(&self, tick_size: Price) -> Option<Decimal> {
        self.0.checked_div(tick_size.0).map(|ticks| ticks.floor())
    }

    /// Number of whole ticks at or above this price: `ceil(price / tick)`.
    #[inline]
    pub fn ceil_ticks(&self, tick_size: Price) -> Option<Decimal> {
        self.0.checked_div(tick_size.0).map(|ticks| ticks.ceil())
    }

    /// Round down to tick size. Unchanged if the tick count is not representable.
    #[inline]
    pub fn round_to_tick(&self, tick_size: Price) -> Self {
        match self.floor_ticks(tick_size) {
            Some(ticks) => Self(ticks * tick_size.0),
            None => *self,
        }
    }

    /// Round up to tick size. Unchanged if the tick count is not representable.
    #[inline]
    pub fn ceil_to_tick(&self, tick_size: Price) -> Self {
        match self.ceil_ticks(tick_size) {
            Some(ticks) => Self(ticks * tick_size.0),
            None => *self,
        }
    }

    /// Check that the price sits exactly on the tick grid.
    #[inline]
    pub fn is_on_tick(&self, tick_size: Price) -> bool {
        tick_size.is_zero()
            || self
                .0
                .checked_rem(tick_size.0)
                .is_some_and(|rem| rem.is_zero())
    }

    /// Calculate signed basis points difference from another price.
    #[inline]
    pub fn bps_from(&self, other: Price) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some((self.0 - other.0) / other.0 * BPS_PER_UNIT)
    }

    /// Absolute distance from a reference price in basis points.
    #[inline]
    pub fn abs_bps_from(&self, reference: Price) -> Option<Decimal> {
        self.bps_from(reference).map(|bps| bps.abs())
    }

    /// Absolute distance from a reference price in (fractional) ticks.
    #[inline]
    pub fn abs_ticks_from(&self, reference: Price, tick_size: Price) -> Option<Decimal> {
        (self.0 - reference.0).abs().checked_div(tick_size.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Size/quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Round down to lot size.
    #[inline]
    pub fn round_to_lot(&self, lot_size: Size) -> Self {
        match self.0.checked_div(lot_size.0) {
            Some(lots) => Self(lots.floor() * lot_size.0),
            None => *self,
        }
    }

    /// Subtract, clamping at zero.
    #[inline]
    pub fn saturating_sub(&self, rhs: Size) -> Self {
        Self((self.0 - rhs.0).max(Decimal::ZERO))
    }

    /// Calculate notional value: size * price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Size {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_bps() {
        let p1 = Price::new(dec!(100));
        let p2 = Price::new(dec!(101));

        assert_eq!(p2.bps_from(p1).unwrap(), dec!(100)); // 1% = 100 bps
        assert_eq!(p1.abs_bps_from(p2).unwrap().round_dp(2), dec!(99.01));
    }

    #[test]
    fn test_bps_from_zero_reference() {
        assert!(Price::new(dec!(1)).bps_from(Price::ZERO).is_none());
    }

    #[test]
    fn test_price_round_to_tick() {
        let price = Price::new(dec!(12345.6789));
        let tick = Price::new(dec!(0.01));

        assert_eq!(price.round_to_tick(tick).0, dec!(12345.67));
        assert_eq!(price.ceil_to_tick(tick).0, dec!(12345.68));
    }

    #[test]
    fn test_tick_counts() {
        let tick = Price::new(dec!(0.5));
        let price = Price::new(dec!(10.2));

        assert_eq!(price.floor_ticks(tick), Some(dec!(20)));
        assert_eq!(price.ceil_ticks(tick), Some(dec!(21)));
        assert!(price.floor_ticks(Price::ZERO).is_none());
        assert!(!price.is_on_tick(tick));
        assert!(Price::new(dec!(10.5)).is_on_tick(tick));
    }

    #[test]
    fn test_tick_count_overflow_is_none() {
        let price = Price::new(dec!(10000000000));
        let tick = Price::new(Decimal::new(1, 20));

        assert!(price.floor_ticks(tick).is_none());
        assert!(price.ceil_ticks(tick).is_none());
        assert_eq!(price.round_to_tick(tick), price);
        assert!(price.abs_ticks_from(Price::ZERO, tick).is_none());
    }

    #[test]
    fn test_abs_ticks_from() {
        let tick = Price::new(dec!(0.01));
        let ticks = Price::new(dec!(99.95))
            .abs_ticks_from(Price::new(dec!(100)), tick)
            .unwrap();
        assert_eq!(ticks, dec!(5));
        assert!(Price::ONE.abs_ticks_from(Price::ONE, Price::ZERO).is_none());
    }

    #[test]
    fn test_size_round_to_lot() {
        let size = Size::new(dec!(1.2345));
        let lot = Size::new(dec!(0.001));

        assert_eq!(size.round_to_lot(lot).0, dec!(1.234));
    }

    #[test]
    fn test_size_saturating_sub() {
        let requested = Size::new(dec!(0.003));
        assert_eq!(requested.saturating_sub(Size::new(dec!(0.001))).0, dec!(0.002));
        assert_eq!(requested.saturating_sub(Size::new(dec!(0.01))), Size::ZERO);
    }

    #[test]
    fn test_notional_calculation() {
        let size = Size::new(dec!(0.5));
        let price = Price::new(dec!(50000));

        assert_eq!(size.notional(price), dec!(25000));
    }
}
