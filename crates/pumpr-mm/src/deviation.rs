//! Distance of a resting order from the reference price.
//!
//! Rounding follows the venue-agnostic convention used in status output:
//! bps to one decimal place, ticks to a whole number, both half-to-even.

use pumpr_core::Price;
use rust_decimal::Decimal;

/// `round(|price - reference| / reference * 10000, 1)`.
///
/// `None` when the reference price is zero.
pub fn deviation_bps(price: Price, reference: Price) -> Option<Decimal> {
    price.abs_bps_from(reference).map(|bps| bps.round_dp(1))
}

/// `round(|price - reference| / tick)`.
///
/// `None` when the tick size is zero.
pub fn deviation_ticks(price: Price, reference: Price, tick_size: Price) -> Option<Decimal> {
    price
        .abs_ticks_from(reference, tick_size)
        .map(|ticks| ticks.round())
}

/// Re-quote iff the rounded deviation reaches the threshold.
pub fn needs_requote(deviation_bps: Decimal, threshold_bps: Decimal) -> bool {
    deviation_bps >= threshold_bps
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_close_order_does_not_requote() {
        // |30000.20 - 30000| / 30000 * 10000 = 0.0667 -> 0.1
        let dev = deviation_bps(Price::new(dec!(30000.20)), Price::new(dec!(30000))).unwrap();
        assert_eq!(dev, dec!(0.1));
        assert!(!needs_requote(dev, dec!(0.6)));
    }

    #[test]
    fn test_far_order_requotes() {
        // |29998 - 30000| / 30000 * 10000 = 0.6667 -> 0.7
        let dev = deviation_bps(Price::new(dec!(29998)), Price::new(dec!(30000))).unwrap();
        assert_eq!(dev, dec!(0.7));
        assert!(needs_requote(dev, dec!(0.6)));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // 0.6 bps exactly: 100 * 0.00006 = 0.006
        let dev = deviation_bps(Price::new(dec!(100.006)), Price::new(dec!(100))).unwrap();
        assert_eq!(dev, dec!(0.6));
        assert!(needs_requote(dev, dec!(0.6)));
        assert!(!needs_requote(dec!(0.5), dec!(0.6)));
    }

    #[test]
    fn test_rounding_happens_before_comparison() {
        // 0.55 bps rounds half-to-even to 0.6 and triggers
        let dev = deviation_bps(Price::new(dec!(100.0055)), Price::new(dec!(100))).unwrap();
        assert_eq!(dev, dec!(0.6));
        // 0.54 bps rounds to 0.5 and does not
        let dev = deviation_bps(Price::new(dec!(99.99460)), Price::new(dec!(100))).unwrap();
        assert_eq!(dev, dec!(0.5));
    }

    #[test]
    fn test_deviation_is_symmetric() {
        let reference = Price::new(dec!(200));
        let above = deviation_bps(Price::new(dec!(201)), reference).unwrap();
        let below = deviation_bps(Price::new(dec!(199)), reference).unwrap();
        assert_eq!(above, below);
        assert_eq!(above, dec!(50));
    }

    #[test]
    fn test_zero_reference_yields_none() {
        assert!(deviation_bps(Price::new(dec!(1)), Price::ZERO).is_none());
    }

    #[test]
    fn test_deviation_ticks() {
        let tick = Price::new(dec!(0.01));
        let mid = Price::new(dec!(30000.005));
        assert_eq!(
            deviation_ticks(Price::new(dec!(29998.00)), mid, tick),
            Some(dec!(200))
        );
        // 0.5 ticks rounds half-to-even to 0
        assert_eq!(
            deviation_ticks(Price::new(dec!(30000.00)), mid, tick),
            Some(dec!(0))
        );
        assert!(deviation_ticks(Price::ONE, mid, Price::ZERO).is_none());
    }
}
