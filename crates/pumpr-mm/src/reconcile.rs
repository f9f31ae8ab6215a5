//! Anti-self-trade reconciliation of a fresh bid/ask pair.

use pumpr_core::Price;
use rust_decimal::Decimal;
use tracing::debug;

use crate::proposal::OrderCandidate;

/// Separate a bid/ask pair that would trade against itself.
///
/// When the ask does not sit strictly above the bid, the ask is moved to
/// `(ceil(bid / tick) + 1) * tick`. A strictly ordered pair passes through
/// unchanged. `tick` must be positive.
pub fn reconcile(
    bid: OrderCandidate,
    ask: OrderCandidate,
    tick: Price,
) -> (OrderCandidate, OrderCandidate) {
    if bid.price < ask.price || !tick.is_positive() {
        return (bid, ask);
    }

    let Some(bid_ticks) = bid.price.ceil_ticks(tick) else {
        return (bid, ask);
    };
    let separated = Price::new((bid_ticks + Decimal::ONE) * tick.inner());
    debug!(
        bid = %bid.price,
        ask = %ask.price,
        new_ask = %separated,
        "Ask moved above bid to prevent self trade"
    );
    let ask = ask.with_price(separated);
    (bid, ask)
}
