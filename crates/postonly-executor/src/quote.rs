//! Join-the-touch maker pricing.

use postonly_core::{Bbo, OrderSide, Price};

/// Price a post-only order on `side` at the touch.
///
/// A buy joins the bid, a sell joins the ask. When the snapshot is crossed
/// (bid >= ask) the quote steps back one tick so it can still rest.
pub fn maker_price(bbo: &Bbo, side: OrderSide, tick: Price) -> Price {
    let crossed = bbo.is_crossed();
    let price = match side {
        OrderSide::Buy if crossed => bbo.bid - tick,
        OrderSide::Buy => bbo.bid,
        OrderSide::Sell if crossed => bbo.ask + tick,
        OrderSide::Sell => bbo.ask,
    };
    price.floor_to_tick(tick)
}

/// Price used for min-notional sizing when no order price exists yet.
pub fn reference_price(bbo: &Bbo, side: OrderSide) -> Price {
    match side {
        OrderSide::Buy => bbo.ask,
        OrderSide::Sell => bbo.bid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bbo(bid: rust_decimal::Decimal, ask: rust_decimal::Decimal) -> Bbo {
        Bbo::new(Price::new(bid), Price::new(ask))
    }

    const TICK: Price = Price(dec!(0.01));

    #[test]
    fn test_joins_touch() {
        let book = bbo(dec!(100.00), dec!(100.01));
        assert_eq!(maker_price(&book, OrderSide::Buy, TICK), Price::new(dec!(100.00)));
        assert_eq!(maker_price(&book, OrderSide::Sell, TICK), Price::new(dec!(100.01)));
    }

    #[test]
    fn test_crossed_book_steps_back() {
        let book = bbo(dec!(100.02), dec!(100.01));
        assert_eq!(maker_price(&book, OrderSide::Buy, TICK), Price::new(dec!(100.01)));
        assert_eq!(maker_price(&book, OrderSide::Sell, TICK), Price::new(dec!(100.02)));
    }

    #[test]
    fn test_locked_book_counts_as_crossed() {
        let book = bbo(dec!(100.00), dec!(100.00));
        assert_eq!(maker_price(&book, OrderSide::Buy, TICK), Price::new(dec!(99.99)));
        assert_eq!(maker_price(&book, OrderSide::Sell, TICK), Price::new(dec!(100.01)));
    }

    #[test]
    fn test_reference_price_is_far_touch() {
        let book = bbo(dec!(100.00), dec!(100.01));
        assert_eq!(reference_price(&book, OrderSide::Buy), Price::new(dec!(100.01)));
        assert_eq!(reference_price(&book, OrderSide::Sell), Price::new(dec!(100.00)));
    }
}
