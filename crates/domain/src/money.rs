//! 金額計算
//!
//! `Decimal` の `*` と `Sum` は桁あふれで panic するため、金額の計算はここを経由する。

use rust_decimal::Decimal;

/// 単価 × 数量。桁あふれの場合は `None`
pub fn line_total(unit_price: Decimal, quantity: u32) -> Option<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity))
}

/// 金額の合計。いずれかが `None` または桁あふれの場合は `None`
pub fn checked_sum<I>(amounts: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(Decimal::new(1050, 2), 3), Some(Decimal::new(3150, 2)));
        assert_eq!(line_total(Decimal::MAX, 2), None);
        assert_eq!(line_total(Decimal::MAX, 1), Some(Decimal::MAX));
    }

    #[test]
    fn test_checked_sum() {
        assert_eq!(checked_sum(Vec::new()), Some(Decimal::ZERO));
        assert_eq!(
            checked_sum(vec![Some(Decimal::ONE), Some(Decimal::TWO)]),
            Some(Decimal::new(3, 0))
        );
        assert_eq!(checked_sum(vec![Some(Decimal::MAX), Some(Decimal::ONE)]), None);
        assert_eq!(checked_sum(vec![Some(Decimal::ONE), None]), None);
    }
}
