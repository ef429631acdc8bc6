use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use super::PayableItem;

/// Two-decimal rounding, half away from zero. Applied per line and then
/// re-summed, so floating point drift stays bounded per line.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PricedLine {
    #[serde(flatten)]
    pub item: PayableItem,
    pub line_total: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SellerGroup {
    pub seller_id: i32,
    pub items: Vec<PricedLine>,
    pub item_count: i32,
    pub subtotal_amount: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutTotals {
    pub item_count: i32,
    pub subtotal_amount: f64,
    pub total_amount: f64,
}

/// Group payable items per seller and price every line. Groups come out in
/// ascending seller id order so responses are stable.
pub fn group_by_seller(payable: &[PayableItem]) -> Vec<SellerGroup> {
    let mut groups: BTreeMap<i32, Vec<PricedLine>> = BTreeMap::new();

    for item in payable {
        let line_total = round2(item.unit_price * item.quantity as f64);
        groups.entry(item.seller_id).or_default().push(PricedLine {
            item: item.clone(),
            line_total,
        });
    }

    groups
        .into_iter()
        .map(|(seller_id, items)| {
            let item_count = items.iter().map(|line| line.item.quantity).sum();
            let subtotal_amount = round2(items.iter().map(|line| line.line_total).sum::<f64>());
            SellerGroup {
                seller_id,
                items,
                item_count,
                subtotal_amount,
            }
        })
        .collect()
}

/// Overall totals across all seller groups. No discount or tax is applied at
/// this layer; vouchers are validated as a separate concern.
pub fn totals(groups: &[SellerGroup]) -> CheckoutTotals {
    let item_count = groups.iter().map(|group| group.item_count).sum();
    let subtotal_amount = round2(groups.iter().map(|group| group.subtotal_amount).sum::<f64>());
    CheckoutTotals {
        item_count,
        subtotal_amount,
        total_amount: subtotal_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payable(product_id: i32, seller_id: i32, unit_price: f64, quantity: i32) -> PayableItem {
        PayableItem {
            cart_item_id: None,
            product_id,
            seller_id,
            title: format!("Product {product_id}"),
            variant_key: None,
            unit_price,
            quantity,
            available_stock: quantity,
        }
    }

    fn assert_money_eq(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn round2_half_away_from_zero() {
        assert_money_eq(round2(1.005001), 1.01);
        assert_money_eq(round2(2.675001), 2.68);
        assert_money_eq(round2(-1.255001), -1.26);
        assert_money_eq(round2(3.0), 3.0);
    }

    #[test]
    fn line_total_is_rounded_per_line() {
        let groups = group_by_seller(&[payable(1, 1, 3.33, 3)]);
        assert_money_eq(groups[0].items[0].line_total, 9.99);
    }

    #[test]
    fn repeating_fraction_does_not_accumulate() {
        // 0.1 * 3 is not representable exactly; the line rounding absorbs it.
        let groups = group_by_seller(&[payable(1, 1, 0.1, 3)]);
        assert_money_eq(groups[0].items[0].line_total, 0.3);
        assert_money_eq(groups[0].subtotal_amount, 0.3);
    }

    #[test]
    fn subtotal_is_sum_of_rounded_lines() {
        let items = [payable(1, 1, 19.99, 2), payable(2, 1, 0.05, 3)];
        let groups = group_by_seller(&items);

        assert_eq!(groups.len(), 1);
        assert_money_eq(groups[0].subtotal_amount, 39.98 + 0.15);
        assert_eq!(groups[0].item_count, 5);
    }

    #[test]
    fn two_sellers_split_into_two_groups() {
        let items = [
            payable(1, 20, 10.0, 1),
            payable(2, 10, 5.0, 2),
            payable(3, 20, 2.5, 4),
        ];
        let groups = group_by_seller(&items);

        assert_eq!(groups.len(), 2);
        // Ascending seller id.
        assert_eq!(groups[0].seller_id, 10);
        assert_eq!(groups[1].seller_id, 20);
        assert_money_eq(groups[0].subtotal_amount, 10.0);
        assert_money_eq(groups[1].subtotal_amount, 20.0);

        let overall = totals(&groups);
        assert_eq!(overall.item_count, 7);
        assert_money_eq(overall.subtotal_amount, 30.0);
        assert_money_eq(overall.total_amount, 30.0);
    }

    #[test]
    fn empty_collection_prices_to_zero() {
        let groups = group_by_seller(&[]);
        assert!(groups.is_empty());

        let overall = totals(&groups);
        assert_eq!(overall.item_count, 0);
        assert_money_eq(overall.total_amount, 0.0);
    }
}
