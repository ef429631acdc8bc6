use std::collections::HashMap;

use super::{LoadedProduct, PayableItem, RequestedLine, UnavailableItem};

/// Outcome of the read-only collection pass: every requested line ends up in
/// exactly one of the two lists.
#[derive(Debug, Clone)]
pub struct ItemCollection {
    pub payable: Vec<PayableItem>,
    pub unavailable: Vec<UnavailableItem>,
}

impl ItemCollection {
    pub fn can_proceed(&self) -> bool {
        !self.payable.is_empty()
    }
}

/// Validate requested lines against the loaded products. Read-only; rules
/// are checked in a fixed order and the first failing rule wins per line.
pub fn collect_items(
    buyer_id: i32,
    lines: &[RequestedLine],
    products: &HashMap<i32, LoadedProduct>,
) -> ItemCollection {
    let mut payable = Vec::new();
    let mut unavailable = Vec::new();

    for line in lines {
        match validate_line(buyer_id, line, products) {
            Ok(item) => payable.push(item),
            Err(item) => unavailable.push(item),
        }
    }

    ItemCollection {
        payable,
        unavailable,
    }
}

fn validate_line(
    buyer_id: i32,
    line: &RequestedLine,
    products: &HashMap<i32, LoadedProduct>,
) -> Result<PayableItem, UnavailableItem> {
    let reject = |reason: String, available_stock: i32| UnavailableItem {
        cart_item_id: line.cart_item_id,
        product_id: Some(line.product_id),
        variant_key: line.variant_key.clone(),
        requested_quantity: line.quantity,
        available_stock,
        reason,
    };

    let Some(loaded) = products.get(&line.product_id) else {
        return Err(reject("Product is no longer available".to_string(), 0));
    };

    if loaded.product.seller_id == buyer_id {
        return Err(reject(
            "You cannot purchase your own product".to_string(),
            loaded.product.stock,
        ));
    }

    // Price and stock come from the variant when one is selected; a product
    // that carries variants cannot be bought without picking one.
    let (unit_price, available) = match &line.variant_key {
        Some(key) => {
            let Some(variant) = loaded
                .variants
                .iter()
                .find(|variant| &variant.variant_key == key)
            else {
                return Err(reject("Selected variant is no longer offered".to_string(), 0));
            };
            (variant.price, variant.quantity)
        }
        None => {
            if loaded.has_variants() {
                return Err(reject("Product requires a variant selection".to_string(), 0));
            }
            (loaded.product.price, loaded.product.stock)
        }
    };

    if line.quantity <= 0 {
        return Err(reject(
            "Requested quantity must be positive".to_string(),
            available,
        ));
    }

    if available <= 0 {
        return Err(reject("Out of stock".to_string(), 0));
    }

    if line.quantity > available {
        return Err(reject(format!("Only {available} left in stock"), available));
    }

    Ok(PayableItem {
        cart_item_id: line.cart_item_id,
        product_id: line.product_id,
        seller_id: loaded.product.seller_id,
        title: loaded.product.title.clone(),
        variant_key: line.variant_key.clone(),
        unit_price,
        quantity: line.quantity,
        available_stock: available,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{ProductEntity, ProductVariantEntity};

    const BUYER: i32 = 7;
    const SELLER: i32 = 11;

    fn product(id: i32, seller_id: i32, price: f64, stock: i32) -> LoadedProduct {
        let now = Utc::now();
        LoadedProduct {
            product: ProductEntity {
                id,
                seller_id,
                category_id: None,
                title: format!("Product {id}"),
                description: None,
                price,
                stock,
                status: "active".to_string(),
                created_at: now,
                updated_at: now,
            },
            variants: Vec::new(),
        }
    }

    fn with_variant(mut loaded: LoadedProduct, key: &str, price: f64, quantity: i32) -> LoadedProduct {
        let now = Utc::now();
        let id = loaded.variants.len() as i32 + 1;
        loaded.variants.push(ProductVariantEntity {
            id,
            product_id: loaded.product.id,
            variant_key: key.to_string(),
            price,
            quantity,
            created_at: now,
            updated_at: now,
        });
        loaded
    }

    fn line(product_id: i32, variant_key: Option<&str>, quantity: i32) -> RequestedLine {
        RequestedLine {
            cart_item_id: None,
            product_id,
            variant_key: variant_key.map(str::to_string),
            quantity,
        }
    }

    fn catalog(products: Vec<LoadedProduct>) -> HashMap<i32, LoadedProduct> {
        products
            .into_iter()
            .map(|loaded| (loaded.product.id, loaded))
            .collect()
    }

    #[test]
    fn flat_product_in_stock_is_payable() {
        let catalog = catalog(vec![product(1, SELLER, 19.99, 5)]);
        let collection = collect_items(BUYER, &[line(1, None, 2)], &catalog);

        assert!(collection.unavailable.is_empty());
        let item = &collection.payable[0];
        assert_eq!(item.unit_price, 19.99);
        assert_eq!(item.quantity, 2);
        assert_eq!(item.seller_id, SELLER);
    }

    #[test]
    fn missing_product_is_unavailable() {
        let collection = collect_items(BUYER, &[line(42, None, 1)], &HashMap::new());

        assert!(collection.payable.is_empty());
        assert_eq!(
            collection.unavailable[0].reason,
            "Product is no longer available"
        );
    }

    #[test]
    fn self_purchase_is_rejected_regardless_of_stock() {
        let catalog = catalog(vec![product(1, BUYER, 10.0, 100)]);
        let collection = collect_items(BUYER, &[line(1, None, 1)], &catalog);

        assert!(collection.payable.is_empty());
        assert_eq!(
            collection.unavailable[0].reason,
            "You cannot purchase your own product"
        );
    }

    #[test]
    fn over_quantity_reports_exact_available_stock() {
        let catalog = catalog(vec![product(1, SELLER, 5.0, 3)]);
        let collection = collect_items(BUYER, &[line(1, None, 4)], &catalog);

        assert!(collection.payable.is_empty());
        let rejected = &collection.unavailable[0];
        assert_eq!(rejected.available_stock, 3);
        assert_eq!(rejected.requested_quantity, 4);
        assert_eq!(rejected.reason, "Only 3 left in stock");
    }

    #[test]
    fn zero_stock_is_out_of_stock() {
        let catalog = catalog(vec![product(1, SELLER, 5.0, 0)]);
        let collection = collect_items(BUYER, &[line(1, None, 1)], &catalog);

        assert_eq!(collection.unavailable[0].reason, "Out of stock");
    }

    #[test]
    fn variant_price_and_stock_override_flat_values() {
        let loaded = with_variant(product(1, SELLER, 10.0, 0), "size=m", 12.5, 4);
        let catalog = catalog(vec![loaded]);
        let collection = collect_items(BUYER, &[line(1, Some("size=m"), 3)], &catalog);

        let item = &collection.payable[0];
        assert_eq!(item.unit_price, 12.5);
        assert_eq!(item.available_stock, 4);
    }

    #[test]
    fn unknown_variant_key_is_rejected() {
        let loaded = with_variant(product(1, SELLER, 10.0, 0), "size=m", 12.5, 4);
        let catalog = catalog(vec![loaded]);
        let collection = collect_items(BUYER, &[line(1, Some("size=xl"), 1)], &catalog);

        assert_eq!(
            collection.unavailable[0].reason,
            "Selected variant is no longer offered"
        );
    }

    #[test]
    fn variant_bearing_product_requires_a_selection() {
        let loaded = with_variant(product(1, SELLER, 10.0, 5), "size=m", 12.5, 4);
        let catalog = catalog(vec![loaded]);
        let collection = collect_items(BUYER, &[line(1, None, 1)], &catalog);

        assert_eq!(
            collection.unavailable[0].reason,
            "Product requires a variant selection"
        );
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let catalog = catalog(vec![product(1, SELLER, 5.0, 3)]);
        let collection = collect_items(BUYER, &[line(1, None, 0)], &catalog);

        assert_eq!(
            collection.unavailable[0].reason,
            "Requested quantity must be positive"
        );
    }

    #[test]
    fn mixed_lines_split_between_lists() {
        let catalog = catalog(vec![product(1, SELLER, 5.0, 3), product(2, SELLER, 8.0, 0)]);
        let lines = [line(1, None, 2), line(2, None, 1), line(3, None, 1)];
        let collection = collect_items(BUYER, &lines, &catalog);

        assert_eq!(collection.payable.len(), 1);
        assert_eq!(collection.unavailable.len(), 2);
        assert!(collection.can_proceed());
    }
}
