use anyhow::{Context, Result};
use diesel::SelectableHelper;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::pricing::SellerGroup;
use crate::models::{
    CreateOrderEntity, CreateOrderItemEntity, CreateOrderStatusHistoryEntity, CreatePaymentEntity,
    OrderEntity, OrderItemEntity,
};
use crate::schema::{order_items, order_status_history, orders, payments};
use crate::statuses::OrderStatus;

pub const PAYMENT_PROVIDER_SIMULATION: &str = "simulation";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedOrder {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

/// Create one order per seller group, with item snapshots, a payment record
/// and a status history seeded with `created` plus the final status when the
/// checkout lands elsewhere. Must run inside the confirm transaction.
pub async fn create_orders(
    conn: &mut AsyncPgConnection,
    buyer_id: i32,
    groups: &[SellerGroup],
    final_status: OrderStatus,
    shipping_address: Option<Value>,
) -> Result<Vec<CreatedOrder>> {
    let mut created = Vec::with_capacity(groups.len());

    for group in groups {
        let order: OrderEntity = diesel::insert_into(orders::table)
            .values(CreateOrderEntity {
                buyer_id,
                seller_id: group.seller_id,
                status: final_status.as_str().to_string(),
                item_count: group.item_count,
                subtotal_amount: group.subtotal_amount,
                total_amount: group.subtotal_amount,
                shipping_address: shipping_address.clone(),
            })
            .returning(OrderEntity::as_returning())
            .get_result(conn)
            .await
            .context("Failed to create order")?;

        let item_rows: Vec<CreateOrderItemEntity> = group
            .items
            .iter()
            .map(|line| CreateOrderItemEntity {
                order_id: order.id,
                product_id: line.item.product_id,
                title: line.item.title.clone(),
                variant_key: line.item.variant_key.clone(),
                unit_price: line.item.unit_price,
                quantity: line.item.quantity,
                line_total: line.line_total,
            })
            .collect();

        let items = diesel::insert_into(order_items::table)
            .values(item_rows)
            .returning(OrderItemEntity::as_returning())
            .get_results(conn)
            .await
            .context("Failed to create order items")?;

        let mut history = vec![CreateOrderStatusHistoryEntity {
            order_id: order.id,
            status: OrderStatus::Created.as_str().to_string(),
            note: None,
        }];
        if final_status != OrderStatus::Created {
            history.push(CreateOrderStatusHistoryEntity {
                order_id: order.id,
                status: final_status.as_str().to_string(),
                note: Some("Payment simulation".to_string()),
            });
        }
        diesel::insert_into(order_status_history::table)
            .values(history)
            .execute(conn)
            .await
            .context("Failed to seed status history")?;

        let paid = final_status == OrderStatus::Paid;
        diesel::insert_into(payments::table)
            .values(CreatePaymentEntity {
                order_id: order.id,
                amount: group.subtotal_amount,
                provider: PAYMENT_PROVIDER_SIMULATION.to_string(),
                status: if paid { "paid" } else { "failed" }.to_string(),
                failure_reason: (!paid).then(|| "Payment simulation declined".to_string()),
            })
            .execute(conn)
            .await
            .context("Failed to record payment")?;

        created.push(CreatedOrder { order, items });
    }

    Ok(created)
}

/// Append one row to an order's status history.
pub async fn append_history(
    conn: &mut AsyncPgConnection,
    order_id: i32,
    status: OrderStatus,
    note: Option<String>,
) -> Result<()> {
    diesel::insert_into(order_status_history::table)
        .values(CreateOrderStatusHistoryEntity {
            order_id,
            status: status.as_str().to_string(),
            note,
        })
        .execute(conn)
        .await
        .context("Failed to append status history")?;

    Ok(())
}
