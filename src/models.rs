use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

// Carts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartEntity {
    pub id: i32,
    pub buyer_id: i32,
    pub status: String,
    pub total_items: i32,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemEntity {
    pub id: i32,
    pub cart_id: i32,
    pub product_id: i32,
    pub seller_id: i32,
    pub variant_key: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::carts)]
pub struct CreateCartEntity {
    pub buyer_id: i32,
    pub status: String,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct CreateCartItemEntity {
    pub cart_id: i32,
    pub product_id: i32,
    pub seller_id: i32,
    pub variant_key: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: i32,
    pub seller_id: i32,
    pub category_id: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub seller_id: i32,
    pub category_id: Option<i32>,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::product_variants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductVariantEntity {
    pub id: i32,
    pub product_id: i32,
    pub variant_key: String,
    pub price: f64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::product_variants)]
pub struct CreateProductVariantEntity {
    pub product_id: i32,
    pub variant_key: String,
    pub price: f64,
    pub quantity: i32,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub buyer_id: i32,
    pub seller_id: i32,
    pub status: String,
    pub item_count: i32,
    pub subtotal_amount: f64,
    pub total_amount: f64,
    pub shipping_address: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub buyer_id: i32,
    pub seller_id: i32,
    pub status: String,
    pub item_count: i32,
    pub subtotal_amount: f64,
    pub total_amount: f64,
    pub shipping_address: Option<Value>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub title: String,
    pub variant_key: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub title: String,
    pub variant_key: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderStatusHistoryEntity {
    pub id: i32,
    pub order_id: i32,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_status_history)]
pub struct CreateOrderStatusHistoryEntity {
    pub order_id: i32,
    pub status: String,
    pub note: Option<String>,
}

// Payments

#[derive(Queryable, Serialize, Selectable, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentEntity {
    pub id: Uuid,
    pub order_id: i32,
    pub amount: f64,
    pub status: String,
    pub provider: String,
    pub provider_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Serialize, Deserialize, Debug)]
#[diesel(table_name = crate::schema::payments)]
pub struct CreatePaymentEntity {
    pub order_id: i32,
    pub amount: f64,
    pub provider: String,
    pub status: String,
    pub failure_reason: Option<String>,
}

// Addresses

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AddressEntity {
    pub id: i32,
    pub user_id: i32,
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::addresses)]
pub struct CreateAddressEntity {
    pub user_id: i32,
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

// Categories

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryEntity {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::categories)]
pub struct CreateCategoryEntity {
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
}

// Reviews

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewEntity {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub buyer_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::reviews)]
pub struct CreateReviewEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub buyer_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
}

// Vouchers

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::vouchers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VoucherEntity {
    pub id: i32,
    pub seller_id: i32,
    pub code: String,
    pub discount_percent: f64,
    pub min_order_amount: f64,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::vouchers)]
pub struct CreateVoucherEntity {
    pub seller_id: i32,
    pub code: String,
    pub discount_percent: f64,
    pub min_order_amount: f64,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::voucher_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VoucherRequestEntity {
    pub id: i32,
    pub seller_id: i32,
    pub code: String,
    pub discount_percent: f64,
    pub min_order_amount: f64,
    pub status: String,
    pub decided_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::voucher_requests)]
pub struct CreateVoucherRequestEntity {
    pub seller_id: i32,
    pub code: String,
    pub discount_percent: f64,
    pub min_order_amount: f64,
    pub status: String,
}

// Complaints

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::complaints)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ComplaintEntity {
    pub id: i32,
    pub order_id: i32,
    pub buyer_id: i32,
    pub subject: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::complaints)]
pub struct CreateComplaintEntity {
    pub order_id: i32,
    pub buyer_id: i32,
    pub subject: String,
    pub description: String,
    pub status: String,
}

// Promotion requests

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::promotion_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PromotionRequestEntity {
    pub id: i32,
    pub seller_id: i32,
    pub product_id: i32,
    pub discount_percent: f64,
    pub status: String,
    pub decided_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::promotion_requests)]
pub struct CreatePromotionRequestEntity {
    pub seller_id: i32,
    pub product_id: i32,
    pub discount_percent: f64,
    pub status: String,
}
