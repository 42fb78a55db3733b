use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub fulfillment_status: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub shipping_address: Option<String>,
    pub currency: String,
    pub total_cents: i64,
    pub shipped_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub image_url: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_price_cents: i64,
}

/// One step of an order's shipping timeline.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub message: Option<String>,
    pub created_at: i64,
}

/// Everything the owner of an order may see.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Oldest first.
    pub events: Vec<OrderEvent>,
}

/// What an anonymous tracking-link holder may see: no owner identity,
/// contact email or shipping address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTrackingOrder {
    pub id: String,
    pub order_number: String,
    pub status: String,
    pub fulfillment_status: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub tracking_url: Option<String>,
    pub shipped_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub items: Vec<OrderItem>,
    pub events: Vec<OrderEvent>,
    pub created_at: i64,
    pub updated_at: i64,
    pub currency: String,
    pub total_cents: i64,
}

impl From<OrderDetails> for PublicTrackingOrder {
    fn from(details: OrderDetails) -> Self {
        let order = details.order;
        Self {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            fulfillment_status: order.fulfillment_status,
            carrier: order.carrier,
            tracking_number: order.tracking_number,
            tracking_url: order.tracking_url,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            items: details.items,
            events: details.events,
            created_at: order.created_at,
            updated_at: order.updated_at,
            currency: order.currency,
            total_cents: order.total_cents,
        }
    }
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, email, status, fulfillment_status, \
     carrier, tracking_number, tracking_url, shipping_address, currency, total_cents, \
     shipped_at, delivered_at, created_at, updated_at";

impl Order {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_tracking_url(
        pool: &SqlitePool,
        id: &str,
        tracking_url: &str,
        updated_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET tracking_url = ?, updated_at = ? WHERE id = ?")
            .bind(tracking_url)
            .bind(updated_at)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Loads the line items and the event timeline.
    pub async fn into_details(self, pool: &SqlitePool) -> Result<OrderDetails, sqlx::Error> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, product_name, variant_name, image_url, quantity, unit_price_cents, total_price_cents
            FROM order_items
            WHERE order_id = ?
            ORDER BY id
            "#,
        )
        .bind(&self.id)
        .fetch_all(pool)
        .await?;

        let events = sqlx::query_as::<_, OrderEvent>(
            r#"
            SELECT id, event_type, message, created_at
            FROM order_events
            WHERE order_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(&self.id)
        .fetch_all(pool)
        .await?;

        Ok(OrderDetails {
            order: self,
            items,
            events,
        })
    }
}
