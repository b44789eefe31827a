//! Shapes of the documents stored in each collection.
//!
//! Field names are the wire names the pipeline fragments reference
//! (`createdAt`, `totalPrice`, `items._id`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::Collection;

/// Order lifecycle status. Revenue and amount metrics never include
/// [`OrderStatus::Canceled`] orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

/// A record that lives in one of the dashboard collections.
pub trait StoredDocument: Serialize {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// Order ids in placement order; the first entry is the user's first purchase.
    #[serde(default)]
    pub orders: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product id.
    #[serde(rename = "_id")]
    pub product_id: String,
    pub amount: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    /// Buyer's user id.
    pub user: String,
    pub status: OrderStatus,
    pub total_price: f64,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub product: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

macro_rules! stored_document {
    ($ty:ty, $collection:expr) => {
        impl StoredDocument for $ty {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }
    };
}

stored_document!(User, Collection::Users);
stored_document!(Order, Collection::Orders);
stored_document!(Product, Collection::Products);
stored_document!(Comment, Collection::Comments);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_serializes_with_wire_names() {
        let order = Order {
            id: "o1".to_string(),
            user: "u1".to_string(),
            status: OrderStatus::Canceled,
            total_price: 12.5,
            items: vec![OrderItem {
                product_id: "p1".to_string(),
                amount: 2,
                price: 6.25,
            }],
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).single().expect("ts"),
        };
        let json = serde_json::to_value(&order).expect("serialize");
        assert_eq!(json["_id"], "o1");
        assert_eq!(json["status"], "CANCELED");
        assert_eq!(json["totalPrice"], 12.5);
        assert_eq!(json["items"][0]["_id"], "p1");
        assert_eq!(json["createdAt"], "2024-03-02T10:00:00Z");
    }
}
