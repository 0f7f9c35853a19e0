//! Orders and addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AddressId, CartLineId, OrderId, UserId};
use super::price::Price;
use super::cart::ProductRef;
use super::status::{FulfillmentState, PaymentMethod};

/// Shipping details attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Street and building details.
    pub details: String,
    /// Contact phone number.
    pub phone: String,
    /// City.
    pub city: String,
}

/// A saved address in the user's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Address ID.
    #[serde(rename = "_id")]
    pub id: AddressId,
    /// Label (e.g., "Home").
    pub name: String,
    /// Street and building details.
    pub details: String,
    /// Contact phone number.
    pub phone: String,
    /// City.
    pub city: String,
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            details: address.details.clone(),
            phone: address.phone.clone(),
            city: address.city.clone(),
        }
    }
}

/// Input for creating a saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    /// Label (e.g., "Home").
    pub name: String,
    /// Street and building details.
    pub details: String,
    /// Contact phone number.
    pub phone: String,
    /// City.
    pub city: String,
}

/// Customer summary embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    /// User ID.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email as stored by the backend (not re-validated).
    #[serde(default)]
    pub email: String,
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// An order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Line ID.
    #[serde(rename = "_id")]
    pub id: CartLineId,
    /// Units ordered.
    pub count: u32,
    /// Ordered product.
    pub product: ProductRef,
    /// Unit price at order time.
    pub price: Price,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order document ID.
    #[serde(rename = "_id")]
    pub id: OrderId,
    /// Human-facing order number.
    #[serde(rename = "id", default)]
    pub number: Option<u64>,
    /// Ordering customer.
    pub user: Option<OrderCustomer>,
    /// Ordered lines.
    #[serde(default)]
    pub cart_items: Vec<OrderItem>,
    /// Shipping details.
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    /// Backend-reported order total.
    pub total_order_price: Price,
    /// Payment method.
    pub payment_method_type: PaymentMethod,
    /// Whether payment was captured.
    #[serde(default)]
    pub is_paid: bool,
    /// Whether the order was delivered.
    #[serde(default)]
    pub is_delivered: bool,
    /// Placement timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Coarse lifecycle state derived from the paid/delivered flags.
    #[must_use]
    pub const fn state(&self) -> FulfillmentState {
        FulfillmentState::from_flags(self.payment_method_type, self.is_paid, self.is_delivered)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_backend_order() {
        let order: Order = serde_json::from_str(
            r#"{
                "shippingAddress": {"details": "12 Nile St", "phone": "01010700999", "city": "Cairo"},
                "taxPrice": 0,
                "shippingPrice": 0,
                "totalOrderPrice": 298,
                "paymentMethodType": "cash",
                "isPaid": false,
                "isDelivered": false,
                "_id": "6657a2",
                "user": {"_id": "u1", "name": "Jane", "email": "jane@example.com", "phone": "01010700999"},
                "cartItems": [{"count": 2, "_id": "l1", "product": "p1", "price": 149}],
                "createdAt": "2024-05-29T21:47:02.593Z",
                "id": 4123
            }"#,
        )
        .unwrap();

        assert_eq!(order.number, Some(4123));
        assert_eq!(order.total_order_price, Price::from_units(298));
        assert_eq!(order.cart_items.len(), 1);
        assert_eq!(order.state(), FulfillmentState::AwaitingDelivery);
    }
}
