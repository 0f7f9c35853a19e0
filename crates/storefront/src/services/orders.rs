//! Order history, checkout and the address book.

use std::cmp::Reverse;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use bazaar_core::{Address, AddressId, CartSnapshot, NewAddress, Order, ShippingAddress};

use crate::api::{ApiError, AuthApi, CheckoutSession, OrdersApi};
use crate::services::cart::{CartError, CartSync};
use crate::session::{SessionToken, TokenState};

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The operation needs a session token.
    #[error("not signed in")]
    NotAuthenticated,

    /// There is nothing in the cart to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// Refreshing the cart before checkout failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Orders and addresses for the signed-in user.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrdersApi>,
    auth: Arc<dyn AuthApi>,
    tokens: TokenState,
    cart: CartSync,
}

impl OrderService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrdersApi>,
        auth: Arc<dyn AuthApi>,
        tokens: TokenState,
        cart: CartSync,
    ) -> Self {
        Self {
            orders,
            auth,
            tokens,
            cart,
        }
    }

    fn token(&self) -> Result<SessionToken, OrderError> {
        self.tokens.current().ok_or(OrderError::NotAuthenticated)
    }

    /// Orders placed by the signed-in user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthenticated` when signed out, or a backend
    /// error.
    #[instrument(skip(self))]
    pub async fn history(&self) -> Result<Vec<Order>, OrderError> {
        let token = self.token()?;
        let claims = self.auth.verify_token(&token).await?;
        let mut orders = self.orders.user_orders(&token, &claims.user_id).await?;
        orders.sort_by_key(|o| Reverse(o.created_at));
        Ok(orders)
    }

    /// Place a cash-on-delivery order for the current cart.
    ///
    /// The backend consumes the cart, so the local snapshot is dropped.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` if there is nothing to order.
    #[instrument(skip(self, shipping))]
    pub async fn checkout_cash(&self, shipping: &ShippingAddress) -> Result<Order, OrderError> {
        let token = self.token()?;
        let cart = self.current_cart().await?;

        let order = self
            .orders
            .create_cash_order(&token, &cart.id, shipping)
            .await?;
        self.cart.reset_local();

        info!(order_id = %order.id, total = %order.total_order_price, "Placed cash order");
        Ok(order)
    }

    /// Start a hosted card checkout for the current cart.
    ///
    /// The cart is kept until payment completes on the backend.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` if there is nothing to order.
    #[instrument(skip(self, shipping))]
    pub async fn checkout_online(
        &self,
        shipping: &ShippingAddress,
        return_url: &str,
    ) -> Result<CheckoutSession, OrderError> {
        let token = self.token()?;
        let cart = self.current_cart().await?;

        Ok(self
            .orders
            .create_checkout_session(&token, &cart.id, shipping, return_url)
            .await?)
    }

    /// Saved addresses.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthenticated` or a backend error.
    pub async fn addresses(&self) -> Result<Vec<Address>, OrderError> {
        let token = self.token()?;
        Ok(self.orders.list_addresses(&token).await?)
    }

    /// Save an address. Returns the updated address book.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthenticated` or a backend error.
    #[instrument(skip(self, address), fields(name = %address.name))]
    pub async fn add_address(&self, address: &NewAddress) -> Result<Vec<Address>, OrderError> {
        let token = self.token()?;
        Ok(self.orders.add_address(&token, address).await?)
    }

    /// Delete an address. Returns the updated address book.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthenticated` or a backend error.
    #[instrument(skip(self), fields(address_id = %address_id))]
    pub async fn remove_address(&self, address_id: &AddressId) -> Result<Vec<Address>, OrderError> {
        let token = self.token()?;
        Ok(self.orders.remove_address(&token, address_id).await?)
    }

    /// The local cart, fetched first if nothing is loaded yet.
    async fn current_cart(&self) -> Result<CartSnapshot, OrderError> {
        let cart = match self.cart.snapshot().cart {
            Some(cart) => Some(cart),
            None => self.cart.get_cart().await?,
        };
        cart.filter(|c| !c.is_empty()).ok_or(OrderError::EmptyCart)
    }
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use bazaar_core::{
        CartId, CartLine, CartLineId, OrderId, PaymentMethod, Price, ProductId, ProductRef,
        UserId,
    };

    use super::*;
    use crate::api::{
        ApiResult, AuthSession, CartApi, Credentials, Registration, TokenClaims,
    };
    use crate::storage::KeyValueStore;

    /// One fake backend for auth, cart and orders.
    #[derive(Default)]
    struct FakeBackend {
        cart_lines: Mutex<u32>,
        placed: Mutex<Vec<(CartId, ShippingAddress)>>,
        addresses: Mutex<Vec<Address>>,
    }

    fn order(id: &str, created: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "totalOrderPrice": 100,
            "paymentMethodType": "cash",
            "createdAt": created,
        }))
        .unwrap()
    }

    #[async_trait]
    impl AuthApi for FakeBackend {
        async fn sign_in(&self, _credentials: &Credentials) -> ApiResult<AuthSession> {
            unreachable!()
        }

        async fn sign_up(&self, _registration: &Registration) -> ApiResult<AuthSession> {
            unreachable!()
        }

        async fn verify_token(&self, _token: &SessionToken) -> ApiResult<TokenClaims> {
            Ok(TokenClaims {
                user_id: UserId::new("user-1"),
                name: "Mona".to_string(),
                role: "user".to_string(),
            })
        }
    }

    #[async_trait]
    impl CartApi for FakeBackend {
        async fn get_cart(&self, _token: &SessionToken) -> ApiResult<CartSnapshot> {
            let lines = *self.cart_lines.lock().unwrap();
            if lines == 0 {
                return Err(ApiError::NotFound("No cart exist for this user".to_string()));
            }
            Ok(CartSnapshot {
                id: CartId::new("cart-1"),
                owner: Some(UserId::new("user-1")),
                items: (0..lines)
                    .map(|i| CartLine {
                        item_id: CartLineId::new(format!("l{i}")),
                        product: ProductRef::Id(ProductId::new(format!("p{i}"))),
                        unit_price: Price::from_units(50),
                        quantity: 1,
                    })
                    .collect(),
                total_price: Price::from_units(i64::from(lines) * 50),
                item_count: lines,
            })
        }

        async fn add_to_cart(&self, _: &SessionToken, _: &ProductId) -> ApiResult<CartSnapshot> {
            unreachable!()
        }

        async fn update_cart_item(
            &self,
            _: &SessionToken,
            _: &ProductId,
            _: u32,
        ) -> ApiResult<CartSnapshot> {
            unreachable!()
        }

        async fn remove_cart_item(&self, _: &SessionToken, _: &ProductId) -> ApiResult<CartSnapshot> {
            unreachable!()
        }

        async fn clear_cart(&self, _: &SessionToken) -> ApiResult<()> {
            unreachable!()
        }
    }

    #[async_trait]
    impl OrdersApi for FakeBackend {
        async fn user_orders(&self, _token: &SessionToken, user_id: &UserId) -> ApiResult<Vec<Order>> {
            assert_eq!(user_id.as_str(), "user-1");
            Ok(vec![
                order("o1", "2024-01-05T10:00:00Z"),
                order("o2", "2024-03-01T10:00:00Z"),
            ])
        }

        async fn create_cash_order(
            &self,
            _token: &SessionToken,
            cart_id: &CartId,
            shipping: &ShippingAddress,
        ) -> ApiResult<Order> {
            self.placed
                .lock()
                .unwrap()
                .push((cart_id.clone(), shipping.clone()));
            *self.cart_lines.lock().unwrap() = 0;
            Ok(order("o3", "2024-04-01T10:00:00Z"))
        }

        async fn create_checkout_session(
            &self,
            _token: &SessionToken,
            cart_id: &CartId,
            _shipping: &ShippingAddress,
            return_url: &str,
        ) -> ApiResult<CheckoutSession> {
            Ok(CheckoutSession {
                url: format!("https://checkout.example.com/{cart_id}?return={return_url}"),
            })
        }

        async fn list_addresses(&self, _token: &SessionToken) -> ApiResult<Vec<Address>> {
            Ok(self.addresses.lock().unwrap().clone())
        }

        async fn add_address(&self, _token: &SessionToken, address: &NewAddress) -> ApiResult<Vec<Address>> {
            let mut addresses = self.addresses.lock().unwrap();
            let next = addresses.len() + 1;
            addresses.push(Address {
                id: AddressId::new(format!("a{next}")),
                name: address.name.clone(),
                details: address.details.clone(),
                phone: address.phone.clone(),
                city: address.city.clone(),
            });
            Ok(addresses.clone())
        }

        async fn remove_address(&self, _token: &SessionToken, address_id: &AddressId) -> ApiResult<Vec<Address>> {
            let mut addresses = self.addresses.lock().unwrap();
            addresses.retain(|a| &a.id != address_id);
            Ok(addresses.clone())
        }
    }

    fn shipping() -> ShippingAddress {
        ShippingAddress {
            details: "12 Tahrir St".to_string(),
            phone: "01012345678".to_string(),
            city: "Cairo".to_string(),
        }
    }

    fn setup(lines: u32, signed_in: bool) -> (OrderService, CartSync, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::default());
        *backend.cart_lines.lock().unwrap() = lines;
        let tokens = TokenState::load(KeyValueStore::in_memory());
        if signed_in {
            tokens.set(SessionToken::new("token"));
        }
        let cart = CartSync::new(backend.clone(), tokens.clone());
        let orders = OrderService::new(backend.clone(), backend.clone(), tokens, cart.clone());
        (orders, cart, backend)
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let (orders, _, _) = setup(0, true);
        let history = orders.history().await.unwrap();
        let ids: Vec<&OrderId> = history.iter().map(|o| &o.id).collect();
        assert_eq!(ids, [&OrderId::new("o2"), &OrderId::new("o1")]);
        assert_eq!(history.first().unwrap().payment_method_type, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_signed_out_is_rejected() {
        let (orders, _, _) = setup(2, false);
        assert!(matches!(orders.history().await, Err(OrderError::NotAuthenticated)));
        assert!(matches!(
            orders.checkout_cash(&shipping()).await,
            Err(OrderError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_cash_checkout_consumes_cart() {
        let (orders, cart, backend) = setup(2, true);
        cart.get_cart().await.unwrap();

        let order = orders.checkout_cash(&shipping()).await.unwrap();
        assert_eq!(order.id.as_str(), "o3");
        assert!(cart.snapshot().cart.is_none());

        let placed = backend.placed.lock().unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed.first().unwrap().0.as_str(), "cart-1");
    }

    #[tokio::test]
    async fn test_checkout_fetches_cart_when_not_loaded() {
        let (orders, cart, _) = setup(1, true);
        let session = orders
            .checkout_online(&shipping(), "http://localhost:3000")
            .await
            .unwrap();
        assert!(session.url.contains("cart-1"));
        assert!(cart.snapshot().cart.is_some());
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_check_out() {
        let (orders, _, backend) = setup(0, true);
        assert!(matches!(
            orders.checkout_cash(&shipping()).await,
            Err(OrderError::EmptyCart)
        ));
        assert!(backend.placed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_address_book() {
        let (orders, _, _) = setup(0, true);
        let book = orders
            .add_address(&NewAddress {
                name: "Home".to_string(),
                details: "12 Tahrir St".to_string(),
                phone: "01012345678".to_string(),
                city: "Cairo".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(book.len(), 1);

        let shipping = ShippingAddress::from(book.first().unwrap());
        assert_eq!(shipping.city, "Cairo");

        let book = orders.remove_address(&AddressId::new("a1")).await.unwrap();
        assert!(book.is_empty());
        assert!(orders.addresses().await.unwrap().is_empty());
    }
}
