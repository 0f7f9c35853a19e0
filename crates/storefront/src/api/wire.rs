//! Backend JSON payloads and their conversion to domain types.
//!
//! These mirror the backend's response shapes exactly; nothing outside the
//! `api` module sees them.

use serde::{Deserialize, Serialize};

use bazaar_core::{
    Address, CartId, CartLine, CartLineId, CartSnapshot, Order, Price, Product, ProductId,
    ProductRef, UserId,
};

use super::{AccountUser, ProductPage, TokenClaims};

// =============================================================================
// Error Bodies
// =============================================================================

/// Error body: `{ "statusMsg": "fail", "message": "..." }`, sometimes with a
/// validation detail under `errors`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<ValidationError>,
}

#[derive(Debug, Deserialize)]
struct ValidationError {
    msg: String,
}

impl ErrorBody {
    /// The most specific message in the body.
    pub(super) fn into_message(self) -> Option<String> {
        self.errors
            .map(|e| e.msg)
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
    }
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Serialize)]
pub(super) struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SignUpRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub re_password: &'a str,
    pub phone: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireUser {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: String,
}

impl From<WireUser> for AccountUser {
    fn from(user: WireUser) -> Self {
        Self {
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct VerifyTokenResponse {
    pub decoded: DecodedToken,
}

#[derive(Debug, Deserialize)]
pub(super) struct DecodedToken {
    id: UserId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    role: String,
}

impl From<DecodedToken> for TokenClaims {
    fn from(decoded: DecodedToken) -> Self {
        Self {
            user_id: decoded.id,
            name: decoded.name,
            role: decoded.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VerifyResetCodeRequest<'a> {
    pub reset_code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ResetPasswordRequest<'a> {
    pub email: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub password: &'a str,
    pub re_password: &'a str,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductIdRequest<'a> {
    pub product_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct CountRequest {
    pub count: u32,
}

/// Cart responses: the item count sits beside the cart, not inside it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CartEnvelope {
    #[serde(default)]
    num_of_cart_items: u32,
    #[serde(default)]
    cart_id: Option<CartId>,
    data: WireCart,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCart {
    #[serde(rename = "_id")]
    id: CartId,
    #[serde(default)]
    cart_owner: Option<UserId>,
    #[serde(default)]
    products: Vec<WireCartLine>,
    total_cart_price: Price,
}

#[derive(Debug, Deserialize)]
struct WireCartLine {
    #[serde(rename = "_id")]
    id: CartLineId,
    count: u32,
    product: ProductRef,
    price: Price,
}

impl From<CartEnvelope> for CartSnapshot {
    fn from(envelope: CartEnvelope) -> Self {
        let cart = envelope.data;
        Self {
            id: envelope.cart_id.unwrap_or(cart.id),
            owner: cart.cart_owner,
            items: cart
                .products
                .into_iter()
                .map(|line| CartLine {
                    item_id: line.id,
                    product: line.product,
                    unit_price: line.price,
                    quantity: line.count,
                })
                .collect(),
            total_price: cart.total_cart_price,
            item_count: envelope.num_of_cart_items,
        }
    }
}

// =============================================================================
// Wishlist
// =============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct ProductsEnvelope {
    #[serde(default)]
    pub data: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub(super) struct IdsEnvelope {
    #[serde(default)]
    pub data: Vec<ProductId>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProductListResponse {
    #[serde(default)]
    results: u32,
    #[serde(default)]
    metadata: Option<PageMetadata>,
    #[serde(default)]
    data: Vec<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMetadata {
    current_page: u32,
    number_of_pages: u32,
}

impl From<ProductListResponse> for ProductPage {
    fn from(response: ProductListResponse) -> Self {
        let (page, total_pages) = response
            .metadata
            .map_or((1, 1), |m| (m.current_page, m.number_of_pages));
        Self {
            products: response.data,
            page,
            total_pages,
            total_results: response.results,
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OrderRequest<'a> {
    pub shipping_address: &'a bazaar_core::ShippingAddress,
}

#[derive(Debug, Deserialize)]
pub(super) struct CheckoutResponse {
    pub session: CheckoutSessionBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct CheckoutSessionBody {
    pub url: String,
}

pub(super) type OrderEnvelope = DataEnvelope<Order>;
pub(super) type AddressesEnvelope = DataEnvelope<Vec<Address>>;
