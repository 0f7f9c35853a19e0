//! Router and handlers of the fake commerce backend.
//!
//! Responses follow the backend's JSON shapes closely enough for the real
//! HTTP client to parse them: `_id` identifiers, camelCase fields, and
//! `{ "statusMsg": "fail", "message": ... }` error bodies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::{RecordedRequest, fixtures};

/// The reset code the fake backend "emails".
pub const RESET_CODE: &str = "482913";

const DEFAULT_PAGE_SIZE: usize = 40;

pub type Shared = Arc<Mutex<BackendState>>;

#[derive(Debug, Default)]
pub struct BackendState {
    pub accounts: Vec<Account>,
    pub sessions: HashMap<String, String>,
    pub products: Vec<Value>,
    pub categories: Vec<Value>,
    pub brands: Vec<Value>,
    pub carts: HashMap<String, Cart>,
    pub wishlists: HashMap<String, Vec<String>>,
    pub addresses: HashMap<String, Vec<Value>>,
    pub orders: HashMap<String, Vec<Value>>,
    pub requests: Vec<RecordedRequest>,
    pub faults: Vec<Fault>,
    pub pending_reset: Option<PendingReset>,
    next_id: u64,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub id: String,
    pub lines: Vec<(String, u32)>,
}

#[derive(Debug, Clone)]
pub struct PendingReset {
    pub email: String,
    pub verified: bool,
}

/// A one-shot failure returned instead of the next matching request.
#[derive(Debug, Clone)]
pub struct Fault {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub message: String,
    pub retry_after: Option<u64>,
}

impl BackendState {
    /// State holding only the fixture catalog.
    pub fn seeded() -> Self {
        Self {
            products: fixtures::products(),
            categories: fixtures::categories(),
            brands: fixtures::brands(),
            ..Self::default()
        }
    }

    /// A fresh 24-hex-digit document ID.
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:024x}", self.next_id)
    }

    pub fn add_account(&mut self, name: &str, email: &str, password: &str, phone: &str) -> String {
        let id = self.next_id();
        self.accounts.push(Account {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_lowercase(),
            password: password.to_string(),
            phone: phone.to_string(),
        });
        id
    }

    fn account_by_email(&mut self, email: &str) -> Option<&mut Account> {
        let email = email.to_lowercase();
        self.accounts.iter_mut().find(|a| a.email == email)
    }

    fn account(&self, user_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == user_id)
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        self.next_id += 1;
        let token = format!("tok.{user_id}.{}", self.next_id);
        self.sessions.insert(token.clone(), user_id.to_string());
        token
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<String, Response> {
        let token = headers
            .get("token")
            .and_then(|v| v.to_str().ok())
            .or_else(|| {
                headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
            });

        match token {
            None => Err(fail(
                StatusCode::UNAUTHORIZED,
                "You are not logged in. Please login to get access",
            )),
            Some(token) => self
                .sessions
                .get(token)
                .cloned()
                .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid Token. please login again")),
        }
    }

    fn product(&self, product_id: &str) -> Option<&Value> {
        self.products.iter().find(|p| p["_id"] == product_id)
    }

    fn cart_json(&self, user_id: &str, populate: bool) -> Option<Value> {
        let cart = self.carts.get(user_id)?;
        let mut total = 0;
        let products: Vec<Value> = cart
            .lines
            .iter()
            .map(|(product_id, count)| {
                let product = self.product(product_id).cloned().unwrap_or(Value::Null);
                let price = product["price"].as_i64().unwrap_or_default();
                total += price * i64::from(*count);
                let product = if populate { product } else { json!(product_id) };
                json!({
                    "count": count,
                    "_id": format!("line{product_id}"),
                    "product": product,
                    "price": price
                })
            })
            .collect();

        Some(json!({
            "status": "success",
            "numOfCartItems": cart.lines.len(),
            "cartId": cart.id,
            "data": {
                "_id": cart.id,
                "cartOwner": user_id,
                "products": products,
                "createdAt": "2026-03-01T09:00:00.000Z",
                "updatedAt": "2026-03-01T09:00:00.000Z",
                "__v": 0,
                "totalCartPrice": total
            }
        }))
    }

    fn wishlist_ids(&self, user_id: &str) -> Vec<String> {
        self.wishlists.get(user_id).cloned().unwrap_or_default()
    }

    fn user_json(account: &Account) -> Value {
        json!({"name": account.name, "email": account.email, "role": "user"})
    }
}

pub fn lock(shared: &Shared) -> MutexGuard<'_, BackendState> {
    shared.lock().expect("fake backend state poisoned")
}

pub fn router(shared: Shared) -> Router {
    Router::new()
        .route("/api/v1/auth/signin", post(sign_in))
        .route("/api/v1/auth/signup", post(sign_up))
        .route("/api/v1/auth/verifyToken", get(verify_token))
        .route("/api/v1/auth/forgotPasswords", post(forgot_password))
        .route("/api/v1/auth/verifyResetCode", post(verify_reset_code))
        .route("/api/v1/auth/resetPassword", put(reset_password))
        .route("/api/v1/users/changeMyPassword", put(change_password))
        .route(
            "/api/v1/cart",
            get(get_cart).post(add_to_cart).delete(clear_cart),
        )
        .route(
            "/api/v1/cart/{product_id}",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/api/v1/wishlist", get(get_wishlist).post(add_to_wishlist))
        .route("/api/v1/wishlist/{product_id}", delete(remove_from_wishlist))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/{product_id}", get(get_product))
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/brands", get(list_brands))
        .route("/api/v1/orders/user/{user_id}", get(user_orders))
        .route(
            "/api/v1/orders/checkout-session/{cart_id}",
            post(checkout_session),
        )
        .route("/api/v1/orders/{cart_id}", post(create_cash_order))
        .route("/api/v1/addresses", get(list_addresses).post(add_address))
        .route("/api/v1/addresses/{address_id}", delete(remove_address))
        .layer(middleware::from_fn_with_state(
            shared.clone(),
            record_and_inject,
        ))
        .with_state(shared)
}

// =============================================================================
// Helpers
// =============================================================================

fn fail(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"statusMsg": "fail", "message": message})),
    )
        .into_response()
}

/// A validation failure carrying the detail under `errors`.
fn invalid(param: &str, msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "message": "fail",
            "errors": {"value": "", "msg": msg, "param": param, "location": "body"}
        })),
    )
        .into_response()
}

fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field].as_str().unwrap_or_default()
}

/// Records every request and serves queued faults.
async fn record_and_inject(State(shared): State<Shared>, request: Request, next: Next) -> Response {
    let fault = {
        let mut state = lock(&shared);
        let headers = request.headers();
        state.requests.push(RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            token_header: headers
                .get("token")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });

        let position = state
            .faults
            .iter()
            .position(|f| f.method == *request.method() && f.path == request.uri().path());
        position.map(|i| state.faults.remove(i))
    };

    match fault {
        Some(Fault {
            status,
            message,
            retry_after: Some(secs),
            ..
        }) => (
            status,
            [(header::RETRY_AFTER, secs.to_string())],
            Json(json!({"statusMsg": "fail", "message": message})),
        )
            .into_response(),
        Some(fault) => fail(fault.status, &fault.message),
        None => next.run(request).await,
    }
}

// =============================================================================
// Auth
// =============================================================================

async fn sign_in(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&shared);
    let password = str_field(&body, "password");
    let Some(account) = state
        .account_by_email(str_field(&body, "email"))
        .filter(|a| a.password == password)
        .cloned()
    else {
        return fail(StatusCode::UNAUTHORIZED, "Incorrect email or password");
    };

    let token = state.issue_token(&account.id);
    Json(json!({
        "message": "success",
        "user": BackendState::user_json(&account),
        "token": token
    }))
    .into_response()
}

async fn sign_up(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&shared);
    let email = str_field(&body, "email");
    let password = str_field(&body, "password");

    if password != str_field(&body, "rePassword") {
        return invalid("rePassword", "Password and rePassword not match");
    }
    if state.account_by_email(email).is_some() {
        return fail(StatusCode::CONFLICT, "Account Already Exists");
    }

    let user_id = state.add_account(
        str_field(&body, "name"),
        email,
        password,
        str_field(&body, "phone"),
    );
    let token = state.issue_token(&user_id);
    let user = state
        .account(&user_id)
        .map(BackendState::user_json)
        .unwrap_or_default();
    (
        StatusCode::CREATED,
        Json(json!({"message": "success", "user": user, "token": token})),
    )
        .into_response()
}

async fn verify_token(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let name = state.account(&user_id).map(|a| a.name.clone()).unwrap_or_default();
    Json(json!({
        "message": "verified",
        "decoded": {"id": user_id, "name": name, "role": "user", "iat": 1_772_355_600, "exp": 1_780_131_600}
    }))
    .into_response()
}

async fn forgot_password(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&shared);
    let email = str_field(&body, "email").to_lowercase();
    if state.account_by_email(&email).is_none() {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("There is no user registered with this email address {email}"),
        );
    }
    state.pending_reset = Some(PendingReset {
        email,
        verified: false,
    });
    Json(json!({"statusMsg": "success", "message": "Reset code sent to your email"})).into_response()
}

async fn verify_reset_code(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&shared);
    match state.pending_reset.as_mut() {
        Some(pending) if str_field(&body, "resetCode") == RESET_CODE => {
            pending.verified = true;
            Json(json!({"status": "Success"})).into_response()
        }
        _ => fail(StatusCode::BAD_REQUEST, "Reset code is invalid or has expired"),
    }
}

async fn reset_password(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&shared);
    let email = str_field(&body, "email").to_lowercase();
    let verified = state
        .pending_reset
        .as_ref()
        .is_some_and(|p| p.verified && p.email == email);
    if !verified {
        return fail(StatusCode::BAD_REQUEST, "reset code not verified");
    }

    let new_password = str_field(&body, "newPassword").to_string();
    let Some(account) = state.account_by_email(&email) else {
        return fail(StatusCode::NOT_FOUND, "There is no user with this email address");
    };
    account.password = new_password;
    let user_id = account.id.clone();
    state.pending_reset = None;
    let token = state.issue_token(&user_id);
    Json(json!({"token": token})).into_response()
}

async fn change_password(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if str_field(&body, "password") != str_field(&body, "rePassword") {
        return invalid("rePassword", "Password and rePassword not match");
    }

    let current = str_field(&body, "currentPassword");
    let Some(account) = state.accounts.iter_mut().find(|a| a.id == user_id) else {
        return fail(StatusCode::NOT_FOUND, "There is no user with this id");
    };
    if account.password != current {
        return invalid("currentPassword", "Incorrect current password");
    }
    account.password = str_field(&body, "password").to_string();
    let user = BackendState::user_json(account);

    // Older tokens stop working once the password changes
    state.sessions.retain(|_, owner| *owner != user_id);
    let token = state.issue_token(&user_id);
    Json(json!({"message": "success", "user": user, "token": token})).into_response()
}

// =============================================================================
// Cart
// =============================================================================

fn no_cart(user_id: &str) -> Response {
    fail(
        StatusCode::NOT_FOUND,
        &format!("No cart exist for this user: {user_id}"),
    )
}

async fn get_cart(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    state
        .cart_json(&user_id, true)
        .map_or_else(|| no_cart(&user_id), |cart| Json(cart).into_response())
}

async fn add_to_cart(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let product_id = str_field(&body, "productId").to_string();
    if state.product(&product_id).is_none() {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("No product for this id {product_id}"),
        );
    }

    if !state.carts.contains_key(&user_id) {
        let id = state.next_id();
        state.carts.insert(
            user_id.clone(),
            Cart {
                id,
                lines: Vec::new(),
            },
        );
    }
    if let Some(cart) = state.carts.get_mut(&user_id) {
        match cart.lines.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, count)) => *count += 1,
            None => cart.lines.push((product_id, 1)),
        }
    }

    let mut cart = state.cart_json(&user_id, false).unwrap_or_default();
    cart["message"] = json!("Product added successfully to your cart");
    Json(cart).into_response()
}

async fn update_cart_item(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let count = body["count"]
        .as_u64()
        .and_then(|c| u32::try_from(c).ok())
        .unwrap_or_default();

    let Some(cart) = state.carts.get_mut(&user_id) else {
        return no_cart(&user_id);
    };
    let Some(line) = cart.lines.iter_mut().find(|(id, _)| *id == product_id) else {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("there is no item for this id: {product_id}"),
        );
    };
    line.1 = count;

    Json(state.cart_json(&user_id, true).unwrap_or_default()).into_response()
}

async fn remove_cart_item(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Some(cart) = state.carts.get_mut(&user_id) else {
        return no_cart(&user_id);
    };
    cart.lines.retain(|(id, _)| *id != product_id);

    Json(state.cart_json(&user_id, true).unwrap_or_default()).into_response()
}

async fn clear_cart(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if state.carts.remove(&user_id).is_none() {
        return no_cart(&user_id);
    }
    Json(json!({"message": "success"})).into_response()
}

// =============================================================================
// Wishlist
// =============================================================================

async fn get_wishlist(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let products: Vec<Value> = state
        .wishlist_ids(&user_id)
        .iter()
        .filter_map(|id| state.product(id).cloned())
        .collect();
    Json(json!({"status": "success", "count": products.len(), "data": products})).into_response()
}

async fn add_to_wishlist(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let product_id = str_field(&body, "productId").to_string();
    if state.product(&product_id).is_none() {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("No product for this id {product_id}"),
        );
    }

    let ids = state.wishlists.entry(user_id).or_default();
    if !ids.contains(&product_id) {
        ids.push(product_id);
    }
    Json(json!({
        "status": "success",
        "message": "Product added successfully to your wishlist",
        "data": ids
    }))
    .into_response()
}

async fn remove_from_wishlist(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let ids = state.wishlists.entry(user_id).or_default();
    ids.retain(|id| *id != product_id);
    Json(json!({
        "status": "success",
        "message": "Product removed successfully to your wishlist",
        "data": ids
    }))
    .into_response()
}

// =============================================================================
// Catalog
// =============================================================================

fn listing(items: &[Value], total: usize, page: usize, limit: usize) -> Value {
    let pages = total.div_ceil(limit.max(1)).max(1);
    json!({
        "results": total,
        "metadata": {"currentPage": page, "numberOfPages": pages, "limit": limit},
        "data": items
    })
}

fn compare_field(a: &Value, b: &Value, field: &str) -> std::cmp::Ordering {
    match (a[field].as_f64(), b[field].as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => str_field(a, field).cmp(str_field(b, field)),
    }
}

async fn list_products(
    State(shared): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let state = lock(&shared);
    let param = |name: &str| params.get(name).map(String::as_str);
    let number = |name: &str| param(name).and_then(|v| v.parse::<f64>().ok());

    let mut matched: Vec<Value> = state
        .products
        .iter()
        .filter(|p| {
            param("keyword").is_none_or(|k| {
                str_field(p, "title")
                    .to_lowercase()
                    .contains(&k.to_lowercase())
            })
        })
        .filter(|p| param("category[in]").is_none_or(|c| p["category"]["_id"] == c))
        .filter(|p| param("brand").is_none_or(|b| p["brand"]["_id"] == b))
        .filter(|p| number("price[gte]").is_none_or(|min| p["price"].as_f64() >= Some(min)))
        .filter(|p| number("price[lte]").is_none_or(|max| p["price"].as_f64() <= Some(max)))
        .cloned()
        .collect();

    if let Some(sort) = param("sort") {
        let (field, descending) = sort
            .strip_prefix('-')
            .map_or((sort, false), |field| (field, true));
        matched.sort_by(|a, b| {
            let ordering = compare_field(a, b, field);
            if descending { ordering.reverse() } else { ordering }
        });
    }

    let page = param("page").and_then(|v| v.parse().ok()).unwrap_or(1_usize).max(1);
    let limit = param("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .max(1);
    let items: Vec<Value> = matched
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .cloned()
        .collect();

    Json(listing(&items, matched.len(), page, limit)).into_response()
}

async fn get_product(State(shared): State<Shared>, Path(product_id): Path<String>) -> Response {
    let state = lock(&shared);
    state.product(&product_id).map_or_else(
        || {
            fail(
                StatusCode::NOT_FOUND,
                &format!("No product for this id {product_id}"),
            )
        },
        |product| Json(json!({"data": product})).into_response(),
    )
}

async fn list_categories(State(shared): State<Shared>) -> Response {
    let state = lock(&shared);
    let total = state.categories.len();
    Json(listing(&state.categories, total, 1, DEFAULT_PAGE_SIZE)).into_response()
}

async fn list_brands(State(shared): State<Shared>) -> Response {
    let state = lock(&shared);
    let total = state.brands.len();
    Json(listing(&state.brands, total, 1, DEFAULT_PAGE_SIZE)).into_response()
}

// =============================================================================
// Orders
// =============================================================================

async fn user_orders(State(shared): State<Shared>, Path(user_id): Path<String>) -> Response {
    let state = lock(&shared);
    Json(state.orders.get(&user_id).cloned().unwrap_or_default()).into_response()
}

async fn create_cash_order(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Some(cart) = state
        .cart_json(&user_id, true)
        .filter(|c| c["cartId"] == cart_id.as_str())
    else {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("There is no such cart with id {cart_id}"),
        );
    };

    let number = state.orders.values().map(Vec::len).sum::<usize>() + 1;
    let order_id = state.next_id();
    let customer = state.account(&user_id).map_or(Value::Null, |a| {
        json!({"_id": a.id, "name": a.name, "email": a.email, "phone": a.phone})
    });
    let order = json!({
        "_id": order_id,
        "id": number,
        "user": customer,
        "cartItems": cart["data"]["products"],
        "shippingAddress": body["shippingAddress"],
        "taxPrice": 0,
        "shippingPrice": 0,
        "totalOrderPrice": cart["data"]["totalCartPrice"],
        "paymentMethodType": "cash",
        "isPaid": false,
        "isDelivered": false,
        "createdAt": format!("2026-03-01T10:{:02}:00.000Z", number % 60),
        "updatedAt": format!("2026-03-01T10:{:02}:00.000Z", number % 60),
        "__v": 0
    });

    state.carts.remove(&user_id);
    state.orders.entry(user_id).or_default().push(order.clone());
    (
        StatusCode::CREATED,
        Json(json!({"status": "success", "data": order})),
    )
        .into_response()
}

async fn checkout_session(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if state.carts.get(&user_id).is_none_or(|c| c.id != cart_id) {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("There is no such cart with id {cart_id}"),
        );
    }

    let return_url = params.get("url").cloned().unwrap_or_default();
    Json(json!({
        "status": "success",
        "session": {
            "url": format!("https://checkout.stripe.test/c/pay/cs_test_{cart_id}"),
            "success_url": format!("{return_url}/allorders"),
            "cancel_url": format!("{return_url}/cart")
        }
    }))
    .into_response()
}

// =============================================================================
// Addresses
// =============================================================================

fn address_book(state: &BackendState, user_id: &str, message: Option<&str>) -> Response {
    let data = state.addresses.get(user_id).cloned().unwrap_or_default();
    let mut body = json!({"results": data.len(), "status": "success", "data": data});
    if let Some(message) = message {
        body["message"] = json!(message);
    }
    Json(body).into_response()
}

async fn list_addresses(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&shared);
    match state.authenticate(&headers) {
        Ok(user_id) => address_book(&state, &user_id, None),
        Err(response) => response,
    }
}

async fn add_address(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let id = state.next_id();
    let address = json!({
        "_id": id,
        "name": str_field(&body, "name"),
        "details": str_field(&body, "details"),
        "phone": str_field(&body, "phone"),
        "city": str_field(&body, "city")
    });
    state.addresses.entry(user_id.clone()).or_default().push(address);
    address_book(&state, &user_id, Some("Address added successfully"))
}

async fn remove_address(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(address_id): Path<String>,
) -> Response {
    let mut state = lock(&shared);
    let user_id = match state.authenticate(&headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if let Some(book) = state.addresses.get_mut(&user_id) {
        book.retain(|a| a["_id"] != address_id.as_str());
    }
    address_book(&state, &user_id, Some("Address removed successfully"))
}
