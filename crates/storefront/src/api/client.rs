//! HTTP implementation of every backend port.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use bazaar_core::{
    Address, AddressId, Brand, CartId, CartSnapshot, Category, Email, NewAddress, Order, Product,
    ProductId, ShippingAddress, UserId,
};

use super::wire::{
    AddressesEnvelope, AuthResponse, CartEnvelope, ChangePasswordRequest, CheckoutResponse,
    CountRequest, DataEnvelope, ErrorBody, ForgotPasswordRequest, IdsEnvelope, MessageResponse,
    OrderEnvelope, OrderRequest, ProductIdRequest, ProductListResponse, ProductsEnvelope,
    ResetPasswordRequest, SignInRequest, SignUpRequest, VerifyResetCodeRequest,
    VerifyTokenResponse,
};
use super::{
    ApiError, ApiResult, AuthApi, AuthSession, CartApi, CatalogApi, CheckoutSession, Credentials,
    OrdersApi, PasswordApi, PasswordChange, ProductPage, ProductQuery, Registration, TokenClaims,
    WishlistApi,
};
use crate::config::{ApiConfig, AuthScheme};
use crate::session::SessionToken;

/// Longest body excerpt written to the log.
const LOG_BODY_CHARS: usize = 500;

// =============================================================================
// HttpApiClient
// =============================================================================

/// Client for the commerce backend REST API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HttpApiClient {
    inner: Arc<HttpApiClientInner>,
}

struct HttpApiClientInner {
    client: reqwest::Client,
    api_root: Url,
    auth_scheme: AuthScheme,
}

impl HttpApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built, or
    /// `ApiError::Url` if the base URL cannot be extended.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let mut base = config.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(HttpApiClientInner {
                client: builder.build()?,
                api_root: base.join("api/v1/")?,
                auth_scheme: config.auth_scheme,
            }),
        })
    }

    /// Absolute URL for a path under `/api/v1/`.
    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.inner.api_root.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, url: Url, token: Option<&SessionToken>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match (token, self.inner.auth_scheme) {
            (None, _) => builder,
            (Some(token), AuthScheme::Bearer) => builder.bearer_auth(token.expose()),
            (Some(token), AuthScheme::TokenHeader) => builder.header("token", token.expose()),
        }
    }

    /// Send a request and decode the JSON response.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&response_text)
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });

            debug!(
                status = %status,
                body = %response_text.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Backend returned non-success status"
            );

            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                _ => ApiError::Backend {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("api_root", &self.inner.api_root.as_str())
            .field("auth_scheme", &self.inner.auth_scheme)
            .finish_non_exhaustive()
    }
}

fn require_token(response: AuthResponse) -> ApiResult<AuthSession> {
    let token = response
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Backend {
            status: StatusCode::OK.as_u16(),
            message: "response did not include a session token".to_string(),
        })?;
    Ok(AuthSession {
        token: SessionToken::new(token),
        user: response.user.map(Into::into),
    })
}

// =============================================================================
// Auth
// =============================================================================

#[async_trait]
impl AuthApi for HttpApiClient {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<AuthSession> {
        let body = SignInRequest {
            email: credentials.email.as_str(),
            password: credentials.password.expose_secret(),
        };
        let request = self
            .request(Method::POST, self.endpoint("auth/signin")?, None)
            .json(&body);
        require_token(self.execute(request).await?)
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn sign_up(&self, registration: &Registration) -> ApiResult<AuthSession> {
        let password = registration.password.expose_secret();
        let body = SignUpRequest {
            name: &registration.name,
            email: registration.email.as_str(),
            password,
            re_password: password,
            phone: &registration.phone,
        };
        let request = self
            .request(Method::POST, self.endpoint("auth/signup")?, None)
            .json(&body);
        require_token(self.execute(request).await?)
    }

    #[instrument(skip(self, token))]
    async fn verify_token(&self, token: &SessionToken) -> ApiResult<TokenClaims> {
        let request = self.request(Method::GET, self.endpoint("auth/verifyToken")?, Some(token));
        let response: VerifyTokenResponse = self.execute(request).await?;
        Ok(response.decoded.into())
    }
}

// =============================================================================
// Password
// =============================================================================

#[async_trait]
impl PasswordApi for HttpApiClient {
    #[instrument(skip(self), fields(email = %email))]
    async fn forgot_password(&self, email: &Email) -> ApiResult<String> {
        let request = self
            .request(Method::POST, self.endpoint("auth/forgotPasswords")?, None)
            .json(&ForgotPasswordRequest {
                email: email.as_str(),
            });
        let response: MessageResponse = self.execute(request).await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Reset code sent to your email".to_string()))
    }

    #[instrument(skip(self, code))]
    async fn verify_reset_code(&self, code: &str) -> ApiResult<()> {
        let request = self
            .request(Method::POST, self.endpoint("auth/verifyResetCode")?, None)
            .json(&VerifyResetCodeRequest { reset_code: code });
        let _: serde_json::Value = self.execute(request).await?;
        Ok(())
    }

    #[instrument(skip(self, new_password), fields(email = %email))]
    async fn reset_password(
        &self,
        email: &Email,
        new_password: &SecretString,
    ) -> ApiResult<SessionToken> {
        let request = self
            .request(Method::PUT, self.endpoint("auth/resetPassword")?, None)
            .json(&ResetPasswordRequest {
                email: email.as_str(),
                new_password: new_password.expose_secret(),
            });
        Ok(require_token(self.execute(request).await?)?.token)
    }

    #[instrument(skip(self, token, change))]
    async fn change_password(
        &self,
        token: &SessionToken,
        change: &PasswordChange,
    ) -> ApiResult<SessionToken> {
        let new_password = change.new.expose_secret();
        let request = self
            .request(
                Method::PUT,
                self.endpoint("users/changeMyPassword")?,
                Some(token),
            )
            .json(&ChangePasswordRequest {
                current_password: change.current.expose_secret(),
                password: new_password,
                re_password: new_password,
            });
        Ok(require_token(self.execute(request).await?)?.token)
    }
}

// =============================================================================
// Cart
// =============================================================================

#[async_trait]
impl CartApi for HttpApiClient {
    #[instrument(skip(self, token))]
    async fn get_cart(&self, token: &SessionToken) -> ApiResult<CartSnapshot> {
        let request = self.request(Method::GET, self.endpoint("cart")?, Some(token));
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.into())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn add_to_cart(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> ApiResult<CartSnapshot> {
        let request = self
            .request(Method::POST, self.endpoint("cart")?, Some(token))
            .json(&ProductIdRequest {
                product_id: product_id.as_str(),
            });
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.into())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn update_cart_item(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
        count: u32,
    ) -> ApiResult<CartSnapshot> {
        let url = self.endpoint(&format!("cart/{product_id}"))?;
        let request = self
            .request(Method::PUT, url, Some(token))
            .json(&CountRequest { count });
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.into())
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> ApiResult<CartSnapshot> {
        let url = self.endpoint(&format!("cart/{product_id}"))?;
        let request = self.request(Method::DELETE, url, Some(token));
        let envelope: CartEnvelope = self.execute(request).await?;
        Ok(envelope.into())
    }

    #[instrument(skip(self, token))]
    async fn clear_cart(&self, token: &SessionToken) -> ApiResult<()> {
        let request = self.request(Method::DELETE, self.endpoint("cart")?, Some(token));
        let _: MessageResponse = self.execute(request).await?;
        Ok(())
    }
}

// =============================================================================
// Wishlist
// =============================================================================

#[async_trait]
impl WishlistApi for HttpApiClient {
    #[instrument(skip(self, token))]
    async fn get_wishlist(&self, token: &SessionToken) -> ApiResult<Vec<Product>> {
        let request = self.request(Method::GET, self.endpoint("wishlist")?, Some(token));
        let envelope: ProductsEnvelope = self.execute(request).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn add_to_wishlist(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> ApiResult<Vec<ProductId>> {
        let request = self
            .request(Method::POST, self.endpoint("wishlist")?, Some(token))
            .json(&ProductIdRequest {
                product_id: product_id.as_str(),
            });
        let envelope: IdsEnvelope = self.execute(request).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self, token), fields(product_id = %product_id))]
    async fn remove_from_wishlist(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> ApiResult<Vec<ProductId>> {
        let url = self.endpoint(&format!("wishlist/{product_id}"))?;
        let request = self.request(Method::DELETE, url, Some(token));
        let envelope: IdsEnvelope = self.execute(request).await?;
        Ok(envelope.data)
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl CatalogApi for HttpApiClient {
    #[instrument(skip(self), fields(keyword = ?query.keyword, page = ?query.page))]
    async fn list_products(&self, query: &ProductQuery) -> ApiResult<ProductPage> {
        let mut url = self.endpoint("products")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(keyword) = query.keyword.as_deref().map(str::trim)
                && !keyword.is_empty()
            {
                pairs.append_pair("keyword", keyword);
            }
            if let Some(category) = &query.category {
                pairs.append_pair("category[in]", category.as_str());
            }
            if let Some(brand) = &query.brand {
                pairs.append_pair("brand", brand.as_str());
            }
            if let Some(sort) = query.sort {
                pairs.append_pair("sort", sort.as_query());
            }
            if let Some(min) = query.min_price {
                pairs.append_pair("price[gte]", &min.amount().to_string());
            }
            if let Some(max) = query.max_price {
                pairs.append_pair("price[lte]", &max.amount().to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let request = self.request(Method::GET, url, None);
        let response: ProductListResponse = self.execute(request).await?;
        Ok(response.into())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn get_product(&self, product_id: &ProductId) -> ApiResult<Product> {
        let url = self.endpoint(&format!("products/{product_id}"))?;
        let envelope: DataEnvelope<Product> =
            self.execute(self.request(Method::GET, url, None)).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        let url = self.endpoint("categories")?;
        let envelope: DataEnvelope<Vec<Category>> =
            self.execute(self.request(Method::GET, url, None)).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    async fn list_brands(&self) -> ApiResult<Vec<Brand>> {
        let url = self.endpoint("brands")?;
        let envelope: DataEnvelope<Vec<Brand>> =
            self.execute(self.request(Method::GET, url, None)).await?;
        Ok(envelope.data)
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrdersApi for HttpApiClient {
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    async fn user_orders(&self, token: &SessionToken, user_id: &UserId) -> ApiResult<Vec<Order>> {
        let url = self.endpoint(&format!("orders/user/{user_id}"))?;
        self.execute(self.request(Method::GET, url, Some(token)))
            .await
    }

    #[instrument(skip(self, token, shipping), fields(cart_id = %cart_id))]
    async fn create_cash_order(
        &self,
        token: &SessionToken,
        cart_id: &CartId,
        shipping: &ShippingAddress,
    ) -> ApiResult<Order> {
        let url = self.endpoint(&format!("orders/{cart_id}"))?;
        let request = self
            .request(Method::POST, url, Some(token))
            .json(&OrderRequest {
                shipping_address: shipping,
            });
        let envelope: OrderEnvelope = self.execute(request).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self, token, shipping), fields(cart_id = %cart_id))]
    async fn create_checkout_session(
        &self,
        token: &SessionToken,
        cart_id: &CartId,
        shipping: &ShippingAddress,
        return_url: &str,
    ) -> ApiResult<CheckoutSession> {
        let mut url = self.endpoint(&format!("orders/checkout-session/{cart_id}"))?;
        url.query_pairs_mut().append_pair("url", return_url);
        let request = self
            .request(Method::POST, url, Some(token))
            .json(&OrderRequest {
                shipping_address: shipping,
            });
        let response: CheckoutResponse = self.execute(request).await?;
        Ok(CheckoutSession {
            url: response.session.url,
        })
    }

    #[instrument(skip(self, token))]
    async fn list_addresses(&self, token: &SessionToken) -> ApiResult<Vec<Address>> {
        let url = self.endpoint("addresses")?;
        let envelope: AddressesEnvelope =
            self.execute(self.request(Method::GET, url, Some(token))).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self, token, address), fields(name = %address.name))]
    async fn add_address(
        &self,
        token: &SessionToken,
        address: &NewAddress,
    ) -> ApiResult<Vec<Address>> {
        let request = self
            .request(Method::POST, self.endpoint("addresses")?, Some(token))
            .json(address);
        let envelope: AddressesEnvelope = self.execute(request).await?;
        Ok(envelope.data)
    }

    #[instrument(skip(self, token), fields(address_id = %address_id))]
    async fn remove_address(
        &self,
        token: &SessionToken,
        address_id: &AddressId,
    ) -> ApiResult<Vec<Address>> {
        let url = self.endpoint(&format!("addresses/{address_id}"))?;
        let envelope: AddressesEnvelope = self
            .execute(self.request(Method::DELETE, url, Some(token)))
            .await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpApiClient {
        HttpApiClient::new(&ApiConfig {
            base_url: Url::parse(base).unwrap(),
            auth_scheme: AuthScheme::Bearer,
            request_timeout: None,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoints_live_under_api_v1() {
        let client = client("https://shop.example.com");
        assert_eq!(
            client.endpoint("cart").unwrap().as_str(),
            "https://shop.example.com/api/v1/cart"
        );
        assert_eq!(
            client.endpoint("/wishlist/p1").unwrap().as_str(),
            "https://shop.example.com/api/v1/wishlist/p1"
        );
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let client = client("http://127.0.0.1:8080/backend");
        assert_eq!(
            client.endpoint("products").unwrap().as_str(),
            "http://127.0.0.1:8080/backend/api/v1/products"
        );
    }

    #[test]
    fn test_missing_token_is_backend_error() {
        let response = AuthResponse {
            token: None,
            user: None,
        };
        assert!(matches!(
            require_token(response),
            Err(ApiError::Backend { status: 200, .. })
        ));
    }
}
