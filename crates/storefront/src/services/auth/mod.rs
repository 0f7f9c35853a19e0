//! Authentication service.
//!
//! Provides email/password account flows and federated sign-in
//! reconciliation. Every flow that yields a session token stores it in
//! [`TokenState`], which persists it and notifies the cart and wishlist.

mod error;
mod social;

pub use error::{AccountError, SocialAuthError};
pub use social::{FederatedIdentity, IdentityProvider, SocialAuth, derive_password, derive_phone};

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use bazaar_core::Email;

use crate::api::{
    ApiError, AuthApi, AuthSession, Credentials, PasswordApi, PasswordChange, Registration,
    TokenClaims,
};
use crate::session::TokenState;

/// Shortest password the backend accepts, after the leading capital.
const MIN_PASSWORD_TAIL: usize = 5;

/// Longest password the backend accepts, after the leading capital.
const MAX_PASSWORD_TAIL: usize = 10;

/// Email/password account service.
#[derive(Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthApi>,
    passwords: Arc<dyn PasswordApi>,
    tokens: TokenState,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthApi>, passwords: Arc<dyn PasswordApi>, tokens: TokenState) -> Self {
        Self {
            auth,
            passwords,
            tokens,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail` if the email format is invalid.
    /// Returns `AccountError::InvalidCredentials` if the backend rejects the
    /// email/password pair.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> Result<AuthSession, AccountError> {
        let credentials = Credentials {
            email: Email::parse(email)?,
            password,
        };

        let session = self
            .auth
            .sign_in(&credentials)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(_) => AccountError::InvalidCredentials,
                other => AccountError::Api(other),
            })?;

        self.tokens.set(session.token.clone());
        info!(email = %credentials.email, "Signed in");
        Ok(session)
    }

    /// Register a new account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail`, `WeakPassword` or `InvalidPhone`
    /// if a field fails validation, without a network call.
    /// Returns `AccountError::UserAlreadyExists` if the email is taken.
    #[instrument(skip(self, password, phone))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: SecretString,
        phone: &str,
    ) -> Result<AuthSession, AccountError> {
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;
        validate_phone(phone)?;

        let name = name.trim();
        let registration = Registration {
            name: if name.is_empty() {
                email.local_part().to_string()
            } else {
                name.to_string()
            },
            email,
            password,
            phone: phone.to_string(),
        };

        let session = self.auth.sign_up(&registration).await.map_err(|e| {
            if e.is_account_conflict() {
                AccountError::UserAlreadyExists
            } else {
                AccountError::Api(e)
            }
        })?;

        self.tokens.set(session.token.clone());
        info!(email = %registration.email, "Registered account");
        Ok(session)
    }

    /// Forget the session token.
    ///
    /// Returns false if the token could not be removed from storage.
    pub fn logout(&self) -> bool {
        self.tokens.clear()
    }

    /// Ask the backend who the current token belongs to.
    ///
    /// Returns `Ok(None)` when signed out.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Api` if the backend rejects the token.
    pub async fn whoami(&self) -> Result<Option<TokenClaims>, AccountError> {
        let Some(token) = self.tokens.current() else {
            return Ok(None);
        };
        Ok(Some(self.auth.verify_token(&token).await?))
    }

    // =========================================================================
    // Password Recovery
    // =========================================================================

    /// Email a reset code.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail` or a backend error.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<String, AccountError> {
        let email = Email::parse(email)?;
        Ok(self.passwords.forgot_password(&email).await?)
    }

    /// Check an emailed reset code.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the code is wrong or expired.
    #[instrument(skip(self, code))]
    pub async fn verify_reset_code(&self, code: &str) -> Result<(), AccountError> {
        Ok(self.passwords.verify_reset_code(code.trim()).await?)
    }

    /// Set a new password after a verified reset code, and sign in.
    ///
    /// # Errors
    ///
    /// Returns a validation error or a backend error.
    #[instrument(skip(self, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: SecretString,
    ) -> Result<(), AccountError> {
        let email = Email::parse(email)?;
        validate_password(new_password.expose_secret())?;

        let token = self.passwords.reset_password(&email, &new_password).await?;
        self.tokens.set(token);
        Ok(())
    }

    /// Change the password of the signed-in account.
    ///
    /// The backend issues a new token, which replaces the current one.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotAuthenticated` when signed out, a
    /// validation error, or a backend error.
    #[instrument(skip(self, current, new))]
    pub async fn change_password(
        &self,
        current: SecretString,
        new: SecretString,
    ) -> Result<(), AccountError> {
        let token = self.tokens.current().ok_or(AccountError::NotAuthenticated)?;
        validate_password(new.expose_secret())?;

        let token = self
            .passwords
            .change_password(&token, &PasswordChange { current, new })
            .await?;
        self.tokens.set(token);
        Ok(())
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate a password against the backend's rules: an uppercase letter
/// followed by 5 to 10 lowercase letters or digits.
///
/// # Errors
///
/// Returns `AccountError::WeakPassword` describing the failed rule.
pub fn validate_password(password: &str) -> Result<(), AccountError> {
    let mut chars = password.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_uppercase()) {
        return Err(AccountError::WeakPassword(
            "password must start with an uppercase letter".to_string(),
        ));
    }

    let tail: Vec<char> = chars.collect();
    if !(MIN_PASSWORD_TAIL..=MAX_PASSWORD_TAIL).contains(&tail.len()) {
        return Err(AccountError::WeakPassword(format!(
            "password must be {} to {} characters long",
            MIN_PASSWORD_TAIL + 1,
            MAX_PASSWORD_TAIL + 1
        )));
    }

    if !tail
        .iter()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(AccountError::WeakPassword(
            "only lowercase letters and digits may follow the first letter".to_string(),
        ));
    }

    Ok(())
}

/// Validate an Egyptian mobile number: `01`, one of `0125`, then 8 digits.
///
/// # Errors
///
/// Returns `AccountError::InvalidPhone` if the number does not match.
pub fn validate_phone(phone: &str) -> Result<(), AccountError> {
    let valid = phone.len() == 11
        && phone.starts_with("01")
        && phone.chars().all(|c| c.is_ascii_digit())
        && matches!(phone.chars().nth(2), Some('0' | '1' | '2' | '5'));

    if valid {
        Ok(())
    } else {
        Err(AccountError::InvalidPhone(phone.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use bazaar_core::UserId;

    use super::*;
    use crate::api::{AccountUser, ApiResult};
    use crate::session::SessionToken;
    use crate::storage::KeyValueStore;

    #[derive(Default)]
    struct FakeAuthApi {
        accounts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl AuthApi for FakeAuthApi {
        async fn sign_in(&self, credentials: &Credentials) -> ApiResult<AuthSession> {
            let accounts = self.accounts.lock().unwrap();
            let known = accounts.iter().any(|(email, password)| {
                email == credentials.email.as_str() && password == credentials.password.expose_secret()
            });
            if !known {
                return Err(ApiError::Unauthorized("Incorrect email or password".to_string()));
            }
            Ok(AuthSession {
                token: SessionToken::new(format!("token-{}", credentials.email)),
                user: Some(AccountUser {
                    name: "Test".to_string(),
                    email: credentials.email.to_string(),
                    role: "user".to_string(),
                }),
            })
        }

        async fn sign_up(&self, registration: &Registration) -> ApiResult<AuthSession> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.iter().any(|(email, _)| email == registration.email.as_str()) {
                return Err(ApiError::Backend {
                    status: 409,
                    message: "Account Already Exists".to_string(),
                });
            }
            accounts.push((
                registration.email.to_string(),
                registration.password.expose_secret().to_string(),
            ));
            Ok(AuthSession {
                token: SessionToken::new(format!("token-{}", registration.email)),
                user: None,
            })
        }

        async fn verify_token(&self, token: &SessionToken) -> ApiResult<TokenClaims> {
            Ok(TokenClaims {
                user_id: UserId::new("user-1"),
                name: token.expose().to_string(),
                role: "user".to_string(),
            })
        }
    }

    #[async_trait]
    impl PasswordApi for FakeAuthApi {
        async fn forgot_password(&self, _email: &Email) -> ApiResult<String> {
            Ok("Reset code sent to your email".to_string())
        }

        async fn verify_reset_code(&self, code: &str) -> ApiResult<()> {
            if code == "123456" {
                Ok(())
            } else {
                Err(ApiError::Backend {
                    status: 400,
                    message: "Reset code is invalid or has expired".to_string(),
                })
            }
        }

        async fn reset_password(
            &self,
            _email: &Email,
            _new_password: &SecretString,
        ) -> ApiResult<SessionToken> {
            Ok(SessionToken::new("reset-token"))
        }

        async fn change_password(
            &self,
            _token: &SessionToken,
            _change: &PasswordChange,
        ) -> ApiResult<SessionToken> {
            Ok(SessionToken::new("changed-token"))
        }
    }

    fn service() -> (AccountService, TokenState) {
        let api = Arc::new(FakeAuthApi::default());
        let tokens = TokenState::load(KeyValueStore::in_memory());
        (AccountService::new(api.clone(), api, tokens.clone()), tokens)
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Abc123").is_ok());
        assert!(validate_password("Sabcdef1234").is_ok());
        assert!(validate_password("abc123").is_err());
        assert!(validate_password("Ab12").is_err());
        assert!(validate_password("Abcdefghijkl").is_err());
        assert!(validate_password("AbcDef1").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("01012345678").is_ok());
        assert!(validate_phone("01512345678").is_ok());
        assert!(validate_phone("01312345678").is_err());
        assert!(validate_phone("0101234567").is_err());
        assert!(validate_phone("0101234567a").is_err());
    }

    #[tokio::test]
    async fn test_register_login_logout() {
        let (accounts, tokens) = service();

        accounts
            .register("Mona", "mona@example.com", secret("Secret1"), "01012345678")
            .await
            .unwrap();
        assert!(tokens.is_authenticated());

        assert!(accounts.logout());
        assert!(!tokens.is_authenticated());

        let err = accounts
            .login("mona@example.com", secret("Wrong12"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidCredentials));
        assert!(!tokens.is_authenticated());

        accounts
            .login("MONA@example.com", secret("Secret1"))
            .await
            .unwrap();
        assert_eq!(
            tokens.current().unwrap().expose(),
            "token-mona@example.com"
        );
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let (accounts, _) = service();
        accounts
            .register("", "a@example.com", secret("Secret1"), "01012345678")
            .await
            .unwrap();
        let err = accounts
            .register("", "a@example.com", secret("Secret1"), "01012345678")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let (accounts, tokens) = service();
        assert!(matches!(
            accounts
                .register("A", "not-an-email", secret("Secret1"), "01012345678")
                .await,
            Err(AccountError::InvalidEmail(_))
        ));
        assert!(matches!(
            accounts
                .register("A", "a@example.com", secret("weak"), "01012345678")
                .await,
            Err(AccountError::WeakPassword(_))
        ));
        assert!(!tokens.is_authenticated());
    }

    #[tokio::test]
    async fn test_password_flows_replace_token() {
        let (accounts, tokens) = service();

        assert!(matches!(
            accounts.change_password(secret("Secret1"), secret("Secret2")).await,
            Err(AccountError::NotAuthenticated)
        ));

        accounts.verify_reset_code(" 123456 ").await.unwrap();
        accounts
            .reset_password("a@example.com", secret("Secret2"))
            .await
            .unwrap();
        assert_eq!(tokens.current().unwrap().expose(), "reset-token");

        accounts
            .change_password(secret("Secret2"), secret("Secret3"))
            .await
            .unwrap();
        assert_eq!(tokens.current().unwrap().expose(), "changed-token");
    }

    #[tokio::test]
    async fn test_whoami() {
        let (accounts, tokens) = service();
        assert!(accounts.whoami().await.unwrap().is_none());

        tokens.set(SessionToken::new("abc"));
        let claims = accounts.whoami().await.unwrap().unwrap();
        assert_eq!(claims.user_id.as_str(), "user-1");
    }
}
