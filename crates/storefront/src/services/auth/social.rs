//! Federated sign-in reconciliation.
//!
//! The backend only knows email/password accounts. A federated identity is
//! mapped onto one by deriving a password (and, for registration, a phone
//! number) from the provider's stable user ID:
//!
//! 1. Log in with the derived password.
//! 2. If that fails, register with the derived credentials. A "already
//!    exists" answer means a password account owns the email; that is a
//!    terminal conflict.
//! 3. Log in again with the new credentials.
//!
//! A token is stored only when one of the logins succeeds.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use bazaar_core::Email;

use super::SocialAuthError;
use crate::api::{AuthApi, AuthSession, Credentials, Registration};
use crate::session::TokenState;

/// Hex characters of the digest used in a derived password.
const DERIVED_PASSWORD_HEX: usize = 10;

/// The result of an identity-provider sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    /// Provider-issued stable user ID.
    pub uid: String,
    /// Verified email, when the provider shares it.
    pub email: Option<Email>,
    /// Display name, when the provider shares it.
    pub display_name: Option<String>,
}

/// An external identity provider (Google, Apple, ...).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the provider's sign-in flow.
    ///
    /// # Errors
    ///
    /// Returns a message describing why sign-in failed or was cancelled.
    async fn sign_in(&self) -> Result<FederatedIdentity, String>;
}

/// Maps federated identities onto backend accounts.
#[derive(Clone)]
pub struct SocialAuth {
    auth: Arc<dyn AuthApi>,
    tokens: TokenState,
}

impl SocialAuth {
    /// Create a reconciler.
    #[must_use]
    pub fn new(auth: Arc<dyn AuthApi>, tokens: TokenState) -> Self {
        Self { auth, tokens }
    }

    /// Sign in through `provider` and reconcile the result.
    ///
    /// # Errors
    ///
    /// Returns `SocialAuthError::Provider` if the provider flow fails, or any
    /// error from [`reconcile`](Self::reconcile).
    pub async fn sign_in_with(
        &self,
        provider: &dyn IdentityProvider,
    ) -> Result<AuthSession, SocialAuthError> {
        let identity = provider.sign_in().await.map_err(SocialAuthError::Provider)?;
        self.reconcile(&identity).await
    }

    /// Log in (registering first if needed) as the backend account for
    /// `identity`, and store the session token.
    ///
    /// # Errors
    ///
    /// Returns `SocialAuthError::AccountConflict` if a password account
    /// already owns the email. No token is stored on any error.
    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    pub async fn reconcile(
        &self,
        identity: &FederatedIdentity,
    ) -> Result<AuthSession, SocialAuthError> {
        let email = identity
            .email
            .clone()
            .ok_or(SocialAuthError::MissingEmail)?;
        let password = derive_password(&identity.uid);
        let credentials = Credentials {
            email: email.clone(),
            password: SecretString::from(password.clone()),
        };

        match self.auth.sign_in(&credentials).await {
            Ok(session) => return self.commit(session),
            Err(e) => debug!(error = %e, "Federated login failed, registering account"),
        }

        let name = identity
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| email.local_part().to_string(), str::to_string);
        let registration = Registration {
            name,
            email: email.clone(),
            password: SecretString::from(password),
            phone: derive_phone(&identity.uid),
        };

        if let Err(e) = self.auth.sign_up(&registration).await {
            if e.is_account_conflict() {
                warn!(email = %email, "Federated email belongs to a password account");
                return Err(SocialAuthError::AccountConflict {
                    email: email.to_string(),
                });
            }
            return Err(SocialAuthError::Registration(e));
        }

        let session = self
            .auth
            .sign_in(&credentials)
            .await
            .map_err(SocialAuthError::Login)?;
        self.commit(session)
    }

    fn commit(&self, session: AuthSession) -> Result<AuthSession, SocialAuthError> {
        if session.token.expose().trim().is_empty() {
            return Err(SocialAuthError::MissingToken);
        }
        self.tokens.set(session.token.clone());
        info!("Federated sign-in complete");
        Ok(session)
    }
}

impl std::fmt::Debug for SocialAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialAuth").finish_non_exhaustive()
    }
}

/// Password derived from a provider user ID.
///
/// An uppercase `S` followed by 10 lowercase hex digits, which satisfies the
/// backend's password rule.
#[must_use]
pub fn derive_password(uid: &str) -> String {
    let digest = Sha256::digest(format!("bazaar:password:{uid}").as_bytes());
    digest
        .iter()
        .take(DERIVED_PASSWORD_HEX / 2)
        .fold(String::from("S"), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

/// Mobile number derived from a provider user ID: `01`, an operator digit
/// from `0125`, then 8 digits.
#[must_use]
pub fn derive_phone(uid: &str) -> String {
    let digest = Sha256::digest(format!("bazaar:phone:{uid}").as_bytes());
    let mut bytes = digest.iter();

    let operator = match bytes.next().map_or(0, |b| b % 4) {
        0 => '0',
        1 => '1',
        2 => '2',
        _ => '5',
    };
    let subscriber: String = bytes.take(8).map(|b| char::from(b'0' + b % 10)).collect();

    format!("01{operator}{subscriber}")
}
