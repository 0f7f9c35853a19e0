//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("incorrect email or password")]
    InvalidCredentials,

    /// User already exists.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Password does not meet the backend's rules.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Phone number is not a valid mobile number.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// The operation needs a session token.
    #[error("not signed in")]
    NotAuthenticated,

    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors that can occur while reconciling a federated sign-in.
#[derive(Debug, Error)]
pub enum SocialAuthError {
    /// The identity provider sign-in failed or was cancelled.
    #[error("identity provider sign-in failed: {0}")]
    Provider(String),

    /// The provider did not share an email address.
    #[error("identity provider did not return an email address")]
    MissingEmail,

    /// An account with this email exists but was created with a password.
    #[error("an account for {email} already exists; sign in with your email and password")]
    AccountConflict {
        /// The conflicting email address.
        email: String,
    },

    /// Registering the account failed for another reason.
    #[error("registration failed: {0}")]
    Registration(#[source] ApiError),

    /// Logging in after registration failed.
    #[error("login failed: {0}")]
    Login(#[source] ApiError),

    /// The backend returned no usable token.
    #[error("backend did not return a session token")]
    MissingToken,
}
