//! Command implementations.
//!
//! Each command drives the [`Storefront`] facade and prints a plain-text
//! summary to stdout. Logs go to stderr.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod prefs;

use bazaar_storefront::{Storefront, StorefrontError};
use thiserror::Error;

pub use account::PasswordAction;
pub use cart::{CartAction, WishlistAction};
pub use catalog::ProductsAction;
pub use orders::{AddressAction, CheckoutAction};
pub use prefs::PrefsAction;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command needs a session token.
    #[error("Not signed in. Run `bazaar login` first.")]
    NotSignedIn,

    /// An argument could not be parsed.
    #[error("{0}")]
    InvalidArgument(String),

    /// The local store could not be written.
    #[error("Could not update the local store at {0}")]
    StoreWrite(String),

    #[error(transparent)]
    Storefront(#[from] StorefrontError),
}

macro_rules! from_service_error {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for CommandError {
                fn from(e: $error) -> Self {
                    Self::Storefront(e.into())
                }
            }
        )*
    };
}

from_service_error!(
    bazaar_storefront::api::ApiError,
    bazaar_storefront::services::AccountError,
    bazaar_storefront::services::SocialAuthError,
    bazaar_storefront::services::CartError,
    bazaar_storefront::services::WishlistError,
    bazaar_storefront::services::OrderError,
);

/// Result type alias for commands.
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Fail early when no session token is held.
fn require_session(storefront: &Storefront) -> CommandResult {
    if storefront.tokens().is_authenticated() {
        Ok(())
    } else {
        Err(CommandError::NotSignedIn)
    }
}

/// Report a failed local store write.
fn ensure_stored(storefront: &Storefront, written: bool) -> CommandResult {
    if written {
        Ok(())
    } else {
        Err(CommandError::StoreWrite(
            storefront.config().storage_path.display().to_string(),
        ))
    }
}
