//! Session and account commands.

use async_trait::async_trait;
use bazaar_core::Email;
use bazaar_storefront::Storefront;
use bazaar_storefront::api::AuthSession;
use bazaar_storefront::services::{FederatedIdentity, IdentityProvider};
use clap::Subcommand;
use secrecy::SecretString;

use super::{CommandResult, ensure_stored, require_session};

#[derive(Subcommand)]
pub enum PasswordAction {
    /// Email a reset code
    Forgot {
        #[arg(short, long)]
        email: String,
    },
    /// Check an emailed reset code
    Verify { code: String },
    /// Set a new password after verifying a reset code
    Reset {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BAZAAR_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Change the signed-in account's password
    Change {
        #[arg(long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        current: String,

        #[arg(long, env = "BAZAAR_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },
}

/// An identity provider whose sign-in result was supplied on the command
/// line (for example, copied from a provider's token inspector).
struct SuppliedIdentity {
    uid: String,
    email: Option<String>,
    name: Option<String>,
}

#[async_trait]
impl IdentityProvider for SuppliedIdentity {
    async fn sign_in(&self) -> Result<FederatedIdentity, String> {
        let uid = self.uid.trim();
        if uid.is_empty() {
            return Err("provider returned an empty user ID".to_string());
        }
        let email = self
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| e.to_string())?;

        Ok(FederatedIdentity {
            uid: uid.to_string(),
            email,
            display_name: self.name.clone(),
        })
    }
}

pub async fn login(storefront: &Storefront, email: &str, password: String) -> CommandResult {
    let session = storefront
        .accounts()
        .login(email, SecretString::from(password))
        .await?;
    print_signed_in(&session);
    Ok(())
}

pub async fn register(
    storefront: &Storefront,
    name: &str,
    email: &str,
    password: String,
    phone: &str,
) -> CommandResult {
    let session = storefront
        .accounts()
        .register(name, email, SecretString::from(password), phone)
        .await?;
    print_signed_in(&session);
    Ok(())
}

pub async fn social_login(
    storefront: &Storefront,
    uid: String,
    email: Option<String>,
    name: Option<String>,
) -> CommandResult {
    let provider = SuppliedIdentity { uid, email, name };
    let session = storefront.social().sign_in_with(&provider).await?;
    print_signed_in(&session);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn logout(storefront: &Storefront) -> CommandResult {
    let was_signed_in = storefront.tokens().is_authenticated();
    ensure_stored(storefront, storefront.accounts().logout())?;
    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Already signed out.");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn whoami(storefront: &Storefront) -> CommandResult {
    require_session(storefront)?;
    if let Some(claims) = storefront.accounts().whoami().await? {
        println!("{} ({}) [{}]", claims.name, claims.user_id, claims.role);
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn password(storefront: &Storefront, action: PasswordAction) -> CommandResult {
    let accounts = storefront.accounts();
    match action {
        PasswordAction::Forgot { email } => {
            let message = accounts.forgot_password(&email).await?;
            println!("{message}");
        }
        PasswordAction::Verify { code } => {
            accounts.verify_reset_code(&code).await?;
            println!("Reset code accepted.");
        }
        PasswordAction::Reset { email, password } => {
            accounts
                .reset_password(&email, SecretString::from(password))
                .await?;
            println!("Password reset. Signed in as {email}.");
        }
        PasswordAction::Change { current, new } => {
            require_session(storefront)?;
            accounts
                .change_password(SecretString::from(current), SecretString::from(new))
                .await?;
            println!("Password changed.");
        }
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_signed_in(session: &AuthSession) {
    match &session.user {
        Some(user) => println!("Signed in as {} <{}>", user.name, user.email),
        None => println!("Signed in."),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_supplied_identity_parses_email() {
        let provider = SuppliedIdentity {
            uid: " g-123 ".to_string(),
            email: Some("Mona@Example.com".to_string()),
            name: Some("Mona".to_string()),
        };
        let identity = provider.sign_in().await.unwrap();
        assert_eq!(identity.uid, "g-123");
        assert!(identity.email.is_some());
        assert_eq!(identity.display_name.as_deref(), Some("Mona"));
    }

    #[tokio::test]
    async fn test_supplied_identity_rejects_bad_input() {
        let blank = SuppliedIdentity {
            uid: "  ".to_string(),
            email: None,
            name: None,
        };
        assert!(blank.sign_in().await.is_err());

        let bad_email = SuppliedIdentity {
            uid: "g-123".to_string(),
            email: Some("not-an-email".to_string()),
            name: None,
        };
        assert!(bad_email.sign_in().await.is_err());

        let no_email = SuppliedIdentity {
            uid: "g-123".to_string(),
            email: None,
            name: None,
        };
        assert!(no_email.sign_in().await.unwrap().email.is_none());
    }
}
