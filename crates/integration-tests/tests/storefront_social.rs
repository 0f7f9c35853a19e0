//! Integration tests for federated sign-in.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use bazaar_core::Email;
use bazaar_integration_tests::FakeBackend;
use bazaar_storefront::services::{FederatedIdentity, IdentityProvider, SocialAuthError};
use secrecy::SecretString;

const EMAIL: &str = "layla@example.com";

struct StubProvider(Result<FederatedIdentity, String>);

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn sign_in(&self) -> Result<FederatedIdentity, String> {
        self.0.clone()
    }
}

fn identity(uid: &str) -> FederatedIdentity {
    FederatedIdentity {
        uid: uid.to_string(),
        email: Some(Email::parse(EMAIL).unwrap()),
        display_name: Some("Layla".to_string()),
    }
}

fn is_derived_phone(phone: &str) -> bool {
    phone.len() == 11
        && phone.starts_with("01")
        && matches!(phone.as_bytes()[2], b'0' | b'1' | b'2' | b'5')
        && phone.bytes().all(|b| b.is_ascii_digit())
}

#[tokio::test]
async fn test_first_sign_in_registers_account() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront();

    let session = storefront
        .social()
        .reconcile(&identity("google-oauth2|1029384756"))
        .await
        .unwrap();
    assert_eq!(session.user.unwrap().name, "Layla");
    assert!(storefront.tokens().is_authenticated());

    assert!(backend.has_account(EMAIL));
    assert!(is_derived_phone(&backend.phone_of(EMAIL).unwrap()));

    // Failed login, registration, then the real login
    assert_eq!(backend.requests_to("POST", "auth/signin").len(), 2);
    assert_eq!(backend.requests_to("POST", "auth/signup").len(), 1);
}

#[tokio::test]
async fn test_returning_user_only_logs_in() {
    let backend = FakeBackend::start().await;
    let uid = "google-oauth2|1029384756";

    backend
        .storefront()
        .social()
        .reconcile(&identity(uid))
        .await
        .unwrap();
    backend.clear_requests();

    // A new device with an empty store
    let storefront = backend.storefront();
    let provider = StubProvider(Ok(identity(uid)));
    storefront.social().sign_in_with(&provider).await.unwrap();

    assert!(storefront.tokens().is_authenticated());
    assert_eq!(backend.requests_to("POST", "auth/signin").len(), 1);
    assert!(backend.requests_to("POST", "auth/signup").is_empty());
}

#[tokio::test]
async fn test_password_account_conflict() {
    let backend = FakeBackend::start().await;
    backend.add_account("Layla", EMAIL, "Secret123");
    let storefront = backend.storefront();

    let err = storefront
        .social()
        .reconcile(&identity("google-oauth2|1029384756"))
        .await
        .unwrap_err();
    match err {
        SocialAuthError::AccountConflict { email } => assert_eq!(email, EMAIL),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!storefront.tokens().is_authenticated());

    // The password account is untouched
    storefront
        .accounts()
        .login(EMAIL, SecretString::from("Secret123".to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_provider_failure_makes_no_request() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront();

    let provider = StubProvider(Err("popup closed by user".to_string()));
    let err = storefront.social().sign_in_with(&provider).await.unwrap_err();
    assert!(matches!(err, SocialAuthError::Provider(m) if m == "popup closed by user"));

    let provider = StubProvider(Ok(FederatedIdentity {
        email: None,
        ..identity("apple|000111")
    }));
    let err = storefront.social().sign_in_with(&provider).await.unwrap_err();
    assert!(matches!(err, SocialAuthError::MissingEmail));

    assert!(backend.requests().is_empty());
    assert!(!storefront.tokens().is_authenticated());
}
