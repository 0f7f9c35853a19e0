//! Integration tests for wishlist synchronization.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use bazaar_core::{Product, ProductId};
use bazaar_integration_tests::{FakeBackend, fixtures};
use bazaar_storefront::Storefront;
use bazaar_storefront::api::ApiError;
use bazaar_storefront::services::WishlistError;
use secrecy::SecretString;

const EMAIL: &str = "mona@example.com";
const PASSWORD: &str = "Secret123";

async fn signed_in() -> (FakeBackend, Storefront, String) {
    let backend = FakeBackend::start().await;
    let user_id = backend.add_account("Mona", EMAIL, PASSWORD);
    let storefront = backend.storefront();
    storefront
        .accounts()
        .login(EMAIL, SecretString::from(PASSWORD.to_string()))
        .await
        .expect("login should succeed");
    (backend, storefront, user_id)
}

async fn product(storefront: &Storefront, id: &str) -> Product {
    storefront
        .catalog()
        .get_product(&ProductId::new(id))
        .await
        .expect("fixture product should exist")
}

#[tokio::test]
async fn test_add_and_remove() {
    let (backend, storefront, user_id) = signed_in().await;
    let wishlist = storefront.wishlist();

    assert!(wishlist.try_get_wishlist().await.unwrap().unwrap().is_empty());

    let shawl = product(&storefront, fixtures::PRODUCT_SHAWL).await;
    let speaker = product(&storefront, fixtures::PRODUCT_SPEAKER).await;
    assert!(wishlist.add_to_wishlist(shawl).await.unwrap());
    assert!(wishlist.add_to_wishlist(speaker).await.unwrap());

    assert!(wishlist.contains(fixtures::PRODUCT_SHAWL));
    assert_eq!(
        backend.wishlist_of(&user_id),
        vec![fixtures::PRODUCT_SHAWL, fixtures::PRODUCT_SPEAKER]
    );

    assert!(
        wishlist
            .remove_from_wishlist(&ProductId::new(fixtures::PRODUCT_SHAWL))
            .await
            .unwrap()
    );
    assert!(!wishlist.contains(fixtures::PRODUCT_SHAWL));
    assert_eq!(backend.wishlist_of(&user_id), vec![fixtures::PRODUCT_SPEAKER]);

    // A fresh fetch agrees with the local snapshot
    let fetched = wishlist.try_get_wishlist().await.unwrap().unwrap();
    assert_eq!(fetched, wishlist.snapshot());
    assert_eq!(fetched.len(), 1);
}

#[tokio::test]
async fn test_duplicate_add_keeps_one_entry() {
    let (backend, storefront, user_id) = signed_in().await;
    let wishlist = storefront.wishlist();
    let shawl = product(&storefront, fixtures::PRODUCT_SHAWL).await;

    assert!(wishlist.add_to_wishlist(shawl.clone()).await.unwrap());
    assert!(!wishlist.add_to_wishlist(shawl).await.unwrap());

    assert_eq!(wishlist.snapshot().len(), 1);
    assert_eq!(backend.wishlist_of(&user_id).len(), 1);
    assert_eq!(backend.requests_to("POST", "wishlist").len(), 2);
}

#[tokio::test]
async fn test_failed_add_is_undone() {
    let (backend, storefront, user_id) = signed_in().await;
    let wishlist = storefront.wishlist();
    let shawl = product(&storefront, fixtures::PRODUCT_SHAWL).await;
    let mut updates = wishlist.subscribe();

    backend.fail_next(
        Method::POST,
        "wishlist",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong",
    );
    let err = wishlist.add_to_wishlist(shawl).await.unwrap_err();
    assert!(matches!(
        err,
        WishlistError::Api(ApiError::Backend { status: 500, .. })
    ));

    assert!(!wishlist.contains(fixtures::PRODUCT_SHAWL));
    assert!(wishlist.snapshot().is_empty());
    assert!(backend.wishlist_of(&user_id).is_empty());
    // Observers saw the optimistic insert and its reversal
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().is_empty());
}

#[tokio::test]
async fn test_failed_remove_restores_position() {
    let (backend, storefront, user_id) = signed_in().await;
    let wishlist = storefront.wishlist();
    for id in [
        fixtures::PRODUCT_SHAWL,
        fixtures::PRODUCT_SPEAKER,
        fixtures::PRODUCT_TSHIRT,
    ] {
        wishlist
            .add_to_wishlist(product(&storefront, id).await)
            .await
            .unwrap();
    }

    let speaker = ProductId::new(fixtures::PRODUCT_SPEAKER);
    backend.fail_next(
        Method::DELETE,
        &format!("wishlist/{speaker}"),
        StatusCode::SERVICE_UNAVAILABLE,
        "Service unavailable",
    );
    assert!(wishlist.remove_from_wishlist(&speaker).await.is_err());

    let snapshot = wishlist.snapshot();
    let order: Vec<&str> = snapshot
        .items()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(
        order,
        vec![
            fixtures::PRODUCT_SHAWL,
            fixtures::PRODUCT_SPEAKER,
            fixtures::PRODUCT_TSHIRT
        ]
    );
    assert_eq!(backend.wishlist_of(&user_id).len(), 3);
}

#[tokio::test]
async fn test_signed_out_edits_are_ignored() {
    let backend = FakeBackend::start().await;
    let storefront = backend.storefront();
    let shawl = product(&storefront, fixtures::PRODUCT_SHAWL).await;
    backend.clear_requests();

    assert!(!storefront.wishlist().add_to_wishlist(shawl).await.unwrap());
    assert!(storefront.wishlist().get_wishlist().await.is_none());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_fetch_failure_is_swallowed_by_get_wishlist() {
    let (backend, storefront, _) = signed_in().await;
    backend.fail_next(
        Method::GET,
        "wishlist",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong",
    );

    assert!(storefront.wishlist().get_wishlist().await.is_none());
    assert!(storefront.wishlist().get_wishlist().await.is_some());
}
