//! End-to-end token lifecycle over the in-memory store: issuance,
//! authentication, rotation, replay rejection, and revocation. No
//! database or network required.

use std::sync::Arc;

use arena::auth::{
    authenticate, hash_token, issue_session, refresh_session, revoke_session,
    InMemoryRefreshTokenStore, RefreshTokenStore,
};
use arena::configuration::JwtSettings;
use arena::error::{AppError, AuthError};

fn test_jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-at-least-32-chars".to_string(),
        access_token_expiry: 900,
        reset_token_expiry: 1800,
        issuer: "arena-test".to_string(),
    }
}

fn assert_invalid_session<T: std::fmt::Debug>(result: Result<T, AppError>) {
    match result {
        Err(AppError::Auth(AuthError::InvalidSession)) => (),
        other => panic!("Expected InvalidSession, got {:?}", other),
    }
}

#[tokio::test]
async fn login_issues_a_working_token_pair() {
    let store = InMemoryRefreshTokenStore::new();
    let config = test_jwt_settings();

    let tokens = issue_session(&store, 42, &config).await.unwrap();

    // Access token resolves back to the subject without any store lookup
    assert_eq!(authenticate(&tokens.access_token, &config).unwrap(), 42);

    // The store holds exactly the digest of the refresh token
    let record = store.find_by_user(42).await.unwrap().expect("no record");
    assert_eq!(record.refresh_token, hash_token(&tokens.refresh_token));
    assert_eq!(record.user_id, 42);
}

#[tokio::test]
async fn second_login_supersedes_the_first_session() {
    let store = InMemoryRefreshTokenStore::new();
    let config = test_jwt_settings();

    let first = issue_session(&store, 42, &config).await.unwrap();
    let second = issue_session(&store, 42, &config).await.unwrap();

    // Single live record per user: the first refresh token is dead
    assert_invalid_session(refresh_session(&store, 42, &first.refresh_token, &config).await);
    assert!(refresh_session(&store, 42, &second.refresh_token, &config)
        .await
        .is_ok());
}

#[tokio::test]
async fn rotated_refresh_token_cannot_be_replayed() {
    let store = InMemoryRefreshTokenStore::new();
    let config = test_jwt_settings();

    let original = issue_session(&store, 42, &config).await.unwrap();

    // First use succeeds and rotates
    let rotated = refresh_session(&store, 42, &original.refresh_token, &config)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, original.refresh_token);

    // Replaying the now-stale token fails
    assert_invalid_session(refresh_session(&store, 42, &original.refresh_token, &config).await);
}

#[tokio::test]
async fn refresh_tokens_are_scoped_per_user() {
    let store = InMemoryRefreshTokenStore::new();
    let config = test_jwt_settings();

    let alice = issue_session(&store, 1, &config).await.unwrap();
    let bob = issue_session(&store, 2, &config).await.unwrap();

    // A token never works under another user's id
    assert_invalid_session(refresh_session(&store, 2, &alice.refresh_token, &config).await);
    assert_invalid_session(refresh_session(&store, 1, &bob.refresh_token, &config).await);

    // Rotating one user's session leaves the other intact
    refresh_session(&store, 1, &alice.refresh_token, &config)
        .await
        .unwrap();
    assert!(refresh_session(&store, 2, &bob.refresh_token, &config)
        .await
        .is_ok());
}

#[tokio::test]
async fn concurrent_refreshes_have_exactly_one_winner() {
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let config = test_jwt_settings();

    let tokens = issue_session(store.as_ref(), 42, &config).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = Arc::clone(&store);
        let config = config.clone();
        let refresh_token = tokens.refresh_token.clone();
        handles.push(tokio::spawn(async move {
            refresh_session(store.as_ref(), 42, &refresh_token, &config).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::Auth(AuthError::InvalidSession)) => (),
            Err(other) => panic!("Unexpected failure: {:?}", other),
        }
    }

    assert_eq!(successes, 1, "exactly one concurrent rotation may win");
}

#[tokio::test]
async fn revoked_session_cannot_refresh() {
    let store = InMemoryRefreshTokenStore::new();
    let config = test_jwt_settings();

    let tokens = issue_session(&store, 42, &config).await.unwrap();
    revoke_session(&store, 42).await.unwrap();

    assert_invalid_session(refresh_session(&store, 42, &tokens.refresh_token, &config).await);
}

#[tokio::test]
async fn full_session_scenario() {
    let store = InMemoryRefreshTokenStore::new();
    let config = test_jwt_settings();

    // login(user=42) issues {A1, R1}
    let first = issue_session(&store, 42, &config).await.unwrap();

    // authenticate(A1) resolves 42
    assert_eq!(authenticate(&first.access_token, &config).unwrap(), 42);

    // refresh(R1, 42) issues {A2, R2}
    let second = refresh_session(&store, 42, &first.refresh_token, &config)
        .await
        .unwrap();

    // authenticate(A2) resolves 42
    assert_eq!(authenticate(&second.access_token, &config).unwrap(), 42);

    // refresh(R1, 42) fails: R1 was rotated away
    assert_invalid_session(refresh_session(&store, 42, &first.refresh_token, &config).await);

    // refresh(R2, 42) succeeds
    assert!(refresh_session(&store, 42, &second.refresh_token, &config)
        .await
        .is_ok());
}
