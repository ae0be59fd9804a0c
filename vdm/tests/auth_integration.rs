//! Integration tests for sign-in, refresh rotation and sign-out.
//!
//! Runs against the in-memory repository; see `postgres_integration.rs` for the
//! same flows against a real database.

use std::sync::Arc;
use vdm::auth::{AuthError, AuthManager, CredentialVerifier, SignInRequest, TokenKind, User};
use vdm::error::ErrorKind;
use vdm::rbac::RoleName;
use vdm::testing::{InMemoryRepository, fast_security_config};

const EMAIL: &str = "user@test.com";
const PASSWORD: &str = "Test123!";

/// Helper to create a manager with one registered user
fn setup(roles: &[RoleName]) -> (Arc<InMemoryRepository>, AuthManager, User) {
    let config = fast_security_config();
    let repo = Arc::new(InMemoryRepository::new());

    let verifier = CredentialVerifier::new(config.password_hashing).unwrap();
    let hash = verifier.hash(PASSWORD).unwrap();
    let user = repo.insert_user(EMAIL, "user0001", &hash, roles);

    let auth = AuthManager::new(repo.clone(), &config).unwrap();
    (repo, auth, user)
}

fn sign_in_request(email: &str, password: &str) -> SignInRequest {
    SignInRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_sign_in_creates_one_refresh_token() {
    let (repo, auth, user) = setup(&[RoleName::Moderator]);

    let session = auth
        .sign_in(sign_in_request(EMAIL, PASSWORD))
        .await
        .expect("Sign-in should succeed");

    assert_eq!(session.user_id, user.id);
    assert_eq!(session.tag, "user0001");
    assert_eq!(session.roles, vec![RoleName::Moderator]);
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 1);

    let claims = auth
        .verify_access_token(&session.tokens.access_token)
        .expect("Access token should verify");
    assert_eq!(claims.sub, user.id);
}

#[tokio::test]
async fn test_sign_in_replaces_prior_refresh_token() {
    let (repo, auth, user) = setup(&[]);

    let first = auth.sign_in(sign_in_request(EMAIL, PASSWORD)).await.unwrap();
    let second = auth.sign_in(sign_in_request(EMAIL, PASSWORD)).await.unwrap();

    assert_ne!(first.tokens.refresh_token, second.tokens.refresh_token);
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 1);

    let result = auth.refresh(&first.tokens.refresh_token).await;
    assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    assert!(auth.refresh(&second.tokens.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
    let (repo, auth, user) = setup(&[]);

    let wrong_password = auth
        .sign_in(sign_in_request(EMAIL, "Wrong123!"))
        .await
        .unwrap_err();
    let unknown_email = auth
        .sign_in(sign_in_request("nobody@test.com", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.kind(), ErrorKind::Unauthorized);
    assert_eq!(wrong_password.client_message(), unknown_email.client_message());
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 0);
}

#[tokio::test]
async fn test_refresh_rotation_scenario() {
    let (repo, auth, user) = setup(&[]);

    let session = auth.sign_in(sign_in_request(EMAIL, PASSWORD)).await.unwrap();
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 1);

    let rotated = auth
        .refresh(&session.tokens.refresh_token)
        .await
        .expect("Refresh should succeed");
    assert_eq!(rotated.user_id, user.id);
    assert_ne!(rotated.tokens.refresh_token, session.tokens.refresh_token);
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 1);

    // The prior secret is spent
    let replay = auth.refresh(&session.tokens.refresh_token).await;
    assert!(matches!(replay, Err(AuthError::InvalidRefreshToken)));
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 1);
}

#[tokio::test]
async fn test_concurrent_refresh_with_same_secret() {
    let (repo, auth, user) = setup(&[]);
    let session = auth.sign_in(sign_in_request(EMAIL, PASSWORD)).await.unwrap();
    let secret = session.tokens.refresh_token;

    let (first, second) = tokio::join!(auth.refresh(&secret), auth.refresh(&secret));

    let successes = [first.is_ok(), second.is_ok()]
        .into_iter()
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1, "Exactly one rotation should win");

    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(AuthError::InvalidRefreshToken)));
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 1);
}

#[tokio::test]
async fn test_expired_refresh_token_is_rejected_and_removed() {
    let (repo, auth, user) = setup(&[]);
    let session = auth.sign_in(sign_in_request(EMAIL, PASSWORD)).await.unwrap();

    repo.expire_tokens(user.id, TokenKind::Refresh);

    let result = auth.refresh(&session.tokens.refresh_token).await;
    assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 0);
}

#[tokio::test]
async fn test_unknown_and_empty_refresh_tokens_rejected() {
    let (_repo, auth, _user) = setup(&[]);

    let long = "a".repeat(64);
    for secret in ["", "deadbeef", long.as_str()] {
        let result = auth.refresh(secret).await;
        assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));
    }
}

#[tokio::test]
async fn test_sign_out_ends_refresh_session() {
    let (repo, auth, user) = setup(&[]);
    let session = auth.sign_in(sign_in_request(EMAIL, PASSWORD)).await.unwrap();

    auth.sign_out(user.id).await.unwrap();
    assert_eq!(repo.token_count(user.id, TokenKind::Refresh), 0);

    let result = auth.refresh(&session.tokens.refresh_token).await;
    assert!(matches!(result, Err(AuthError::InvalidRefreshToken)));

    // Idempotent
    auth.sign_out(user.id).await.unwrap();
}

#[tokio::test]
async fn test_database_failure_is_internal() {
    let (repo, auth, _user) = setup(&[]);
    repo.set_failing(true);

    let err = auth
        .sign_in(sign_in_request(EMAIL, PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Database(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.client_message(), "Internal server error");
}

#[tokio::test]
async fn test_access_token_from_other_secret_rejected() {
    let (_repo, auth, _user) = setup(&[]);

    let mut other_config = fast_security_config();
    other_config.access_token_secret = "another_access_secret_of_sufficient_len".to_string();
    let other = AuthManager::new(Arc::new(InMemoryRepository::new()), &other_config).unwrap();

    let repo = Arc::new(InMemoryRepository::new());
    let hash = CredentialVerifier::new(other_config.password_hashing)
        .unwrap()
        .hash(PASSWORD)
        .unwrap();
    repo.insert_user(EMAIL, "user0002", &hash, &[]);
    let foreign = AuthManager::new(repo, &other_config).unwrap();
    let session = foreign.sign_in(sign_in_request(EMAIL, PASSWORD)).await.unwrap();

    assert!(other.verify_access_token(&session.tokens.access_token).is_ok());
    let err = auth
        .verify_access_token(&session.tokens.access_token)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}
