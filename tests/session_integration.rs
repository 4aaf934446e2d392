// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set); they are skipped otherwise.

use vidstream::error::AppError;
use vidstream::services::session::{FileUpload, LoginInput, RegisterInput};

mod common;
use common::{create_emulator_state, unique};

fn register_input(tag: &str) -> RegisterInput {
    RegisterInput {
        email: format!("{tag}@example.com"),
        username: format!("user{tag}"),
        full_name: "Test User".to_string(),
        password: "s3cret-pass".to_string(),
        avatar: Some(FileUpload {
            filename: format!("{tag}.png"),
            bytes: vec![1, 2, 3],
        }),
        cover_image: None,
    }
}

fn login_by_email(tag: &str) -> LoginInput {
    LoginInput {
        email: Some(format!("{tag}@example.com")),
        username: None,
        password: "s3cret-pass".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// REGISTRATION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_register_normalizes_username_and_strips_secrets() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    let mut input = register_input(&tag);
    input.username = format!("UsEr{}", tag.to_uppercase());

    let user = state.session.register(input).await.unwrap();
    assert_eq!(user.username, format!("user{tag}"));

    // The public record serializes without credential fields
    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("password").is_none());
    assert!(json.get("refreshToken").is_none());
    assert!(json.get("refresh_token").is_none());

    // The stored record has a hash, not the plain password
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_ne!(stored.password, "s3cret-pass");
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_register_requires_avatar() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    let mut input = register_input(&tag);
    input.avatar = None;

    let err = state.session.register(input).await.unwrap_err();
    match err {
        AppError::Validation(msg) => assert!(msg.contains("Avatar"), "got: {msg}"),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_register_duplicate_email_reported_before_username() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    state.session.register(register_input(&tag)).await.unwrap();

    // Same email AND same username: the email conflict wins
    let err = state
        .session
        .register(register_input(&tag))
        .await
        .unwrap_err();
    match err {
        AppError::Conflict(msg) => assert!(msg.contains("email"), "got: {msg}"),
        other => panic!("expected Conflict, got {other:?}"),
    }

    // Different email, same username (different case): username conflict
    let mut input = register_input(&tag);
    input.email = format!("other-{tag}@example.com");
    input.username = format!("USER{tag}");
    let err = state.session.register(input).await.unwrap_err();
    match err {
        AppError::Conflict(msg) => assert!(msg.contains("username"), "got: {msg}"),
        other => panic!("expected Conflict, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LOGIN / LOGOUT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_login_persists_refresh_token() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    let registered = state.session.register(register_input(&tag)).await.unwrap();
    let (user, tokens) = state.session.login(login_by_email(&tag)).await.unwrap();

    assert_eq!(user.id, registered.id);
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some(tokens.refresh_token.as_str()));
}

#[tokio::test]
async fn test_login_by_username_is_case_insensitive() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    state.session.register(register_input(&tag)).await.unwrap();

    let (user, _) = state
        .session
        .login(LoginInput {
            email: None,
            username: Some(format!("USER{tag}")),
            password: "s3cret-pass".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(user.username, format!("user{tag}"));
}

#[tokio::test]
async fn test_login_wrong_password() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    state.session.register(register_input(&tag)).await.unwrap();

    let err = state
        .session
        .login(LoginInput {
            email: Some(format!("{tag}@example.com")),
            username: None,
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
}

#[tokio::test]
async fn test_login_unknown_user() {
    require_emulator!();
    let state = create_emulator_state().await;

    let err = state
        .session
        .login(login_by_email(&unique()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_logout_clears_token_and_is_idempotent() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    state.session.register(register_input(&tag)).await.unwrap();
    let (user, _) = state.session.login(login_by_email(&tag)).await.unwrap();

    state.session.logout(&user.id).await.unwrap();
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());

    // Logging out again is not an error
    state.session.logout(&user.id).await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// REFRESH ROTATION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replay() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    state.session.register(register_input(&tag)).await.unwrap();
    let (user, tokens) = state.session.login(login_by_email(&tag)).await.unwrap();

    // First rotation succeeds and persists the new token
    let rotated = state.session.refresh(&tokens.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, tokens.refresh_token);
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(
        stored.refresh_token.as_deref(),
        Some(rotated.refresh_token.as_str())
    );

    // Replaying the superseded token fails, and the stored token is intact
    let err = state
        .session
        .refresh(&tokens.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(
        stored.refresh_token.as_deref(),
        Some(rotated.refresh_token.as_str())
    );
}

#[tokio::test]
async fn test_concurrent_refresh_has_one_winner() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    state.session.register(register_input(&tag)).await.unwrap();
    let (user, tokens) = state.session.login(login_by_email(&tag)).await.unwrap();

    // Race two rotations on the same stored token
    let (first, second) = tokio::join!(
        state.session.refresh(&tokens.refresh_token),
        state.session.refresh(&tokens.refresh_token),
    );

    let winners: Vec<_> = [first, second].into_iter().filter_map(|r| r.ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one rotation must win");

    // The store holds exactly the winner's token
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(
        stored.refresh_token.as_deref(),
        Some(winners[0].refresh_token.as_str())
    );
}

#[tokio::test]
async fn test_refresh_after_logout_fails() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    state.session.register(register_input(&tag)).await.unwrap();
    let (user, tokens) = state.session.login(login_by_email(&tag)).await.unwrap();
    state.session.logout(&user.id).await.unwrap();

    let err = state
        .session
        .refresh(&tokens.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// CHANGE PASSWORD
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_change_password_flow() {
    require_emulator!();
    let state = create_emulator_state().await;
    let tag = unique();

    state.session.register(register_input(&tag)).await.unwrap();
    let (user, tokens) = state.session.login(login_by_email(&tag)).await.unwrap();

    // Wrong current password
    let err = state
        .session
        .change_password(&user.id, "wrong", "new-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));

    // New password identical to the current one is rejected even though the
    // current password verifies
    let err = state
        .session
        .change_password(&user.id, "s3cret-pass", "s3cret-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Valid change
    state
        .session
        .change_password(&user.id, "s3cret-pass", "new-pass")
        .await
        .unwrap();

    // Changing the password does not rotate or clear the refresh token
    let stored = state.db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(
        stored.refresh_token.as_deref(),
        Some(tokens.refresh_token.as_str())
    );

    // Old password no longer works, new one does
    let err = state.session.login(login_by_email(&tag)).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    state
        .session
        .login(LoginInput {
            email: Some(format!("{tag}@example.com")),
            username: None,
            password: "new-pass".to_string(),
        })
        .await
        .unwrap();
}
