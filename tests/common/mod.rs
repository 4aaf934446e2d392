// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use vidstream::config::Config;
use vidstream::db::FirestoreDb;
use vidstream::routes::create_router;
use vidstream::services::MediaService;
use vidstream::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create shared state with an offline mock database and mock media host.
#[allow(dead_code)]
pub fn create_test_state() -> Arc<AppState> {
    let config = Config::default();
    Arc::new(AppState::new(config, test_db_offline(), MediaService::new_mock()))
}

/// Create shared state backed by the Firestore emulator (mock media host).
#[allow(dead_code)]
pub async fn create_emulator_state() -> Arc<AppState> {
    let config = Config::default();
    Arc::new(AppState::new(config, test_db().await, MediaService::new_mock()))
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = create_test_state();
    (create_router(state.clone()), state)
}

/// Unique suffix for emulator test data so runs don't collide.
#[allow(dead_code)]
pub fn unique() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Mint a valid access token for the default test config.
#[allow(dead_code)]
pub fn test_access_token(user_id: &str) -> String {
    let config = Config::default();
    vidstream::services::token::issue_access_token(user_id, &config)
        .expect("Failed to mint test access token")
}
