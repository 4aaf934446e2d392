// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vidstream: video-platform backend API
//!
//! This crate provides user accounts with dual-token sessions (short-lived
//! access tokens, rotated refresh tokens) plus the channel-profile and
//! watch-history read-models computed over the Firestore collections.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{MediaService, ProfileService, SessionService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub session: SessionService,
    pub profile: ProfileService,
}

impl AppState {
    /// Wire the services around a database and media client.
    pub fn new(config: Config, db: FirestoreDb, media: MediaService) -> Self {
        let session = SessionService::new(db.clone(), media.clone(), config.clone());
        let profile = ProfileService::new(db.clone(), media);
        Self {
            config,
            db,
            session,
            profile,
        }
    }
}
