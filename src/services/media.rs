// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image hosting API client.
//!
//! Uploads avatars, cover images and thumbnails to the external hosting
//! service and deletes replaced assets. The service is fallible and
//! non-transactional: callers decide whether a failure aborts the request
//! (uploads) or is logged and swallowed (deletes of replaced assets).

use crate::error::AppError;
use serde::Deserialize;

/// A hosted asset as returned by the hosting API.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaAsset {
    pub url: String,
}

/// Image hosting client.
#[derive(Clone)]
pub struct MediaService {
    http: Option<reqwest::Client>,
    base_url: String,
    api_key: String,
}

impl MediaService {
    /// Create a client for the hosting API.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// Uploads return deterministic `mock://` URLs, deletes always succeed.
    pub fn new_mock() -> Self {
        Self {
            http: None,
            base_url: "mock://media".to_string(),
            api_key: String::new(),
        }
    }

    /// Upload a file and return its hosted URL.
    pub async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<MediaAsset, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Dependency("Refusing to upload empty file".to_string()));
        }

        let Some(http) = &self.http else {
            return Ok(MediaAsset {
                url: format!("{}/{}", self.base_url, filename),
            });
        };

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = http
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Dependency(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Dependency(format!(
                "Upload rejected with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Dependency(format!("Malformed upload response: {}", e)))
    }

    /// Delete a hosted asset by URL. Returns whether the host confirmed the
    /// deletion.
    pub async fn delete(&self, url: &str) -> Result<bool, AppError> {
        let Some(http) = &self.http else {
            return Ok(true);
        };

        let response = http
            .delete(format!("{}/assets", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|e| AppError::Dependency(format!("Delete request failed: {}", e)))?;

        Ok(response.status().is_success())
    }
}
