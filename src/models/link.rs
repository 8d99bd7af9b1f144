use chrono::TimeZone;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::analytics::RawTimestamp;

/// A short link owned by the signed-in user, as the backend reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub short: String,
    pub url: String,
    pub created_at: RawTimestamp,
}

impl Link {
    /// Creation date for display, e.g. "Fri, Jan 5, 2024"
    pub fn created_on<Tz>(&self, tz: &Tz) -> Option<String>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.created_at
            .resolve(tz)
            .map(|dt| dt.with_timezone(tz).format("%a, %b %-d, %Y").to_string())
    }

    /// Public short URL under `base`
    pub fn short_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.short)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}
