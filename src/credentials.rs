//! Service-account credentials and OAuth access tokens for Google APIs

use crate::error::{Result, SheetSyncError};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Scopes needed to find a spreadsheet by name and read its values
pub const SCOPES: &[&str] = &[
    "https://spreadsheets.google.com/feeds",
    "https://www.googleapis.com/auth/drive",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// The fields of a service-account JSON key file that we use
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Bearer token with its expiry as a unix timestamp
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: i64,
}

impl AccessToken {
    /// Usable for at least another minute
    pub fn is_fresh(&self) -> bool {
        Utc::now().timestamp() + 60 < self.expires_at
    }
}

impl ServiceAccountKey {
    /// Read and validate a key file. `sheet` names the dataset being
    /// fetched so failures surface as that sheet's source error.
    pub fn load(path: &Path, sheet: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SheetSyncError::source_unavailable(
                sheet,
                format!("cannot read credentials '{}': {}", path.display(), e),
            )
        })?;
        Self::parse(&content, sheet)
    }

    pub fn parse(content: &str, sheet: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(content).map_err(|e| {
            SheetSyncError::source_unavailable(sheet, format!("invalid credentials file: {}", e))
        })?;
        if key.key_type != "service_account" {
            return Err(SheetSyncError::source_unavailable(
                sheet,
                format!("credentials are of type '{}', expected service_account", key.key_type),
            ));
        }
        if key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(SheetSyncError::source_unavailable(
                sheet,
                "credentials lack client_email or private_key",
            ));
        }
        Ok(key)
    }

    /// Signed RS256 assertion for the JWT-bearer grant
    pub fn signed_assertion(&self, now: i64) -> std::result::Result<String, jsonwebtoken::errors::Error> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES.join(" "),
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        encode(&header, &claims, &key)
    }

    /// Exchange a signed assertion for an access token
    pub fn fetch_token(&self, http: &reqwest::blocking::Client, sheet: &str) -> Result<AccessToken> {
        let now = Utc::now().timestamp();
        let assertion = self
            .signed_assertion(now)
            .map_err(|e| SheetSyncError::source_unavailable(sheet, format!("cannot sign token request: {}", e)))?;

        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| SheetSyncError::source_unavailable(sheet, format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SheetSyncError::source_unavailable(
                sheet,
                format!("token request rejected ({}): {}", status.as_u16(), body),
            ));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| SheetSyncError::source_unavailable(sheet, format!("bad token response: {}", e)))?;

        Ok(AccessToken {
            token: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}
