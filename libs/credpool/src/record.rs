//! Pooled credential records and the on-disk document that holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reusable test account.
///
/// Field names are camelCase on disk, matching the record layout of legacy
/// bare-array pool files. The file itself is now a versioned
/// [`PoolDocument`], which only this crate reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub username: String,

    pub password: String,

    /// OAuth token, empty until a login captures one or a preset supplies it.
    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub in_use: bool,

    /// Test file currently holding this credential; empty when free.
    #[serde(default)]
    pub spec: String,

    /// Token came from configuration and must never be overwritten.
    #[serde(default)]
    pub is_preset_token: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_out_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Create a free record. A non-empty `preset_token` marks the token preset.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        preset_token: Option<String>,
    ) -> Self {
        let token = preset_token.filter(|t| !t.is_empty());
        Self {
            username: username.into(),
            password: password.into(),
            is_preset_token: token.is_some(),
            token: token.unwrap_or_default(),
            in_use: false,
            spec: String::new(),
            checked_out_at: None,
        }
    }

    pub fn is_free(&self) -> bool {
        !self.in_use
    }

    pub fn is_held_by(&self, spec: &str) -> bool {
        self.in_use && self.spec == spec
    }

    pub(crate) fn claim(&mut self, spec: &str) {
        self.in_use = true;
        self.spec = spec.to_string();
        self.checked_out_at = Some(Utc::now());
    }

    pub(crate) fn release(&mut self) {
        self.in_use = false;
        self.spec.clear();
        self.checked_out_at = None;
    }
}

/// A value paired with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Pool file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolDocument {
    /// Incremented on every successful write.
    pub version: u64,
    pub records: Vec<CredentialRecord>,
}
