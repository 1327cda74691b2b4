//! Pool generation from indexed credential variables.
//!
//! Account 1 reads `MANAGER_USER`, `MANAGER_PASS` and `MANAGER_OAUTH`;
//! account `n >= 2` reads the same names with an `_n` suffix.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::error::PoolError;
use crate::record::CredentialRecord;
use crate::store::PoolStore;

pub const USER_VAR: &str = "MANAGER_USER";
pub const PASS_VAR: &str = "MANAGER_PASS";
pub const TOKEN_VAR: &str = "MANAGER_OAUTH";

/// Where credential variables come from.
pub trait CredentialSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl CredentialSource for EnvSource {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed variables, for tests and callers that load credentials elsewhere.
#[derive(Debug, Default, Clone)]
pub struct MapSource(pub HashMap<String, String>);

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl CredentialSource for MapSource {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Variable suffix for the 1-based account `index`.
pub fn index_suffix(index: usize) -> String {
    if index <= 1 {
        String::new()
    } else {
        format!("_{index}")
    }
}

fn required(source: &impl CredentialSource, name: String) -> Result<String, PoolError> {
    match source.var(&name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(PoolError::MissingVariable(name)),
    }
}

/// Build `count` free records from `source`.
pub fn build_records(
    source: &impl CredentialSource,
    count: usize,
) -> Result<Vec<CredentialRecord>, PoolError> {
    if count == 0 {
        return Err(PoolError::InvalidCount(count));
    }

    // `count` is caller input; grow as variables are found.
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for index in 1..=count {
        let suffix = index_suffix(index);
        let username = required(source, format!("{USER_VAR}{suffix}"))?;
        let password = required(source, format!("{PASS_VAR}{suffix}"))?;
        let preset = source.var(&format!("{TOKEN_VAR}{suffix}"));

        if !seen.insert(username.clone()) {
            return Err(PoolError::DuplicateUsername(username));
        }
        records.push(CredentialRecord::new(username, password, preset));
    }

    Ok(records)
}

/// Build `count` records and overwrite whatever `store` holds.
pub fn generate<S: PoolStore + ?Sized>(
    store: &S,
    source: &impl CredentialSource,
    count: usize,
) -> Result<Vec<CredentialRecord>, PoolError> {
    let records = build_records(source, count)?;
    let version = store.replace(&records)?;

    info!(
        count = records.len(),
        preset_tokens = records.iter().filter(|r| r.is_preset_token).count(),
        version,
        "Generated credential pool"
    );
    Ok(records)
}
