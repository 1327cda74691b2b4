//! Checkout / check-in protocol over a [`PoolStore`].
//!
//! Every mutation is load, modify in memory, compare-and-swap. A lost race
//! reloads and re-applies the mutation against the fresh collection, so two
//! runners can never walk away holding the same credential.

use tracing::{debug, info, warn};

use crate::error::PoolError;
use crate::record::CredentialRecord;
use crate::store::PoolStore;

/// Default number of compare-and-swap attempts per operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Outcome of [`CredentialPool::store_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenUpdate {
    /// The captured token was written.
    Stored,
    /// The record carries a preset token, which was left untouched.
    PresetKept,
}

/// What a mutation decided after inspecting the loaded collection.
enum Step<T> {
    /// Persist the modified collection, then return the value.
    Write(T),
    /// Return the value without writing.
    Skip(T),
}

/// Shared pool of test-account credentials.
pub struct CredentialPool<S> {
    store: S,
    max_attempts: u32,
}

impl<S: PoolStore> CredentialPool<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the compare-and-swap retry budget (at least one attempt).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of every record in pool order.
    pub fn records(&self) -> Result<Vec<CredentialRecord>, PoolError> {
        Ok(self.store.load()?.value)
    }

    /// Claim the first free credential for `spec`.
    pub fn checkout(&self, spec: &str) -> Result<CredentialRecord, PoolError> {
        let record = self.update(|records| {
            if let Some(held) = records.iter().find(|r| r.is_held_by(spec)) {
                return Err(PoolError::AlreadyCheckedOut {
                    spec: spec.to_string(),
                    username: held.username.clone(),
                });
            }

            let size = records.len();
            let record = records
                .iter_mut()
                .find(|r| r.is_free())
                .ok_or(PoolError::Exhausted { size })?;
            record.claim(spec);
            Ok(Step::Write(record.clone()))
        })?;

        info!(spec, username = %record.username, "Checked out credential");
        Ok(record)
    }

    /// Release whatever credential `spec` holds. Returns the released record,
    /// or `None` if `spec` held nothing.
    pub fn checkin(&self, spec: &str) -> Result<Option<CredentialRecord>, PoolError> {
        let released = self.update(|records| {
            match records.iter_mut().find(|r| r.is_held_by(spec)) {
                Some(record) => {
                    record.release();
                    Ok(Step::Write(Some(record.clone())))
                }
                None => Ok(Step::Skip(None)),
            }
        })?;

        match &released {
            Some(record) => info!(spec, username = %record.username, "Checked in credential"),
            None => warn!(spec, "Check-in for a spec that holds no credential"),
        }
        Ok(released)
    }

    /// Record a token captured at login, unless the account has a preset one.
    pub fn store_token(&self, username: &str, token: &str) -> Result<TokenUpdate, PoolError> {
        let outcome = self.update(|records| {
            let record = records
                .iter_mut()
                .find(|r| r.username == username)
                .ok_or_else(|| PoolError::UnknownUser(username.to_string()))?;

            if record.is_preset_token {
                return Ok(Step::Skip(TokenUpdate::PresetKept));
            }
            record.token = token.to_string();
            Ok(Step::Write(TokenUpdate::Stored))
        })?;

        debug!(username, ?outcome, "Stored login token");
        Ok(outcome)
    }

    pub fn read_token(&self, username: &str) -> Result<String, PoolError> {
        self.records()?
            .into_iter()
            .find(|r| r.username == username)
            .map(|r| r.token)
            .ok_or_else(|| PoolError::UnknownUser(username.to_string()))
    }

    /// Release every checkout, e.g. after a crashed run left records held.
    /// Returns how many records were released.
    pub fn release_all(&self) -> Result<usize, PoolError> {
        let released = self.update(|records| {
            let mut released = 0;
            for record in records.iter_mut().filter(|r| r.in_use) {
                record.release();
                released += 1;
            }
            if released == 0 {
                Ok(Step::Skip(0))
            } else {
                Ok(Step::Write(released))
            }
        })?;

        info!(released, "Released all checkouts");
        Ok(released)
    }

    /// Load, apply `mutate`, and compare-and-swap, retrying on conflict.
    fn update<T>(
        &self,
        mut mutate: impl FnMut(&mut Vec<CredentialRecord>) -> Result<Step<T>, PoolError>,
    ) -> Result<T, PoolError> {
        for attempt in 1..=self.max_attempts {
            let loaded = self.store.load()?;
            let mut records = loaded.value;

            let value = match mutate(&mut records)? {
                Step::Skip(value) => return Ok(value),
                Step::Write(value) => value,
            };

            match self.store.save(loaded.version, &records) {
                Ok(_) => return Ok(value),
                Err(err) if err.is_conflict() => {
                    debug!(attempt, error = %err, "Pool changed underneath us, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(PoolError::Contended {
            attempts: self.max_attempts,
        })
    }
}
