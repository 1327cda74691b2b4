//! Bulk resource reaper.
//!
//! Lists every resource of each target type, filters the list, and deletes
//! what remains. All endpoints are reaped concurrently and every delete inside
//! an endpoint runs concurrently; a reap only returns once every spawned
//! delete has settled, with the outcome of each one in the [`ReapReport`].
//!
//! There is no ordering between endpoints, so a resource may be deleted
//! before something that depends on it; the API rejects those deletes and
//! they show up as failures.

use fixture_pool::CredentialRecord;
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::client::ApiClient;
use crate::config::ApiConfig;
use crate::error::{ApiError, ReapError, ReapFailed};
use crate::resources::endpoints;

/// Which listed resources are eligible for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceFilter {
    All,
    /// Only images whose `is_public` is exactly `false`.
    PrivateImagesOnly,
    /// Everything except the user with this username.
    ExcludeUsername(String),
}

impl ResourceFilter {
    pub fn keep(&self, item: &Value) -> bool {
        match self {
            Self::All => true,
            Self::PrivateImagesOnly => item.get("is_public") == Some(&Value::Bool(false)),
            Self::ExcludeUsername(username) => {
                item.get("username").and_then(Value::as_str) != Some(username.as_str())
            }
        }
    }
}

/// How per-item delete failures affect the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record failures in the report and carry on.
    Collect,
    /// Still wait for every delete, then fail with the first failure.
    FirstError,
}

/// One resource type to reap.
#[derive(Debug, Clone)]
pub struct ReapTarget {
    pub endpoint: String,
    pub filter: ResourceFilter,
    pub policy: FailurePolicy,
}

impl ReapTarget {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            filter: ResourceFilter::All,
            policy: FailurePolicy::Collect,
        }
    }

    pub fn filter(mut self, filter: ResourceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Targets for wiping an account: domains, node balancers, private images,
/// and every user except `keep_user`.
pub fn account_targets(keep_user: Option<&str>) -> Vec<ReapTarget> {
    let users = match keep_user {
        Some(username) => ResourceFilter::ExcludeUsername(username.to_string()),
        None => ResourceFilter::All,
    };

    vec![
        ReapTarget::new(endpoints::DOMAINS),
        ReapTarget::new(endpoints::NODEBALANCERS),
        ReapTarget::new(endpoints::IMAGES).filter(ResourceFilter::PrivateImagesOnly),
        ReapTarget::new(endpoints::USERS).filter(users),
    ]
}

/// Path segment identifying a resource: its `id`, else its `username`.
pub fn resource_key(item: &Value) -> Option<String> {
    match item.get("id") {
        Some(Value::Number(id)) => Some(id.to_string()),
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        _ => item
            .get("username")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
    }
}

/// A delete that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

/// Outcome of reaping one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointReport {
    pub endpoint: String,
    pub policy: FailurePolicy,
    /// Resources returned by the list call.
    pub listed: usize,
    /// Resources the filter kept out of deletion.
    pub skipped: usize,
    /// Keys of resources deleted successfully, in listing order.
    pub deleted: Vec<String>,
    /// Failed deletes, in listing order.
    pub failures: Vec<DeleteFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_error: Option<String>,
}

impl EndpointReport {
    fn new(target: &ReapTarget) -> Self {
        Self {
            endpoint: target.endpoint.clone(),
            policy: target.policy,
            listed: 0,
            skipped: 0,
            deleted: Vec::new(),
            failures: Vec::new(),
            list_error: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.list_error.is_none() && self.failures.is_empty()
    }

    fn first_error(&self) -> Option<ReapError> {
        if let Some(message) = &self.list_error {
            return Some(ReapError::List {
                endpoint: self.endpoint.clone(),
                message: message.clone(),
            });
        }
        self.failures.first().map(|failure| ReapError::Delete {
            endpoint: self.endpoint.clone(),
            key: failure.key.clone(),
            message: failure.message.clone(),
        })
    }
}

/// Outcome of a reap across endpoints, in target order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    pub endpoints: Vec<EndpointReport>,
}

impl ReapReport {
    pub fn is_clean(&self) -> bool {
        self.endpoints.iter().all(EndpointReport::is_clean)
    }

    pub fn total_deleted(&self) -> usize {
        self.endpoints.iter().map(|e| e.deleted.len()).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.endpoints
            .iter()
            .map(|e| e.failures.len() + usize::from(e.list_error.is_some()))
            .sum()
    }

    pub fn endpoint(&self, endpoint: &str) -> Option<&EndpointReport> {
        self.endpoints.iter().find(|e| e.endpoint == endpoint)
    }

    /// Fail with the first failure of any endpoint whose policy is
    /// [`FailurePolicy::FirstError`]. The error keeps the whole report.
    pub fn into_result(self) -> Result<Self, ReapFailed> {
        let first = self
            .endpoints
            .iter()
            .filter(|e| e.policy == FailurePolicy::FirstError)
            .find_map(EndpointReport::first_error);
        match first {
            Some(error) => Err(ReapFailed {
                error,
                report: self,
            }),
            None => Ok(self),
        }
    }
}

/// Deletes every resource of the given types from one account.
#[derive(Debug, Clone)]
pub struct Reaper {
    client: ApiClient,
}

impl Reaper {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Reap all targets concurrently and wait for every delete to settle.
    pub async fn reap(&self, targets: Vec<ReapTarget>) -> ReapReport {
        let mut reports: Vec<EndpointReport> = targets
            .iter()
            .map(|target| {
                let mut report = EndpointReport::new(target);
                report.list_error = Some("reap task did not complete".to_string());
                report
            })
            .collect();

        let mut tasks = JoinSet::new();
        for (index, target) in targets.into_iter().enumerate() {
            let client = self.client.clone();
            tasks.spawn(async move { (index, reap_endpoint(client, target).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = report,
                Err(err) => error!(error = %err, "Reap task failed"),
            }
        }

        ReapReport { endpoints: reports }
    }

    /// Wipe domains, node balancers, private images and secondary users.
    /// `keep_user` is the account's own username, which is never deleted.
    pub async fn delete_all(&self, keep_user: Option<&str>) -> ReapReport {
        self.reap(account_targets(keep_user)).await
    }

    pub async fn remove_all_linodes(&self) -> ReapReport {
        self.reap(vec![ReapTarget::new(endpoints::LINODES)]).await
    }

    /// Delete every volume, failing with the first delete error (in listing
    /// order) once all deletes have settled.
    pub async fn remove_all_volumes(&self) -> Result<ReapReport, ReapFailed> {
        self.reap(vec![
            ReapTarget::new(endpoints::VOLUMES).policy(FailurePolicy::FirstError)
        ])
        .await
        .into_result()
    }
}

async fn reap_endpoint(client: ApiClient, target: ReapTarget) -> EndpointReport {
    let mut report = EndpointReport::new(&target);

    let items: Vec<Value> = match client.list_all(&target.endpoint).await {
        Ok(items) => items,
        Err(err) => {
            warn!(endpoint = %target.endpoint, error = %err, "Failed to list resources");
            report.list_error = Some(err.to_string());
            return report;
        }
    };
    report.listed = items.len();

    // Outcomes carry their list position so the report follows listing order.
    let mut deleted: Vec<(usize, String)> = Vec::new();
    let mut failures: Vec<(usize, DeleteFailure)> = Vec::new();

    let mut deletes = JoinSet::new();
    for (position, item) in items.iter().enumerate() {
        if !target.filter.keep(item) {
            continue;
        }
        let Some(key) = resource_key(item) else {
            failures.push((
                position,
                DeleteFailure {
                    key: item.to_string(),
                    status: None,
                    message: "resource has neither id nor username".to_string(),
                },
            ));
            continue;
        };

        let client = client.clone();
        let path = format!("{}/{}", target.endpoint, key);
        deletes.spawn(async move {
            let result = client.delete(&path).await;
            (position, key, result)
        });
    }
    report.skipped = report.listed - deletes.len() - failures.len();

    while let Some(joined) = deletes.join_next().await {
        match joined {
            Ok((position, key, Ok(()))) => deleted.push((position, key)),
            Ok((position, key, Err(err))) => {
                warn!(endpoint = %target.endpoint, key = %key, error = %err, "Failed to delete resource");
                failures.push((
                    position,
                    DeleteFailure {
                        key,
                        status: err.status(),
                        message: err.to_string(),
                    },
                ));
            }
            Err(err) => {
                error!(endpoint = %target.endpoint, error = %err, "Delete task failed");
                failures.push((
                    usize::MAX,
                    DeleteFailure {
                        key: "<unknown>".to_string(),
                        status: None,
                        message: err.to_string(),
                    },
                ));
            }
        }
    }

    deleted.sort_by_key(|(position, _)| *position);
    failures.sort_by_key(|(position, _)| *position);
    report.deleted = deleted.into_iter().map(|(_, key)| key).collect();
    report.failures = failures.into_iter().map(|(_, failure)| failure).collect();

    info!(
        endpoint = %report.endpoint,
        listed = report.listed,
        skipped = report.skipped,
        deleted = report.deleted.len(),
        failed = report.failures.len(),
        "Reaped endpoint"
    );
    report
}

/// What happened to one pooled account during cleanup.
#[derive(Debug)]
pub enum AccountOutcome {
    Reaped(ReapReport),
    /// No token has been captured or preset for the account yet.
    SkippedNoToken,
    /// The client could not be built for the account's token.
    Failed(ApiError),
}

/// Cleanup result for one pooled account.
#[derive(Debug)]
pub struct AccountCleanup {
    pub username: String,
    pub outcome: AccountOutcome,
}

/// Run [`Reaper::delete_all`] for every pooled account, keeping each
/// account's own user. Accounts are reaped concurrently; accounts without a
/// token are returned as skipped, in pool order with the rest.
pub async fn cleanup_accounts(
    config: &ApiConfig,
    accounts: &[CredentialRecord],
) -> Vec<AccountCleanup> {
    let runs = accounts.iter().map(|account| async move {
        let outcome = if account.token.is_empty() {
            warn!(username = %account.username, "Skipping cleanup for account without a token");
            AccountOutcome::SkippedNoToken
        } else {
            match ApiClient::new(&config.with_token(account.token.as_str())) {
                Ok(client) => AccountOutcome::Reaped(
                    Reaper::new(client)
                        .delete_all(Some(account.username.as_str()))
                        .await,
                ),
                Err(err) => AccountOutcome::Failed(err),
            }
        };
        AccountCleanup {
            username: account.username.clone(),
            outcome,
        }
    });

    join_all(runs).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn private_image_filter_requires_explicit_false() {
        let filter = ResourceFilter::PrivateImagesOnly;
        assert!(filter.keep(&json!({ "id": "private/1", "is_public": false })));
        assert!(!filter.keep(&json!({ "id": "linode/debian9", "is_public": true })));
        assert!(!filter.keep(&json!({ "id": "private/2" })));
    }

    #[test]
    fn username_filter_spares_only_that_user() {
        let filter = ResourceFilter::ExcludeUsername("root".to_string());
        assert!(!filter.keep(&json!({ "username": "root" })));
        assert!(filter.keep(&json!({ "username": "child" })));
    }

    #[test]
    fn key_prefers_id_over_username() {
        assert_eq!(resource_key(&json!({ "id": 42, "username": "x" })).as_deref(), Some("42"));
        assert_eq!(
            resource_key(&json!({ "id": "private/7" })).as_deref(),
            Some("private/7")
        );
        assert_eq!(resource_key(&json!({ "username": "child" })).as_deref(), Some("child"));
        assert_eq!(resource_key(&json!({ "label": "orphan" })), None);
    }

    #[test]
    fn account_targets_cover_the_four_types() {
        let targets = account_targets(Some("root"));
        let endpoints: Vec<_> = targets.iter().map(|t| t.endpoint.as_str()).collect();
        assert_eq!(
            endpoints,
            ["/domains", "/nodebalancers", "/images", "/account/users"]
        );
        assert_eq!(
            targets[3].filter,
            ResourceFilter::ExcludeUsername("root".to_string())
        );
        assert!(targets.iter().all(|t| t.policy == FailurePolicy::Collect));
    }

    #[test]
    fn first_error_policy_surfaces_failures() {
        let mut volumes = EndpointReport::new(
            &ReapTarget::new("/volumes").policy(FailurePolicy::FirstError),
        );
        volumes.failures.push(DeleteFailure {
            key: "7".to_string(),
            status: Some(400),
            message: "attached".to_string(),
        });
        let mut domains = EndpointReport::new(&ReapTarget::new("/domains"));
        domains.list_error = Some("boom".to_string());

        let report = ReapReport {
            endpoints: vec![domains.clone()],
        };
        assert!(report.into_result().is_ok());

        let report = ReapReport {
            endpoints: vec![domains, volumes],
        };
        let failed = report.into_result().unwrap_err();
        assert_eq!(
            failed.error,
            ReapError::Delete {
                endpoint: "/volumes".to_string(),
                key: "7".to_string(),
                message: "attached".to_string(),
            }
        );
        assert_eq!(failed.report.endpoints.len(), 2);
    }
}
