//! Per-endpoint calls used to build and tear down e2e fixtures.
//!
//! Resource payloads are passed through as opaque JSON; only the request
//! bodies the harness sends are typed.

use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{ApiClient, Page};
use crate::error::ApiError;

/// Collection endpoints.
pub mod endpoints {
    pub const DOMAINS: &str = "/domains";
    pub const NODEBALANCERS: &str = "/nodebalancers";
    pub const IMAGES: &str = "/images";
    pub const USERS: &str = "/account/users";
    pub const LINODES: &str = "/linode/instances";
    pub const VOLUMES: &str = "/volumes";
    pub const STACKSCRIPTS: &str = "/linode/stackscripts";
    pub const SSH_KEYS: &str = "/profile/sshkeys";
    pub const PROFILE: &str = "/profile";
}

pub const DEFAULT_IMAGE: &str = "linode/debian9";
pub const DEFAULT_REGION: &str = "us-east";
pub const DEFAULT_TYPE: &str = "g6-standard-1";

/// Body for creating a compute instance.
#[derive(Debug, Clone, Serialize)]
pub struct CreateLinode {
    pub backups_enabled: bool,
    pub booted: bool,
    pub image: String,
    pub region: String,
    pub root_pass: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CreateLinode {
    /// Booted Debian instance with the harness defaults.
    pub fn new(root_pass: impl Into<String>) -> Self {
        Self {
            backups_enabled: false,
            booted: true,
            image: DEFAULT_IMAGE.to_string(),
            region: DEFAULT_REGION.to_string(),
            root_pass: root_pass.into(),
            instance_type: DEFAULT_TYPE.to_string(),
            label: None,
            tags: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

#[derive(Debug, Serialize)]
struct AllocateIp {
    public: bool,
    #[serde(rename = "type")]
    ip_type: &'static str,
}

/// Filter for stack scripts owned by `username`, most deployed first.
pub fn stackscript_filter(username: &str) -> Value {
    json!({
        "username": username,
        "+order_by": "deployments_total",
        "+order": "desc",
    })
}

impl ApiClient {
    pub async fn create_linode(&self, request: &CreateLinode) -> Result<Value, ApiError> {
        self.post_json(endpoints::LINODES, request).await
    }

    pub async fn allocate_private_ip(&self, linode_id: u64) -> Result<Value, ApiError> {
        let body = AllocateIp {
            public: false,
            ip_type: "ipv4",
        };
        self.post_json(&format!("{}/{linode_id}/ips", endpoints::LINODES), &body)
            .await
    }

    pub async fn list_linodes(&self) -> Result<Page<Value>, ApiError> {
        self.get_json(endpoints::LINODES).await
    }

    pub async fn list_nodebalancers(&self) -> Result<Page<Value>, ApiError> {
        self.get_json(endpoints::NODEBALANCERS).await
    }

    pub async fn remove_nodebalancer(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{id}", endpoints::NODEBALANCERS))
            .await
    }

    pub async fn list_volumes(&self) -> Result<Page<Value>, ApiError> {
        self.get_json(endpoints::VOLUMES).await
    }

    pub async fn list_domains(&self) -> Result<Page<Value>, ApiError> {
        self.get_json(endpoints::DOMAINS).await
    }

    pub async fn remove_domain(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{id}", endpoints::DOMAINS)).await
    }

    /// Stack scripts authored by `owner`.
    pub async fn list_stackscripts(&self, owner: &str) -> Result<Page<Value>, ApiError> {
        self.get_json_filtered(endpoints::STACKSCRIPTS, &stackscript_filter(owner))
            .await
    }

    pub async fn remove_stackscript(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{id}", endpoints::STACKSCRIPTS))
            .await
    }

    /// First page of images that are not public.
    pub async fn list_private_images(&self) -> Result<Page<Value>, ApiError> {
        self.get_json_filtered(
            &format!("{}?page=1", endpoints::IMAGES),
            &json!({ "is_public": false }),
        )
        .await
    }

    pub async fn remove_image(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{id}", endpoints::IMAGES)).await
    }

    pub async fn list_ssh_keys(&self) -> Result<Page<Value>, ApiError> {
        self.get_json(endpoints::SSH_KEYS).await
    }

    pub async fn remove_ssh_key(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{id}", endpoints::SSH_KEYS)).await
    }

    pub async fn list_users(&self) -> Result<Page<Value>, ApiError> {
        self.get_json(endpoints::USERS).await
    }

    pub async fn remove_user(&self, username: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{username}", endpoints::USERS)).await
    }

    pub async fn get_profile(&self) -> Result<Value, ApiError> {
        self.get_json(endpoints::PROFILE).await
    }

    /// Apply a partial profile update and return the updated profile.
    pub async fn update_profile(&self, profile: &Value) -> Result<Value, ApiError> {
        self.put_json(endpoints::PROFILE, profile).await
    }
}
