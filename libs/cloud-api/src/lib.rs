//! Client for the cloud-management REST API used by e2e fixtures.
//!
//! - [`client`]: authenticated JSON client with a fixed per-request timeout
//! - [`resources`]: the endpoint calls tests use to create and remove fixtures
//! - [`reaper`]: bulk deletion of every resource of a type, with a report

pub mod client;
pub mod config;
pub mod error;
pub mod reaper;
pub mod resources;

pub use client::{ApiClient, Page};
pub use config::ApiConfig;
pub use error::{ApiError, ReapError, ReapFailed};
pub use reaper::{
    cleanup_accounts, AccountCleanup, AccountOutcome, DeleteFailure, EndpointReport, FailurePolicy, ReapReport,
    ReapTarget, Reaper, ResourceFilter,
};
pub use resources::CreateLinode;
