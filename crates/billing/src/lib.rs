//! # Billing
//!
//! Blocking client for the GitHub Enterprise billing REST API: Copilot seat
//! listing and cost center lookup, creation and membership.
//!
//! [`GitHubClient`] implements the `assignment` engine's [`SeatSource`] and
//! [`CostCenterClient`] traits, so it plugs straight into an orchestrator:
//!
//! ```ignore
//! use billing::GitHubClient;
//! use std::time::Duration;
//!
//! let github = GitHubClient::new("acme", token, Duration::from_secs(30));
//! let mut orchestrator = assignment::Orchestrator::new(&github, &github, &store);
//! ```
//!
//! Transient failures (rate limits, 5xx, network) are retried inside the
//! client; callers see either a result or a final error.
//!
//! [`SeatSource`]: assignment::SeatSource
//! [`CostCenterClient`]: assignment::CostCenterClient

pub mod client;
pub mod error;
pub mod retry;

pub use client::{DEFAULT_API_BASE, GitHubClient, GitHubCostCenter};
pub use error::{Error, ErrorCategory, Result};
pub use retry::{LogCallback, RetryCallback, RetryConfig, with_retry};
