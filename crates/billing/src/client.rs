//! GitHub Enterprise billing client.
//!
//! Implements [`SeatSource`] and [`CostCenterClient`] over the enterprise
//! REST API with a blocking `ureq` agent.
//!
//! # Rate Limiting
//!
//! A 429 (or a 403 with an exhausted rate limit) is retried after the wait
//! the server asks for through `Retry-After` or `X-RateLimit-Reset`, capped
//! by [`RetryConfig::max_delay`]. Server errors and transport failures are
//! retried with exponential backoff.

use crate::error::{Error, Result};
use crate::retry::{LogCallback, RetryConfig, with_retry};
use anyhow::Context;
use assignment::{CostCenterClient, CostCenterId, MAX_BATCH_SIZE, Seat, SeatSource, UserResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use ureq::http::{HeaderMap, Response};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// REST API version sent with every request.
const API_VERSION: &str = "2022-11-28";

/// Seats requested per page.
const SEATS_PER_PAGE: usize = 100;

const USER_AGENT: &str = concat!("ccsync/", env!("CARGO_PKG_VERSION"));

/// Client for one enterprise's billing endpoints.
pub struct GitHubClient {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// GitHub API base URL.
    api_base: String,
    enterprise: String,
    token: String,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Create a client with a per-request timeout.
    #[must_use]
    pub fn new(enterprise: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            api_base: DEFAULT_API_BASE.to_string(),
            enterprise: enterprise.into(),
            token: token.into(),
            retry: RetryConfig::default(),
        }
    }

    /// Use a different API base (GHE.com data residency, tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    #[must_use]
    pub fn enterprise(&self) -> &str {
        &self.enterprise
    }

    fn seats_url(&self) -> String {
        format!(
            "{}/enterprises/{}/copilot/billing/seats",
            self.api_base, self.enterprise
        )
    }

    fn cost_centers_url(&self) -> String {
        format!(
            "{}/enterprises/{}/settings/billing/cost-centers",
            self.api_base, self.enterprise
        )
    }

    fn cost_center_resource_url(&self, id: &CostCenterId) -> String {
        format!("{}/{}/resource", self.cost_centers_url(), id)
    }

    /// Fetch every Copilot seat, following pagination until a short page.
    pub fn fetch_seats(&self) -> Result<Vec<Seat>> {
        let url = self.seats_url();
        let mut seats = Vec::new();
        let mut page = 1usize;

        loop {
            let body: SeatsPage = with_retry(&self.retry, Some(&LogCallback), || {
                let response = self
                    .authorized(self.agent.get(&url))
                    .query("page", page.to_string())
                    .query("per_page", SEATS_PER_PAGE.to_string())
                    .call()?;
                read_json(response)
            })?;

            let count = body.seats.len();
            if page == 1
                && let Some(total) = body.total_seats
            {
                log::debug!("Enterprise reports {} seats", total);
            }
            seats.extend(body.seats.into_iter().filter_map(GitHubSeat::into_seat));
            log::info!("Fetched page {} with {} seats", page, count);

            if count < SEATS_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(seats)
    }

    /// List all cost centers of the enterprise, in any state.
    pub fn list_cost_centers(&self) -> Result<Vec<GitHubCostCenter>> {
        let url = self.cost_centers_url();
        let body: CostCentersPage = with_retry(&self.retry, Some(&LogCallback), || {
            let response = self.authorized(self.agent.get(&url)).call()?;
            read_json(response)
        })?;
        Ok(body.cost_centers)
    }

    /// Find an active cost center by exact name.
    pub fn find_cost_center(&self, name: &str) -> Result<Option<CostCenterId>> {
        let centers = self.list_cost_centers()?;
        Ok(find_active(&centers, name))
    }

    /// Create a cost center; an existing active one of that name is reused.
    pub fn create_cost_center(&self, name: &str) -> Result<CostCenterId> {
        let url = self.cost_centers_url();
        let created = with_retry(&self.retry, Some(&LogCallback), || {
            let response = self
                .authorized(self.agent.post(&url))
                .send_json(serde_json::json!({ "name": name }))?;
            read_json::<CreatedCostCenter>(response)
        });

        match created {
            Ok(body) => {
                log::info!("Created cost center '{}' with id {}", name, body.id);
                Ok(CostCenterId::new(body.id))
            }
            Err(Error::Conflict { message }) => {
                log::info!("Cost center '{}' already exists; looking up its id", name);
                self.find_cost_center(name)?.ok_or(Error::Conflict {
                    message: format!("{message} (no active cost center named '{name}')"),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Add up to [`MAX_BATCH_SIZE`] users to a cost center.
    ///
    /// A rejected request (400, 404, 422) rejects every user in it; any other
    /// failure is returned as an error.
    pub fn add_users(&self, id: &CostCenterId, usernames: &[String]) -> Result<Vec<UserResult>> {
        if usernames.len() > MAX_BATCH_SIZE {
            return Err(Error::BatchTooLarge {
                size: usernames.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        let url = self.cost_center_resource_url(id);
        let sent = with_retry(&self.retry, Some(&LogCallback), || {
            let response = self
                .authorized(self.agent.post(&url))
                .send_json(serde_json::json!({ "users": usernames }))?;
            check(response).map(|_| ())
        });

        match sent {
            Ok(()) => Ok(usernames.iter().map(UserResult::ok).collect()),
            Err(e) if e.is_rejection() => {
                let reason = e.to_string();
                Ok(usernames
                    .iter()
                    .map(|u| UserResult::rejected(u.as_str(), reason.as_str()))
                    .collect())
            }
            Err(e) => Err(e),
        }
    }

    fn authorized<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        request
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    }
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("enterprise", &self.enterprise)
            .field("token", &"<redacted>")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SeatSource for GitHubClient {
    fn list_seats(&self) -> anyhow::Result<Vec<Seat>> {
        self.fetch_seats()
            .with_context(|| format!("listing Copilot seats for enterprise '{}'", self.enterprise))
    }
}

impl CostCenterClient for GitHubClient {
    fn find_by_name(&self, name: &str) -> anyhow::Result<Option<CostCenterId>> {
        Ok(self.find_cost_center(name)?)
    }

    fn create(&self, name: &str) -> anyhow::Result<CostCenterId> {
        Ok(self.create_cost_center(name)?)
    }

    fn assign_batch(
        &self,
        cost_center: &CostCenterId,
        usernames: &[String],
    ) -> anyhow::Result<Vec<UserResult>> {
        Ok(self.add_users(cost_center, usernames)?)
    }
}

// =============================================================================
// Response handling
// =============================================================================

/// Pass a success response through; turn anything else into an error.
fn check(mut response: Response<ureq::Body>) -> Result<Response<ureq::Body>> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }

    let wait = rate_limit_wait(response.headers(), Utc::now());
    let exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0");
    let body = response.body_mut().read_to_string().unwrap_or_default();
    log::debug!("HTTP {} response: {}", status, body);
    Err(Error::from_status(status, error_message(&body), wait, exhausted))
}

fn read_json<T: DeserializeOwned>(response: Response<ureq::Body>) -> Result<T> {
    let mut response = check(response)?;
    Ok(response.body_mut().read_json()?)
}

/// Wait requested by the server, from `Retry-After` or `X-RateLimit-Reset`.
fn rate_limit_wait(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(secs) = header("retry-after").and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }

    let reset = header("x-ratelimit-reset").and_then(|v| v.trim().parse::<i64>().ok())?;
    let secs = (reset - now.timestamp()).max(0) + 1;
    u64::try_from(secs).ok().map(Duration::from_secs)
}

/// Pull `message` out of a GitHub error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }

    match serde_json::from_str::<ApiError>(body) {
        Ok(err) => err.message,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

fn find_active(centers: &[GitHubCostCenter], name: &str) -> Option<CostCenterId> {
    let mut found = None;
    for center in centers.iter().filter(|c| c.name == name) {
        if center.is_active() {
            log::debug!("Found active cost center '{}' with id {}", name, center.id);
            found = Some(CostCenterId::new(center.id.clone()));
            break;
        }
        log::warn!(
            "Ignoring inactive cost center '{}' ({}, state {})",
            name,
            center.id,
            center.state.as_deref().unwrap_or("unknown")
        );
    }
    found
}

// =============================================================================
// GitHub API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SeatsPage {
    #[serde(default)]
    total_seats: Option<u64>,
    #[serde(default)]
    seats: Vec<GitHubSeat>,
}

#[derive(Debug, Deserialize)]
struct GitHubSeat {
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    assignee: Option<GitHubAssignee>,
}

#[derive(Debug, Deserialize)]
struct GitHubAssignee {
    #[serde(default)]
    login: Option<String>,
}

impl GitHubSeat {
    /// Convert to a [`Seat`]; `None` when the seat has no login.
    fn into_seat(self) -> Option<Seat> {
        let Some(login) = self
            .assignee
            .and_then(|a| a.login)
            .filter(|l| !l.is_empty())
        else {
            log::warn!("Dropping Copilot seat without an assignee login");
            return None;
        };

        let created_at = self.created_at.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(e) => {
                    log::debug!("Unparseable created_at '{}' for {}: {}", raw, login, e);
                    None
                }
            }
        });

        Some(Seat::new(login, created_at))
    }
}

#[derive(Debug, Deserialize)]
struct CostCentersPage {
    #[serde(rename = "costCenters", default)]
    cost_centers: Vec<GitHubCostCenter>,
}

/// A cost center as listed by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCostCenter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

impl GitHubCostCenter {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("active"))
    }
}

#[derive(Debug, Deserialize)]
struct CreatedCostCenter {
    id: String,
}
