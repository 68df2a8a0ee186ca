//! Completion-service client: daily completion flags and result reporting.
//!
//! The service keeps one boolean per mini-game and day.  When the menu opens
//! the flags are fetched in the background; a session started for a game
//! whose flag is already set is played without rewards.  At game-over a
//! rewarded session sends one best-effort report.
//!
//! Both calls run on Bevy's [`IoTaskPool`] with a bounded timeout, so the
//! frame loop never waits on the network.  Failures are logged at `warn` and
//! never retried.

use crate::config::{ReportConfig, StackConfig};
use crate::error::{StackError, StackResult};
use crate::state::GameSessionResult;
use bevy::prelude::*;
use bevy::tasks::{block_on, futures_lite::future, IoTaskPool, Task};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

// ── Service trait ────────────────────────────────────────────────────────────

/// One finished session as the completion service records it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReport {
    pub login_id: String,
    pub index: usize,
    pub completed: bool,
    pub coins: u32,
    pub duration_secs: u32,
    pub score: u32,
    /// Fall direction (`left`/`right`), or `completed`.
    pub description: String,
}

impl CompletionReport {
    pub fn from_result(result: &GameSessionResult, login_id: &str, index: usize) -> Self {
        Self {
            login_id: login_id.to_string(),
            index,
            completed: result.completed,
            coins: result.coins,
            duration_secs: result.duration_secs,
            score: result.score,
            description: result
                .fail_direction
                .map_or("completed", |d| d.label())
                .to_string(),
        }
    }
}

/// Wire body of the `PATCH` request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionPayload<'a> {
    index: usize,
    completed: bool,
    coin: u32,
    duration_sec: u32,
    score: u32,
    description: &'a str,
}

/// Remote store of per-game completion flags.
pub trait CompletionService: Send + Sync + 'static {
    /// Today's completion flags for `login_id`, indexed by game.
    fn fetch_status(&self, login_id: &str) -> StackResult<Vec<bool>>;

    /// Record a finished session.
    fn report(&self, report: &CompletionReport) -> StackResult<()>;
}

/// JSON body of a completion report.
pub fn report_body(report: &CompletionReport) -> StackResult<String> {
    Ok(serde_json::to_string(&CompletionPayload {
        index: report.index,
        completed: report.completed,
        coin: report.coins,
        duration_sec: report.duration_secs,
        score: report.score,
        description: &report.description,
    })?)
}

/// Decode the status body: a JSON array of booleans, possibly itself
/// wrapped in a JSON string.
pub fn parse_status_body(body: &str) -> StackResult<Vec<bool>> {
    match serde_json::from_str::<serde_json::Value>(body)? {
        serde_json::Value::String(inner) => Ok(serde_json::from_str(&inner)?),
        value => Ok(serde_json::from_value(value)?),
    }
}

// ── HTTP implementation ──────────────────────────────────────────────────────

/// [`CompletionService`] over HTTP at `{base_url}/game-complete`.
pub struct HttpCompletionService {
    agent: ureq::Agent,
    endpoint: String,
    authorization: String,
}

impl HttpCompletionService {
    pub fn new(config: &ReportConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build();
        Self {
            agent,
            endpoint: format!("{}/game-complete", config.base_url.trim_end_matches('/')),
            authorization: config.authorization.clone(),
        }
    }

    fn authorize(&self, request: ureq::Request, login_id: &str) -> ureq::Request {
        let request = request.set("login-id", login_id);
        if self.authorization.is_empty() {
            request
        } else {
            request.set("Authorization", &self.authorization)
        }
    }
}

impl CompletionService for HttpCompletionService {
    fn fetch_status(&self, login_id: &str) -> StackResult<Vec<bool>> {
        let response = self
            .authorize(self.agent.get(&self.endpoint), login_id)
            .call()?;
        let body = response
            .into_string()
            .map_err(|e| StackError::Decode(e.to_string()))?;
        parse_status_body(&body)
    }

    fn report(&self, report: &CompletionReport) -> StackResult<()> {
        let body = report_body(report)?;
        self.authorize(self.agent.request("PATCH", &self.endpoint), &report.login_id)
            .set("Content-Type", "application/json")
            .send_string(&body)?;
        Ok(())
    }
}

// ── Resources ────────────────────────────────────────────────────────────────

/// The configured completion service, or `None` when reporting is disabled.
#[derive(Resource, Clone, Default)]
pub struct CompletionClient(pub Option<Arc<dyn CompletionService>>);

impl CompletionClient {
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }
}

/// Last fetched completion flags.
#[derive(Resource, Debug, Clone, Default)]
pub struct CompletionStatus {
    pub flags: Option<Vec<bool>>,
}

impl CompletionStatus {
    /// Whether the game at `index` was already completed today.
    /// Unknown status counts as not completed.
    pub fn is_completed(&self, index: usize) -> bool {
        self.flags
            .as_ref()
            .and_then(|f| f.get(index).copied())
            .unwrap_or(false)
    }
}

/// Whether a session of the game at `index` should earn rewards.
pub fn rewards_available(client: &CompletionClient, status: &CompletionStatus, index: usize) -> bool {
    client.is_enabled() && !status.is_completed(index)
}

/// In-flight status fetch.
#[derive(Component)]
pub struct StatusFetch(Task<StackResult<Vec<bool>>>);

// ── Systems ──────────────────────────────────────────────────────────────────

/// Startup system: build the HTTP client when a base URL is configured.
pub fn setup_completion_client(mut commands: Commands, config: Res<StackConfig>) {
    if config.report.is_enabled() {
        let service = HttpCompletionService::new(&config.report);
        info!("[SETUP] Completion reports go to {}", service.endpoint);
        commands.insert_resource(CompletionClient(Some(Arc::new(service))));
    } else {
        info!("[SETUP] No completion service configured; rewards disabled");
    }
}

/// Start fetching completion flags in the background.
pub fn request_completion_status(
    mut commands: Commands,
    client: Res<CompletionClient>,
    config: Res<StackConfig>,
    pending: Query<(), With<StatusFetch>>,
) {
    let Some(service) = client.0.clone() else {
        return;
    };
    if !pending.is_empty() {
        return;
    }
    let login_id = config.report.login_id.clone();
    let task = IoTaskPool::get().spawn(async move { service.fetch_status(&login_id) });
    commands.spawn(StatusFetch(task));
}

/// Collect a finished status fetch.
pub fn poll_completion_status(
    mut commands: Commands,
    mut status: ResMut<CompletionStatus>,
    mut fetches: Query<(Entity, &mut StatusFetch)>,
) {
    for (entity, mut fetch) in fetches.iter_mut() {
        let Some(result) = block_on(future::poll_once(&mut fetch.0)) else {
            continue;
        };
        match result {
            Ok(flags) => {
                debug!("Completion flags: {:?}", flags);
                status.flags = Some(flags);
            }
            Err(e) => warn!("Could not fetch completion status: {e}"),
        }
        commands.entity(entity).despawn();
    }
}

/// Send a report in the background; the outcome is only logged.
pub fn dispatch_report(client: &CompletionClient, report: CompletionReport) {
    let Some(service) = client.0.clone() else {
        return;
    };
    IoTaskPool::get()
        .spawn(async move {
            match service.report(&report) {
                Ok(()) => info!(
                    "Reported game {} (score {}, {} coins)",
                    report.index, report.score, report.coins
                ),
                Err(e) => warn!("Completion report failed: {e}"),
            }
        })
        .detach();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FailDirection, GameVariant};

    #[test]
    fn status_body_accepts_plain_and_wrapped_arrays() {
        assert_eq!(
            parse_status_body("[false,true,false]").unwrap(),
            vec![false, true, false]
        );
        assert_eq!(
            parse_status_body("\"[true,false]\"").unwrap(),
            vec![true, false]
        );
        assert!(matches!(
            parse_status_body("{\"ok\":true}"),
            Err(StackError::Decode(_))
        ));
    }

    #[test]
    fn report_body_uses_service_field_names() {
        let result = GameSessionResult {
            variant: GameVariant::Boxes,
            stacked: 9,
            score: 84,
            duration_secs: 41,
            fail_direction: Some(FailDirection::Left),
            completed: true,
            coins: 11,
        };
        let report = CompletionReport::from_result(&result, "kim", 3);
        let value: serde_json::Value = serde_json::from_str(&report_body(&report).unwrap()).unwrap();
        assert_eq!(value["index"], 3);
        assert_eq!(value["coin"], 11);
        assert_eq!(value["durationSec"], 41);
        assert_eq!(value["description"], "left");
        assert_eq!(value["completed"], true);
    }

    #[test]
    fn unknown_status_still_offers_rewards_when_enabled() {
        struct Offline;
        impl CompletionService for Offline {
            fn fetch_status(&self, _: &str) -> StackResult<Vec<bool>> {
                Err(StackError::Http("offline".into()))
            }
            fn report(&self, _: &CompletionReport) -> StackResult<()> {
                Ok(())
            }
        }
        let client = CompletionClient(Some(Arc::new(Offline)));
        let mut status = CompletionStatus::default();
        assert!(rewards_available(&client, &status, 3));
        status.flags = Some(vec![false, false, false, true]);
        assert!(!rewards_available(&client, &status, 3));
        assert!(!rewards_available(&CompletionClient::default(), &CompletionStatus::default(), 3));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let config = ReportConfig {
            base_url: "http://localhost:8080/api/".into(),
            ..ReportConfig::default()
        };
        assert_eq!(
            HttpCompletionService::new(&config).endpoint,
            "http://localhost:8080/api/game-complete"
        );
    }
}
