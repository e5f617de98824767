//! Request boundary: shape validation and dispatch into the engine.
//!
//! Every request is one JSON object tagged by `op`. Structurally invalid
//! input is rejected here and never reaches the core.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalogue::atlas::AtlasRecord;
use crate::errors::{GuideError, GuideResult};
use crate::guidance::engine::{GuideEngine, ResolveInput};
use crate::guidance::resolver::ResolveStatus;
use crate::guidance::types::PageElement;
use crate::session::types::SessionRecord;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Request {
    ClassifyAndResolve(ResolveRequest),
    InitSession(InitSessionRequest),
    RecordProgress(RecordProgressRequest),
    GetSession(GetSessionRequest),
    AnalyzeJob(AnalyzeJobRequest),
    ListAtlas,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub role: String,
    pub goal: String,
    pub page_locator: String,
    pub visible_elements: Vec<PageElement>,
    pub step_index: i64,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSessionRequest {
    pub role: String,
    pub industry: String,
    pub goal: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProgressRequest {
    pub session_id: String,
    pub steps_completed: u32,
    pub mistakes: Vec<String>,
    /// Seconds.
    pub time_spent: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeJobRequest {
    pub job: String,
    #[serde(default)]
    pub industry: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub next_element: String,
    pub instruction: String,
    pub rationale: String,
    pub is_error_recovery: bool,
    pub step_progress: String,
    pub page_state: String,
    pub status: ResolveStatus,
    pub role_defaulted: bool,
    pub workflow_defaulted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProgressResponse {
    pub error_rate: String,
    pub recommendation: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub record: SessionRecord,
    pub error_rate: String,
}

#[derive(Debug, Serialize)]
pub struct AtlasResponse<'a> {
    pub records: &'a [AtlasRecord],
}

/// Parse one request line, mapping any shape error to `Validation`.
pub fn parse_request(line: &str) -> GuideResult<Request> {
    let request: Request =
        serde_json::from_str(line).map_err(|e| GuideError::Validation(e.to_string()))?;
    validate(&request)?;
    Ok(request)
}

fn validate(request: &Request) -> GuideResult<()> {
    match request {
        Request::RecordProgress(r) => {
            require_id(&r.session_id)?;
            if !r.time_spent.is_finite() || r.time_spent < 0.0 {
                return Err(GuideError::Validation(
                    "timeSpent must be a non-negative number".into(),
                ));
            }
            Ok(())
        }
        Request::GetSession(r) => require_id(&r.session_id),
        Request::ClassifyAndResolve(r) => match &r.session_id {
            Some(id) => require_id(id),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

fn require_id(session_id: &str) -> GuideResult<()> {
    if session_id.trim().is_empty() {
        return Err(GuideError::Validation("sessionId must not be blank".into()));
    }
    Ok(())
}

pub async fn dispatch(engine: &GuideEngine, request: Request) -> GuideResult<Value> {
    match request {
        Request::ClassifyAndResolve(r) => {
            // Blank labels cannot be pointed at.
            let elements: Vec<PageElement> = r
                .visible_elements
                .into_iter()
                .filter(|e| !e.text.trim().is_empty())
                .collect();
            let input = ResolveInput {
                role: r.role,
                goal: r.goal,
                page_locator: r.page_locator,
                elements,
                step_index: r.step_index,
                session_id: r.session_id,
            };
            let outcome = engine.classify_and_resolve(&input).await;
            let res = outcome.resolution;
            to_value(ResolveResponse {
                step_progress: res.step_progress(),
                next_element: res.next_element.unwrap_or_default(),
                instruction: res.instruction,
                rationale: res.rationale,
                is_error_recovery: res.is_error_recovery,
                page_state: res.page_state.to_string(),
                status: res.status,
                role_defaulted: outcome.role_defaulted,
                workflow_defaulted: outcome.workflow_defaulted,
            })
        }
        Request::InitSession(r) => {
            let session_id = engine.init_session(&r.role, &r.industry, &r.goal, r.modules).await;
            to_value(InitSessionResponse { session_id })
        }
        Request::RecordProgress(r) => {
            let report = engine
                .record_progress(&r.session_id, r.steps_completed, r.mistakes, r.time_spent)
                .await?;
            to_value(RecordProgressResponse {
                error_rate: report.error_rate_percent(),
                recommendation: report.recommendation.as_str().to_string(),
            })
        }
        Request::GetSession(r) => {
            let record = engine.get_session(&r.session_id).await?;
            let error_rate = record.error_rate_percent();
            to_value(SessionResponse { record, error_rate })
        }
        Request::AnalyzeJob(r) => to_value(engine.analyze_job(&r.job, &r.industry).await),
        Request::ListAtlas => to_value(AtlasResponse {
            records: engine.atlas().records(),
        }),
    }
}

fn to_value<T: Serialize>(data: T) -> GuideResult<Value> {
    Ok(serde_json::to_value(data)?)
}

/// Handle one raw line and produce the response envelope. Never fails.
pub async fn handle_line(engine: &GuideEngine, line: &str) -> Value {
    let result = match parse_request(line) {
        Ok(request) => dispatch(engine, request).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(data) => json!({ "ok": true, "data": data }),
        Err(e) => error_reply(&e),
    }
}

pub fn error_reply(e: &GuideError) -> Value {
    tracing::debug!(kind = e.kind(), error = %e, "request rejected");
    json!({ "ok": false, "kind": e.kind(), "error": e })
}
