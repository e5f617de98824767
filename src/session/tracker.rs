use std::sync::Arc;

use crate::errors::{GuideError, GuideResult};
use crate::guidance::page_state::PageState;
use crate::session::store::SessionStore;
use crate::session::types::{ProgressReport, Recommendation, SessionRecord};

/// Session Progress Tracker over an injected store.
///
/// Sessions are created on demand and never expire; they disappear only when
/// the store does (process exit for the in-memory store).
pub struct ProgressTracker {
    store: Arc<dyn SessionStore>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn init_session(&self, role: &str, industry: &str, goal: &str, modules: Vec<String>) -> String {
        let record = SessionRecord::new(role, industry, goal, modules);
        let id = record.id.clone();
        self.store.put(record).await;
        tracing::info!(session = %id, role = %role, goal = %goal, "session started");
        id
    }

    /// Store a cumulative progress snapshot and derive the recommendation.
    ///
    /// Unknown ids are reported as `SessionNotFound`; no session is created.
    pub async fn record_progress(
        &self,
        session_id: &str,
        steps_completed: u32,
        mistakes: Vec<String>,
        time_spent_secs: f64,
    ) -> GuideResult<ProgressReport> {
        let updated = self
            .store
            .update(
                session_id,
                Box::new(move |record: &mut SessionRecord| {
                    record.steps_completed = steps_completed;
                    record.mistakes_made = mistakes;
                    record.time_spent_secs = time_spent_secs;
                    record.updated_at = chrono::Utc::now();
                }),
            )
            .await;

        let Some(record) = updated else {
            tracing::warn!(session = %session_id, "progress reported for unknown session");
            return Err(GuideError::SessionNotFound(session_id.to_string()));
        };

        let error_rate = record.error_rate();
        let report = ProgressReport {
            error_rate,
            recommendation: Recommendation::for_progress(record.steps_completed, error_rate),
        };
        tracing::info!(
            session = %session_id,
            steps = record.steps_completed,
            mistakes = record.mistakes_made.len(),
            error_rate = %report.error_rate_percent(),
            recommendation = report.recommendation.as_str(),
            "progress recorded"
        );
        Ok(report)
    }

    pub async fn get_session(&self, session_id: &str) -> GuideResult<SessionRecord> {
        self.store
            .get(session_id)
            .await
            .ok_or_else(|| GuideError::SessionNotFound(session_id.to_string()))
    }

    /// Note where the resolver last placed this session.
    pub async fn touch(
        &self,
        session_id: &str,
        step_index: usize,
        page_state: &PageState,
        error_recovery: bool,
    ) -> GuideResult<()> {
        let page = page_state.to_string();
        let updated = self
            .store
            .update(
                session_id,
                Box::new(move |record: &mut SessionRecord| {
                    record.last_step_index = Some(step_index);
                    record.last_page_state = Some(page);
                    if error_recovery {
                        record.recoveries += 1;
                    }
                    record.updated_at = chrono::Utc::now();
                }),
            )
            .await;
        match updated {
            Some(_) => Ok(()),
            None => Err(GuideError::SessionNotFound(session_id.to_string())),
        }
    }
}
