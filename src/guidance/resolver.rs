use serde::Serialize;

use crate::advisory::reconciler::{AdviceSource, AdvisoryReconciler, StepContext};
use crate::catalogue::roles::RoleProfile;
use crate::catalogue::workflows::Workflow;
use crate::guidance::page_state::PageState;
use crate::guidance::relevance;
use crate::guidance::types::PageElement;

/// Returned when nothing on the page can be acted on.
pub const CONTINUE_INSTRUCTION: &str = "Continue with your task. No actionable element is visible yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStatus {
    Resolved,
    NoCandidate,
}

/// Which signal chose `next_element`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSource {
    Workflow,
    Relevance,
    Advisory,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub status: ResolveStatus,
    pub next_element: Option<String>,
    pub instruction: String,
    pub rationale: String,
    pub is_error_recovery: bool,
    pub choice: ChoiceSource,
    pub advice_source: Option<AdviceSource>,
    pub workflow_id: String,
    /// Clamped, zero-based.
    pub step_index: usize,
    pub total_steps: usize,
    pub page_state: PageState,
}

impl Resolution {
    /// `"<steps before the current one>/<total>"`.
    pub fn step_progress(&self) -> String {
        format!("{}/{}", self.step_index, self.total_steps)
    }
}

pub struct StepResolver {
    reconciler: AdvisoryReconciler,
}

impl StepResolver {
    pub fn new(reconciler: AdvisoryReconciler) -> Self {
        Self { reconciler }
    }

    pub fn reconciler(&self) -> &AdvisoryReconciler {
        &self.reconciler
    }

    pub async fn resolve_next_step(
        &self,
        workflow: &Workflow,
        step_index: i64,
        page_state: &PageState,
        elements: &[PageElement],
        role: &RoleProfile,
        goal: &str,
    ) -> Resolution {
        let (index, step) = workflow.step(step_index);
        if index as i64 != step_index {
            tracing::debug!(requested = step_index, clamped = index, workflow = %workflow.id(), "step index clamped");
        }

        let mut resolution = Resolution {
            status: ResolveStatus::NoCandidate,
            next_element: None,
            instruction: CONTINUE_INSTRUCTION.to_string(),
            rationale: step.rationale.clone(),
            is_error_recovery: false,
            choice: ChoiceSource::None,
            advice_source: None,
            workflow_id: workflow.id().to_string(),
            step_index: index,
            total_steps: workflow.len(),
            page_state: page_state.clone(),
        };

        if elements.is_empty() {
            tracing::info!(workflow = %workflow.id(), step = index, "no visible elements, nothing to point at");
            return resolution;
        }

        // Workflows encode validated UI labels, so a visible step target wins.
        let (pick, choice) = match elements.iter().find(|e| e.has_label(&step.target)) {
            Some(element) => (element.text.clone(), ChoiceSource::Workflow),
            None => {
                let ranked = relevance::rank(elements, &role.focus_areas);
                // `elements` is non-empty, so the ranking is too.
                let top = &ranked[0];
                tracing::debug!(
                    target = %step.target,
                    top = %top.element.text,
                    score = top.score,
                    "step target not visible, using relevance pick"
                );
                (top.element.text.clone(), ChoiceSource::Relevance)
            }
        };

        let ctx = StepContext {
            workflow_id: workflow.id().to_string(),
            step_index: index,
            total_steps: workflow.len(),
            step: step.clone(),
            page_state: page_state.clone(),
            deterministic_pick: Some(pick.clone()),
        };
        let advice = self.reconciler.reconcile(role, goal, &ctx, elements).await;

        let overridden = advice.next_element.as_deref() != Some(pick.as_str());
        resolution.status = ResolveStatus::Resolved;
        resolution.choice = if overridden { ChoiceSource::Advisory } else { choice };
        resolution.next_element = advice.next_element.or(Some(pick));
        resolution.instruction = advice.instruction;
        resolution.rationale = advice.rationale;
        resolution.is_error_recovery = advice.is_error_recovery;
        resolution.advice_source = Some(advice.source);
        resolution
    }
}
