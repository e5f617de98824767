use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::advisory::parser::{parse_advice, AdviceDefaults};
use crate::advisory::prompt::step_prompt;
use crate::advisory::service::AdvisoryService;
use crate::catalogue::roles::RoleProfile;
use crate::catalogue::workflows::WorkflowStep;
use crate::config::AdvisoryConfig;
use crate::errors::GuideError;
use crate::guidance::page_state::PageState;
use crate::guidance::types::PageElement;

/// Used when the advisor's reply has no usable instruction line.
pub const DEFAULT_INSTRUCTION: &str = "Click the highlighted element to continue.";

/// Used when the advisor cannot be reached at all. Role-agnostic.
pub const FALLBACK_INSTRUCTION: &str =
    "Guidance is temporarily unavailable. Follow the highlighted element to continue your task.";

const DEFAULT_RATIONALE: &str = "This step moves your task forward.";

/// Where the user is inside the workflow, plus the deterministic pick.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub workflow_id: String,
    /// Clamped, zero-based.
    pub step_index: usize,
    pub total_steps: usize,
    pub step: WorkflowStep,
    pub page_state: PageState,
    pub deterministic_pick: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceSource {
    /// Parsed from an advisor reply (possibly with per-field defaults).
    Advisory,
    /// The advisor failed or timed out.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advice {
    pub next_element: Option<String>,
    pub instruction: String,
    pub rationale: String,
    pub is_error_recovery: bool,
    pub source: AdviceSource,
    pub defaulted_fields: Vec<&'static str>,
}

pub struct AdvisoryReconciler {
    service: Arc<dyn AdvisoryService>,
    timeout: Duration,
    max_elements: usize,
}

impl AdvisoryReconciler {
    pub fn new(service: Arc<dyn AdvisoryService>, config: &AdvisoryConfig) -> Self {
        Self {
            service,
            timeout: Duration::from_millis(config.timeout_ms),
            max_elements: config.max_elements,
        }
    }

    pub fn service(&self) -> Arc<dyn AdvisoryService> {
        self.service.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Always returns a well-formed result; advisor failures become fallback output.
    ///
    /// The advisor's element replaces the deterministic pick only when it flags
    /// the situation as error recovery.
    pub async fn reconcile(
        &self,
        role: &RoleProfile,
        goal: &str,
        ctx: &StepContext,
        elements: &[PageElement],
    ) -> Advice {
        let prompt = step_prompt(role, goal, ctx, elements, self.max_elements);
        let rationale_default = if ctx.step.rationale.trim().is_empty() {
            DEFAULT_RATIONALE
        } else {
            ctx.step.rationale.as_str()
        };

        let reply = match tokio::time::timeout(self.timeout, self.service.generate_advice(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return self.fallback(ctx, rationale_default, &e),
            Err(_) => {
                let e = GuideError::Timeout(self.timeout.as_millis() as u64);
                return self.fallback(ctx, rationale_default, &e);
            }
        };

        let pick = ctx.deterministic_pick.as_deref().unwrap_or("");
        let parsed = parse_advice(
            &reply,
            AdviceDefaults {
                next_action: pick,
                instruction: DEFAULT_INSTRUCTION,
                rationale: rationale_default,
            },
        );
        let defaulted_fields = parsed.defaulted_fields();
        if !defaulted_fields.is_empty() {
            tracing::warn!(
                workflow = %ctx.workflow_id,
                step = ctx.step_index,
                defaulted = ?defaulted_fields,
                "advisory reply incomplete, defaults substituted"
            );
        }

        let is_error_recovery = parsed.error_flag.is_true();
        let next_element = if is_error_recovery && !parsed.next_action.defaulted {
            Some(match_visible(&parsed.next_action.value, elements))
        } else {
            ctx.deterministic_pick.clone()
        };

        tracing::info!(
            workflow = %ctx.workflow_id,
            step = ctx.step_index,
            error_recovery = is_error_recovery,
            next = ?next_element,
            "advice reconciled"
        );

        Advice {
            next_element,
            instruction: parsed.instruction.value,
            rationale: parsed.rationale.value,
            is_error_recovery,
            source: AdviceSource::Advisory,
            defaulted_fields,
        }
    }

    fn fallback(&self, ctx: &StepContext, rationale: &str, error: &GuideError) -> Advice {
        tracing::warn!(
            workflow = %ctx.workflow_id,
            step = ctx.step_index,
            error = %error,
            "advisory unavailable, using static fallback"
        );
        Advice {
            next_element: ctx.deterministic_pick.clone(),
            instruction: FALLBACK_INSTRUCTION.to_string(),
            rationale: rationale.to_string(),
            is_error_recovery: false,
            source: AdviceSource::Fallback,
            defaulted_fields: vec!["next_action", "instruction", "rationale", "error_flag"],
        }
    }
}

/// Map free advisor text onto a visible label when possible.
///
/// Exact label match first, then the longest visible label the text mentions,
/// otherwise the advisor text itself.
fn match_visible(suggestion: &str, elements: &[PageElement]) -> String {
    if let Some(e) = elements.iter().find(|e| e.has_label(suggestion)) {
        return e.text.clone();
    }
    let lowered = suggestion.to_lowercase();
    elements
        .iter()
        .filter(|e| !e.text.trim().is_empty() && lowered.contains(&e.text.trim().to_lowercase()))
        .max_by_key(|e| e.text.trim().len())
        .map(|e| e.text.clone())
        .unwrap_or_else(|| suggestion.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Instant;

    use crate::advisory::service::PromptContext;
    use crate::catalogue::roles::RoleTable;
    use crate::catalogue::workflows::StepAction;
    use crate::errors::GuideResult;

    struct FixedAdvisor(&'static str);

    #[async_trait]
    impl AdvisoryService for FixedAdvisor {
        async fn generate_advice(&self, _prompt: &PromptContext) -> GuideResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingAdvisor;

    #[async_trait]
    impl AdvisoryService for FailingAdvisor {
        async fn generate_advice(&self, _prompt: &PromptContext) -> GuideResult<String> {
            Err(GuideError::LlmProvider("503 Service Unavailable".into()))
        }
    }

    struct SlowAdvisor;

    #[async_trait]
    impl AdvisoryService for SlowAdvisor {
        async fn generate_advice(&self, _prompt: &PromptContext) -> GuideResult<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("NEXT_ACTION: late".into())
        }
    }

    fn reconciler(service: impl AdvisoryService + 'static, timeout_ms: u64) -> AdvisoryReconciler {
        let config = AdvisoryConfig {
            timeout_ms,
            ..AdvisoryConfig::default()
        };
        AdvisoryReconciler::new(Arc::new(service), &config)
    }

    fn ctx() -> StepContext {
        StepContext {
            workflow_id: "purchase order".into(),
            step_index: 1,
            total_steps: 9,
            step: WorkflowStep {
                action: StepAction::Click,
                target: "Purchase Order".into(),
                required: true,
                rationale: "Opens the list of existing purchase orders.".into(),
            },
            page_state: PageState::Module("buying".into()),
            deterministic_pick: Some("Purchase Order".into()),
        }
    }

    fn elements() -> Vec<PageElement> {
        vec![
            PageElement::new("Purchase Order"),
            PageElement::new("Supplier"),
            PageElement::new("Buying"),
        ]
    }

    async fn run(service: impl AdvisoryService + 'static) -> Advice {
        let table = RoleTable::builtin("General User").unwrap();
        let role = table.lookup("Procurement Manager").value().clone();
        reconciler(service, 2000)
            .reconcile(&role, "purchase order", &ctx(), &elements())
            .await
    }

    #[tokio::test]
    async fn missing_error_line_means_no_recovery_and_default_instruction() {
        let advice = run(FixedAdvisor("NEXT_ACTION: Supplier\nREASON: because")).await;
        assert!(!advice.is_error_recovery);
        assert_eq!(advice.instruction, DEFAULT_INSTRUCTION);
        assert_eq!(advice.rationale, "because");
        assert_eq!(advice.next_element.as_deref(), Some("Purchase Order"));
        assert_eq!(advice.source, AdviceSource::Advisory);
        assert_eq!(advice.defaulted_fields, vec!["instruction", "error_flag"]);
    }

    #[tokio::test]
    async fn advisor_element_ignored_without_error_flag() {
        let advice = run(FixedAdvisor(
            "NEXT_ACTION: Supplier\nINSTRUCTION: Pick a supplier.\nIS_ERROR: false",
        ))
        .await;
        assert_eq!(advice.next_element.as_deref(), Some("Purchase Order"));
        assert_eq!(advice.instruction, "Pick a supplier.");
    }

    #[tokio::test]
    async fn error_flag_lets_advisor_override_and_maps_to_visible_label() {
        let advice = run(FixedAdvisor(
            "NEXT_ACTION: Click buying to go back\nINSTRUCTION: You left the Buying module; go back.\nIS_ERROR: true",
        ))
        .await;
        assert!(advice.is_error_recovery);
        assert_eq!(advice.next_element.as_deref(), Some("Buying"));
    }

    #[tokio::test]
    async fn unparseable_flag_is_false() {
        let advice = run(FixedAdvisor("NEXT_ACTION: Buying\nIS_ERROR: probably")).await;
        assert!(!advice.is_error_recovery);
        assert_eq!(advice.next_element.as_deref(), Some("Purchase Order"));
    }

    #[tokio::test]
    async fn service_failure_degrades_to_fallback() {
        let advice = run(FailingAdvisor).await;
        assert_eq!(advice.source, AdviceSource::Fallback);
        assert_eq!(advice.instruction, FALLBACK_INSTRUCTION);
        assert_eq!(advice.rationale, "Opens the list of existing purchase orders.");
        assert_eq!(advice.next_element.as_deref(), Some("Purchase Order"));
        assert!(!advice.is_error_recovery);
    }

    #[tokio::test]
    async fn timeout_degrades_within_bound() {
        let table = RoleTable::builtin("General User").unwrap();
        let role = table.default_profile().clone();
        let started = Instant::now();
        let advice = reconciler(SlowAdvisor, 50)
            .reconcile(&role, "purchase order", &ctx(), &elements())
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(advice.source, AdviceSource::Fallback);
        assert_eq!(advice.instruction, FALLBACK_INSTRUCTION);
    }

    #[test]
    fn match_visible_prefers_exact_then_longest_mention() {
        let els = vec![PageElement::new("New"), PageElement::new("New Purchase Order")];
        assert_eq!(match_visible("new", &els), "New");
        assert_eq!(match_visible("Click New Purchase Order now", &els), "New Purchase Order");
        assert_eq!(match_visible("  Settings ", &els), "Settings");
    }
}
