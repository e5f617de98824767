use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use erp_guide_lib::advisory::reconciler::{DEFAULT_INSTRUCTION, FALLBACK_INSTRUCTION};
use erp_guide_lib::advisory::service::{AdvisoryService, PromptContext};
use erp_guide_lib::commands::handle_line;
use erp_guide_lib::config::AppConfig;
use erp_guide_lib::errors::GuideResult;
use erp_guide_lib::guidance::engine::{GuideEngine, ResolveInput};
use erp_guide_lib::guidance::resolver::{ChoiceSource, ResolveStatus};
use erp_guide_lib::guidance::types::PageElement;
use erp_guide_lib::session::store::InMemorySessionStore;

/// Replies with a fixed text and counts calls.
struct Scripted {
    reply: &'static str,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AdvisoryService for Scripted {
    async fn generate_advice(&self, _prompt: &PromptContext) -> GuideResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}

struct Stalled;

#[async_trait]
impl AdvisoryService for Stalled {
    async fn generate_advice(&self, _prompt: &PromptContext) -> GuideResult<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("INSTRUCTION: too late".into())
    }
}

fn engine_with(service: Arc<dyn AdvisoryService>, config: &AppConfig) -> GuideEngine {
    GuideEngine::from_config(config, service, Arc::new(InMemorySessionStore::new())).unwrap()
}

fn input(role: &str, goal: &str, locator: &str, labels: &[&str], step_index: i64) -> ResolveInput {
    ResolveInput {
        role: role.into(),
        goal: goal.into(),
        page_locator: locator.into(),
        elements: labels.iter().map(|l| PageElement::new(*l)).collect(),
        step_index,
        session_id: None,
    }
}

#[tokio::test]
async fn procurement_manager_starts_purchase_order_from_home() {
    let advisor = Scripted::new(
        "NEXT_ACTION: Buying\nINSTRUCTION: Open the Buying module.\nREASON: Orders live there.\nIS_ERROR: false",
    );
    let engine = engine_with(advisor.clone(), &AppConfig::default());
    let out = engine
        .classify_and_resolve(&input(
            "Procurement Manager",
            "purchase order",
            "/app/home",
            &["Buying", "Selling"],
            0,
        ))
        .await;

    let res = out.resolution;
    assert_eq!(res.status, ResolveStatus::Resolved);
    assert_eq!(res.next_element.as_deref(), Some("Buying"));
    assert!(!res.is_error_recovery);
    assert_eq!(res.choice, ChoiceSource::Workflow);
    assert_eq!(res.instruction, "Open the Buying module.");
    assert_eq!(res.page_state.to_string(), "home");
    assert!(!out.role_defaulted);
    assert!(!out.workflow_defaulted);
    assert_eq!(advisor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn step_index_is_clamped_at_both_ends() {
    let engine = engine_with(Scripted::new("IS_ERROR: false"), &AppConfig::default());
    for (requested, expected) in [(9, 8), (14, 8), (-3, 0), (0, 0)] {
        let out = engine
            .classify_and_resolve(&input("Accountant", "purchase order", "/app/purchase-order/new", &["Save"], requested))
            .await;
        assert_eq!(out.resolution.step_index, expected, "requested {requested}");
        assert_eq!(out.resolution.total_steps, 9);
    }
}

#[tokio::test]
async fn unknown_role_and_goal_fall_back_to_defaults() {
    let engine = engine_with(Scripted::new("IS_ERROR: false"), &AppConfig::default());
    let out = engine
        .classify_and_resolve(&input("zzz", "launch rockets", "/app/home", &["Search", "Buying"], 0))
        .await;
    assert!(out.role_defaulted);
    assert!(out.workflow_defaulted);
    assert_eq!(out.resolution.workflow_id, "purchase order");
    assert_eq!(out.resolution.next_element.as_deref(), Some("Buying"));
}

#[tokio::test]
async fn reply_without_error_flag_uses_defaults() {
    let engine = engine_with(Scripted::new("NEXT_ACTION: Selling"), &AppConfig::default());
    let out = engine
        .classify_and_resolve(&input("Procurement Manager", "purchase order", "/app/home", &["Buying", "Selling"], 0))
        .await;
    let res = out.resolution;
    assert!(!res.is_error_recovery);
    assert_eq!(res.instruction, DEFAULT_INSTRUCTION);
    assert_eq!(res.next_element.as_deref(), Some("Buying"));
    assert!(!res.rationale.is_empty());
}

#[tokio::test]
async fn stalled_advisor_yields_fallback_within_bound() {
    let mut config = AppConfig::default();
    config.advisory.timeout_ms = 100;
    let engine = engine_with(Arc::new(Stalled), &config);

    let started = Instant::now();
    let out = engine
        .classify_and_resolve(&input("Procurement Manager", "purchase order", "/app/home", &["Buying"], 0))
        .await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(out.resolution.instruction, FALLBACK_INSTRUCTION);
    assert_eq!(out.resolution.next_element.as_deref(), Some("Buying"));
    assert!(!out.resolution.is_error_recovery);
}

#[tokio::test]
async fn empty_page_is_not_sent_to_advisor() {
    let advisor = Scripted::new("NEXT_ACTION: Buying");
    let engine = engine_with(advisor.clone(), &AppConfig::default());
    let out = engine
        .classify_and_resolve(&input("Accountant", "sales invoice", "/app/home", &[], 0))
        .await;
    assert_eq!(out.resolution.status, ResolveStatus::NoCandidate);
    assert!(out.resolution.next_element.is_none());
    assert_eq!(advisor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn page_states_over_the_wire() {
    let engine = engine_with(Scripted::new("IS_ERROR: false"), &AppConfig::default());
    let cases = [
        ("/app/buying", "buying module"),
        ("/app/purchase-order/PO-0001", "po form"),
        ("/app/purchase-order", "po list"),
        ("/app/unknown-thing", "unknown"),
    ];
    for (locator, expected) in cases {
        let line = format!(
            r#"{{"op":"classify-and-resolve","role":"General User","goal":"purchase order","pageLocator":"{locator}","visibleElements":[{{"text":"New"}}],"stepIndex":2}}"#
        );
        let reply = handle_line(&engine, &line).await;
        assert_eq!(reply["data"]["pageState"], expected, "{locator}");
    }
}

#[tokio::test]
async fn progress_recommendations_and_session_touch() {
    let engine = engine_with(Scripted::new("IS_ERROR: false"), &AppConfig::default());
    let id = engine
        .init_session("Accountant", "Retail", "journal entry", vec!["Accounting".into()])
        .await;

    let report = engine
        .record_progress(&id, 12, vec!["wrong account".into()], 300.0)
        .await
        .unwrap();
    assert_eq!(report.error_rate_percent(), "8.3%");
    assert_eq!(report.recommendation.as_str(), "ready for advanced workflows");

    let report = engine
        .record_progress(&id, 4, vec!["a".into(), "b".into(), "c".into()], 320.0)
        .await
        .unwrap();
    assert_eq!(report.error_rate_percent(), "75.0%");
    assert_eq!(report.recommendation.as_str(), "slow down / review basics");

    // More mistakes than steps is reported as-is.
    let report = engine
        .record_progress(&id, 1, vec!["a".into(), "b".into()], 330.0)
        .await
        .unwrap();
    assert_eq!(report.error_rate_percent(), "200.0%");

    let mut resolve = input("Accountant", "journal entry", "/app/journal-entry/new", &["Save"], 3);
    resolve.session_id = Some(id.clone());
    engine.classify_and_resolve(&resolve).await;
    let record = engine.get_session(&id).await.unwrap();
    assert_eq!(record.steps_completed, 1);
    assert_eq!(record.last_step_index, Some(3));
}
