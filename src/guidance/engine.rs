use std::sync::Arc;

use crate::advisory::reconciler::AdvisoryReconciler;
use crate::advisory::service::AdvisoryService;
use crate::catalogue::atlas::Atlas;
use crate::catalogue::roles::{builtin_roles, load_roles, RoleTable};
use crate::catalogue::workflows::{builtin_workflows, load_workflows, WorkflowCatalogue};
use crate::config::AppConfig;
use crate::errors::GuideResult;
use crate::guidance::job_analysis::{self, JobAnalysis};
use crate::guidance::page_state::PageClassifier;
use crate::guidance::resolver::{Resolution, StepResolver};
use crate::guidance::types::PageElement;
use crate::session::store::SessionStore;
use crate::session::tracker::ProgressTracker;
use crate::session::types::{ProgressReport, SessionRecord};

/// One guidance request, already validated at the boundary.
#[derive(Debug, Clone)]
pub struct ResolveInput {
    pub role: String,
    pub goal: String,
    pub page_locator: String,
    pub elements: Vec<PageElement>,
    pub step_index: i64,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GuideOutcome {
    pub resolution: Resolution,
    pub role_defaulted: bool,
    pub workflow_defaulted: bool,
}

/// Owns the catalogues and collaborators; shared across requests behind an `Arc`.
pub struct GuideEngine {
    workflows: WorkflowCatalogue,
    roles: RoleTable,
    atlas: Atlas,
    classifier: PageClassifier,
    resolver: StepResolver,
    tracker: ProgressTracker,
}

impl GuideEngine {
    pub fn new(
        workflows: WorkflowCatalogue,
        roles: RoleTable,
        atlas: Atlas,
        classifier: PageClassifier,
        reconciler: AdvisoryReconciler,
        tracker: ProgressTracker,
    ) -> Self {
        Self {
            workflows,
            roles,
            atlas,
            classifier,
            resolver: StepResolver::new(reconciler),
            tracker,
        }
    }

    /// Build the engine from built-in tables plus any files named in `[catalogue]`.
    pub fn from_config(
        config: &AppConfig,
        service: Arc<dyn AdvisoryService>,
        store: Arc<dyn SessionStore>,
    ) -> GuideResult<Self> {
        let cat = &config.catalogue;

        let mut workflows = builtin_workflows();
        if let Some(path) = &cat.workflows_file {
            workflows.extend(load_workflows(path)?);
        }
        let workflows = WorkflowCatalogue::new(workflows, &cat.default_workflow)?;

        let mut roles = builtin_roles();
        if let Some(path) = &cat.roles_file {
            roles.extend(load_roles(path)?);
        }
        let roles = RoleTable::new(roles, &cat.default_role)?;

        let atlas = cat
            .atlas_file
            .as_deref()
            .map(Atlas::load_or_empty)
            .unwrap_or_default();

        tracing::info!(
            workflows = ?workflows.ids(),
            onboarding = workflows.onboarding_flows().len(),
            default_role = %cat.default_role,
            atlas_records = atlas.len(),
            "guide engine ready"
        );

        Ok(Self::new(
            workflows,
            roles,
            atlas,
            PageClassifier::builtin(),
            AdvisoryReconciler::new(service, &config.advisory),
            ProgressTracker::new(store),
        ))
    }

    pub async fn classify_and_resolve(&self, input: &ResolveInput) -> GuideOutcome {
        let role = self.roles.lookup(&input.role);
        let workflow = self.workflows.lookup(&input.goal);
        let page_state = self.classifier.classify(&input.page_locator, &input.elements);

        let resolution = self
            .resolver
            .resolve_next_step(
                workflow.value(),
                input.step_index,
                &page_state,
                &input.elements,
                role.value(),
                &input.goal,
            )
            .await;

        if let Some(session_id) = &input.session_id {
            if let Err(e) = self
                .tracker
                .touch(session_id, resolution.step_index, &page_state, resolution.is_error_recovery)
                .await
            {
                tracing::warn!(session = %session_id, error = %e, "could not update session after resolve");
            }
        }

        GuideOutcome {
            resolution,
            role_defaulted: role.is_default(),
            workflow_defaulted: workflow.is_default(),
        }
    }

    pub async fn init_session(&self, role: &str, industry: &str, goal: &str, modules: Vec<String>) -> String {
        self.tracker.init_session(role, industry, goal, modules).await
    }

    pub async fn record_progress(
        &self,
        session_id: &str,
        steps_completed: u32,
        mistakes: Vec<String>,
        time_spent_secs: f64,
    ) -> GuideResult<ProgressReport> {
        self.tracker
            .record_progress(session_id, steps_completed, mistakes, time_spent_secs)
            .await
    }

    pub async fn get_session(&self, session_id: &str) -> GuideResult<SessionRecord> {
        self.tracker.get_session(session_id).await
    }

    pub async fn analyze_job(&self, job: &str, industry: &str) -> JobAnalysis {
        let reconciler = self.resolver.reconciler();
        job_analysis::analyze_job(
            &self.atlas,
            reconciler.service().as_ref(),
            reconciler.timeout(),
            job,
            industry,
        )
        .await
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }
}
