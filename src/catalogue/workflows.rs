use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalogue::{normalize_key, Lookup};
use crate::errors::{GuideError, GuideResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Navigate,
    Click,
    Fill,
}

impl StepAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StepAction::Navigate => "navigate",
            StepAction::Click => "click",
            StepAction::Fill => "fill",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub action: StepAction,
    /// UI label of the element this step acts on, as the ERP renders it.
    pub target: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub rationale: String,
}

fn default_required() -> bool {
    true
}

/// An ordered, non-empty sequence of steps accomplishing one business task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    id: String,
    steps: Vec<WorkflowStep>,
    is_onboarding_flow: bool,
}

impl Workflow {
    pub fn new(id: impl Into<String>, steps: Vec<WorkflowStep>, is_onboarding_flow: bool) -> GuideResult<Self> {
        let id = id.into();
        if steps.is_empty() {
            return Err(GuideError::Catalogue(format!("workflow '{id}' has no steps")));
        }
        Ok(Self {
            id,
            steps,
            is_onboarding_flow,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_onboarding_flow(&self) -> bool {
        self.is_onboarding_flow
    }

    /// Clamp any requested index into `[0, len - 1]`. Past the end the terminal step repeats.
    pub fn clamp_index(&self, index: i64) -> usize {
        let last = self.steps.len() - 1;
        if index <= 0 {
            0
        } else {
            (index as u64).min(last as u64) as usize
        }
    }

    pub fn step(&self, index: i64) -> (usize, &WorkflowStep) {
        let clamped = self.clamp_index(index);
        (clamped, &self.steps[clamped])
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowFile {
    #[serde(default)]
    workflows: Vec<WorkflowEntry>,
}

#[derive(Debug, Deserialize)]
struct WorkflowEntry {
    id: String,
    #[serde(default)]
    onboarding: bool,
    steps: Vec<WorkflowStep>,
}

pub struct WorkflowCatalogue {
    workflows: HashMap<String, Workflow>,
    default_id: String,
}

impl WorkflowCatalogue {
    /// Later entries replace earlier ones with the same (normalised) id.
    pub fn new(workflows: Vec<Workflow>, default_id: &str) -> GuideResult<Self> {
        let workflows: HashMap<String, Workflow> = workflows
            .into_iter()
            .map(|w| (normalize_key(&w.id), w))
            .collect();
        let default_id = normalize_key(default_id);
        if !workflows.contains_key(&default_id) {
            return Err(GuideError::Catalogue(format!(
                "default workflow '{default_id}' is not in the catalogue"
            )));
        }
        Ok(Self { workflows, default_id })
    }

    pub fn builtin(default_id: &str) -> GuideResult<Self> {
        Self::new(builtin_workflows(), default_id)
    }

    /// Resolve a goal to a workflow.
    ///
    /// Exact id match first, then the longest id contained in the goal text
    /// ("create a purchase order" → "purchase order"), then the default workflow.
    pub fn lookup(&self, goal: &str) -> Lookup<&Workflow> {
        let key = normalize_key(goal);
        if let Some(w) = self.workflows.get(&key) {
            return Lookup::Found(w);
        }

        let contained = self
            .workflows
            .iter()
            .filter(|(id, _)| !key.is_empty() && key.contains(id.as_str()))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)));
        if let Some((_, w)) = contained {
            return Lookup::Found(w);
        }

        tracing::warn!(goal = %goal, default = %self.default_id, "unknown goal, using default workflow");
        Lookup::UsedDefault(&self.workflows[&self.default_id])
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.workflows.values().map(|w| w.id()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn onboarding_flows(&self) -> Vec<&Workflow> {
        let mut flows: Vec<&Workflow> = self.workflows.values().filter(|w| w.is_onboarding_flow).collect();
        flows.sort_by(|a, b| a.id.cmp(&b.id));
        flows
    }
}

/// Read `[[workflows]]` entries from a TOML file.
pub fn load_workflows(path: &Path) -> GuideResult<Vec<Workflow>> {
    let content = std::fs::read_to_string(path)?;
    let file: WorkflowFile = toml::from_str(&content)?;
    let workflows = file
        .workflows
        .into_iter()
        .map(|entry| Workflow::new(entry.id, entry.steps, entry.onboarding))
        .collect::<GuideResult<Vec<_>>>()?;
    tracing::info!(path = %path.display(), workflows = workflows.len(), "workflow file loaded");
    Ok(workflows)
}

fn step(action: StepAction, target: &str, required: bool, rationale: &str) -> WorkflowStep {
    WorkflowStep {
        action,
        target: target.to_string(),
        required,
        rationale: rationale.to_string(),
    }
}

fn builtin(id: &str, onboarding: bool, steps: Vec<WorkflowStep>) -> Workflow {
    Workflow {
        id: id.to_string(),
        steps,
        is_onboarding_flow: onboarding,
    }
}

pub fn builtin_workflows() -> Vec<Workflow> {
    use StepAction::{Click, Fill, Navigate};

    vec![
        builtin(
            "purchase order",
            false,
            vec![
                step(Navigate, "Buying", true, "Purchase orders live in the Buying module."),
                step(Click, "Purchase Order", true, "Opens the list of existing purchase orders."),
                step(Click, "New", true, "Starts a blank purchase order form."),
                step(Fill, "Supplier", true, "Every order must name the supplier you are buying from."),
                step(Fill, "Required By", false, "Tells the supplier when the goods are needed."),
                step(Fill, "Item Code", true, "Adds the first item to the order."),
                step(Fill, "Quantity", true, "Sets how many units to order."),
                step(Click, "Save", true, "Saves the order as a draft."),
                step(Click, "Submit", false, "Submitting makes the order final and sends it for fulfilment."),
            ],
        ),
        builtin(
            "sales order",
            false,
            vec![
                step(Navigate, "Selling", true, "Sales orders live in the Selling module."),
                step(Click, "Sales Order", true, "Opens the list of existing sales orders."),
                step(Click, "New", true, "Starts a blank sales order form."),
                step(Fill, "Customer", true, "Every sales order belongs to a customer."),
                step(Fill, "Delivery Date", true, "The promised delivery date drives planning."),
                step(Fill, "Item Code", true, "Adds the first item being sold."),
                step(Fill, "Quantity", true, "Sets how many units are sold."),
                step(Click, "Save", true, "Saves the order as a draft."),
                step(Click, "Submit", false, "Submitting confirms the order with the customer."),
            ],
        ),
        builtin(
            "sales invoice",
            false,
            vec![
                step(Navigate, "Accounting", true, "Invoices are managed from the Accounting module."),
                step(Click, "Sales Invoice", true, "Opens the list of sales invoices."),
                step(Click, "New", true, "Starts a blank invoice."),
                step(Fill, "Customer", true, "The invoice is billed to this customer."),
                step(Fill, "Item Code", true, "Adds the billed item."),
                step(Fill, "Quantity", true, "Sets the billed quantity."),
                step(Click, "Save", true, "Saves the invoice as a draft."),
                step(Click, "Submit", true, "Submitting posts the invoice to the ledger."),
            ],
        ),
        builtin(
            "material request",
            false,
            vec![
                step(Navigate, "Stock", true, "Material requests are raised from the Stock module."),
                step(Click, "Material Request", true, "Opens the list of material requests."),
                step(Click, "New", true, "Starts a blank request."),
                step(Fill, "Purpose", true, "Purchase, transfer or issue decides who acts on it."),
                step(Fill, "Item Code", true, "Adds the requested item."),
                step(Fill, "Quantity", true, "Sets how much is needed."),
                step(Click, "Save", true, "Saves the request."),
            ],
        ),
        builtin(
            "journal entry",
            false,
            vec![
                step(Navigate, "Accounting", true, "Journal entries are posted from the Accounting module."),
                step(Click, "Journal Entry", true, "Opens the list of journal entries."),
                step(Click, "New", true, "Starts a blank entry."),
                step(Fill, "Posting Date", true, "The entry is booked on this date."),
                step(Fill, "Account", true, "Each row debits or credits one account."),
                step(Fill, "Debit", true, "Debits and credits must balance."),
                step(Fill, "Credit", true, "Debits and credits must balance."),
                step(Click, "Save", true, "Saves the entry as a draft."),
                step(Click, "Submit", true, "Submitting posts the entry to the general ledger."),
            ],
        ),
        builtin(
            "company setup",
            true,
            vec![
                step(Navigate, "Home", true, "Setup starts from the desk home page."),
                step(Click, "Company", true, "The company record holds defaults used everywhere else."),
                step(Fill, "Company Name", true, "Shown on every document you print."),
                step(Fill, "Default Currency", true, "All ledgers are kept in this currency."),
                step(Fill, "Country", true, "Drives tax templates and chart of accounts."),
                step(Click, "Save", true, "Saves the company."),
            ],
        ),
    ]
}
