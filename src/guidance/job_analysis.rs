use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::advisory::prompt::job_prompt;
use crate::advisory::reconciler::AdviceSource;
use crate::advisory::service::AdvisoryService;
use crate::catalogue::atlas::Atlas;
use crate::errors::GuideError;

pub const DEFAULT_MODULES: [&str; 3] = ["Buying", "Selling", "Accounting"];

pub const DEFAULT_TUTORIAL: [&str; 5] = ["Go to Buying", "Click Purchase Order", "Click New", "Add Items", "Save"];

pub const DEFAULT_SELECTORS: [&str; 5] = [
    "[data-label='Buying']",
    "[data-label='Purchase Order']",
    "button.primary",
    "[placeholder*='Item']",
    "button:has-text('Save')",
];

pub const DEFAULT_KEYWORDS: [&str; 5] = ["Buying", "Purchase", "New", "Items", "Save"];

const MAX_ITEMS: usize = 5;
const MAX_CONTEXT_LINES: usize = 30;
const MAX_MODULES: usize = 3;

/// Starter tutorial for a job title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobAnalysis {
    pub tutorial: Vec<String>,
    pub selectors: Vec<String>,
    pub keywords: Vec<String>,
    pub modules: Vec<String>,
    #[serde(skip)]
    pub source: AdviceSource,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl JobAnalysis {
    fn fallback(modules: Vec<String>) -> Self {
        Self {
            tutorial: owned(&DEFAULT_TUTORIAL),
            selectors: owned(&DEFAULT_SELECTORS),
            keywords: owned(&DEFAULT_KEYWORDS),
            modules,
            source: AdviceSource::Fallback,
        }
    }
}

/// Up to three distinct modules among related atlas records, in first-seen order.
pub fn related_modules(atlas: &Atlas, job: &str) -> (Vec<String>, Vec<String>) {
    let related = if job.trim().is_empty() { Vec::new() } else { atlas.related(job) };

    let mut modules: Vec<String> = Vec::new();
    for record in &related {
        if modules.len() == MAX_MODULES {
            break;
        }
        if !modules.contains(&record.module) {
            modules.push(record.module.clone());
        }
    }
    if modules.is_empty() {
        modules = owned(&DEFAULT_MODULES);
    }

    let context = related
        .iter()
        .take(MAX_CONTEXT_LINES)
        .map(|r| format!("{} → {} ({})", r.module, r.label, r.route))
        .collect();
    (modules, context)
}

pub async fn analyze_job(
    atlas: &Atlas,
    service: &dyn AdvisoryService,
    timeout: Duration,
    job: &str,
    industry: &str,
) -> JobAnalysis {
    let (modules, context) = related_modules(atlas, job);
    let prompt = job_prompt(job, industry, &modules, &context);

    let reply = match tokio::time::timeout(timeout, service.generate_advice(&prompt)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(job = %job, error = %e, "job analysis failed, using default tutorial");
            return JobAnalysis::fallback(modules);
        }
        Err(_) => {
            let e = GuideError::Timeout(timeout.as_millis() as u64);
            tracing::warn!(job = %job, error = %e, "job analysis timed out, using default tutorial");
            return JobAnalysis::fallback(modules);
        }
    };

    let tutorial = bracket_list(&reply, &TUTORIAL_PATTERN).unwrap_or_else(|| owned(&DEFAULT_TUTORIAL));
    let selectors = bracket_list(&reply, &SELECTORS_PATTERN).unwrap_or_else(|| owned(&DEFAULT_SELECTORS));
    let keywords = tutorial.iter().map(|s| keyword(s)).collect();

    tracing::info!(job = %job, modules = ?modules, steps = tutorial.len(), "job analysed");
    JobAnalysis {
        tutorial,
        selectors,
        keywords,
        modules,
        source: AdviceSource::Advisory,
    }
}

static TUTORIAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)TUTORIAL:\s*\[(.*?)\]").expect("tutorial pattern is valid"));

static SELECTORS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)SELECTORS:\s*\[(.*?)\]").expect("selectors pattern is valid"));

/// `[a | b | c]` → up to five trimmed, non-empty items.
fn bracket_list(text: &str, re: &Regex) -> Option<Vec<String>> {
    let inner = re.captures(text)?.get(1)?.as_str();
    let items: Vec<String> = inner
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(MAX_ITEMS)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Last word of a step once punctuation is stripped: "Click Purchase Order" → "Order".
fn keyword(step: &str) -> String {
    let cleaned: String = step
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().last().unwrap_or("").to_string()
}
