use serde::{Deserialize, Serialize};

/// Per-session progress. Lives until the process exits; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub role: String,
    pub industry: String,
    pub goal: String,
    #[serde(default)]
    pub modules: Vec<String>,
    pub steps_completed: u32,
    pub mistakes_made: Vec<String>,
    pub time_spent_secs: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Last clamped step index seen by the resolver.
    pub last_step_index: Option<usize>,
    pub last_page_state: Option<String>,
    /// Number of error-recovery instructions issued.
    pub recoveries: u32,
}

impl SessionRecord {
    pub fn new(role: &str, industry: &str, goal: &str, modules: Vec<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: role.to_string(),
            industry: industry.to_string(),
            goal: goal.to_string(),
            modules,
            steps_completed: 0,
            mistakes_made: Vec::new(),
            time_spent_secs: 0.0,
            created_at: now,
            updated_at: now,
            last_step_index: None,
            last_page_state: None,
            recoveries: 0,
        }
    }

    /// `mistakes / max(steps, 1)`. Not clamped: more mistakes than steps exceeds 1.0.
    pub fn error_rate(&self) -> f64 {
        self.mistakes_made.len() as f64 / self.steps_completed.max(1) as f64
    }

    pub fn error_rate_percent(&self) -> String {
        percent(self.error_rate())
    }
}

/// One-decimal percentage of a ratio, e.g. `1/12` → `"8.3%"`.
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SlowDown,
    ReadyForAdvanced,
    None,
}

impl Recommendation {
    pub fn for_progress(steps_completed: u32, error_rate: f64) -> Self {
        if error_rate > 0.5 {
            Recommendation::SlowDown
        } else if steps_completed > 10 && error_rate < 0.1 {
            Recommendation::ReadyForAdvanced
        } else {
            Recommendation::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::SlowDown => "slow down / review basics",
            Recommendation::ReadyForAdvanced => "ready for advanced workflows",
            Recommendation::None => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReport {
    pub error_rate: f64,
    pub recommendation: Recommendation,
}

impl ProgressReport {
    pub fn error_rate_percent(&self) -> String {
        percent(self.error_rate)
    }
}
