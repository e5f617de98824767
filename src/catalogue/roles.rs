use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalogue::{normalize_key, Lookup};
use crate::errors::{GuideError, GuideResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProfile {
    pub id: String,
    /// Vocabulary register used when phrasing instructions for this role.
    pub terminology: String,
    pub context_summary: String,
    /// Lower-case keywords that make an element relevant to this role.
    pub focus_areas: BTreeSet<String>,
    #[serde(default)]
    pub concerns: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct RoleFile {
    #[serde(default)]
    roles: Vec<RoleProfile>,
}

pub struct RoleTable {
    roles: HashMap<String, RoleProfile>,
    default_id: String,
}

impl RoleTable {
    /// Later entries replace earlier ones with the same (normalised) id.
    pub fn new(roles: Vec<RoleProfile>, default_id: &str) -> GuideResult<Self> {
        let roles: HashMap<String, RoleProfile> = roles
            .into_iter()
            .map(|mut r| {
                r.focus_areas = r.focus_areas.iter().map(|f| f.to_lowercase()).collect();
                (normalize_key(&r.id), r)
            })
            .collect();
        let default_id = normalize_key(default_id);
        if !roles.contains_key(&default_id) {
            return Err(GuideError::Catalogue(format!(
                "default role '{default_id}' is not in the role table"
            )));
        }
        Ok(Self { roles, default_id })
    }

    pub fn builtin(default_id: &str) -> GuideResult<Self> {
        Self::new(builtin_roles(), default_id)
    }

    /// Case-insensitive lookup; unknown ids resolve to the designated default profile.
    pub fn lookup(&self, role_id: &str) -> Lookup<&RoleProfile> {
        match self.roles.get(&normalize_key(role_id)) {
            Some(profile) => Lookup::Found(profile),
            None => {
                tracing::warn!(role = %role_id, default = %self.default_id, "unknown role, using default profile");
                Lookup::UsedDefault(&self.roles[&self.default_id])
            }
        }
    }

    pub fn default_profile(&self) -> &RoleProfile {
        &self.roles[&self.default_id]
    }
}

/// Read `[[roles]]` entries from a TOML file.
pub fn load_roles(path: &Path) -> GuideResult<Vec<RoleProfile>> {
    let content = std::fs::read_to_string(path)?;
    let file: RoleFile = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), roles = file.roles.len(), "role file loaded");
    Ok(file.roles)
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn role(id: &str, terminology: &str, context: &str, focus: &[&str], concerns: &[&str]) -> RoleProfile {
    RoleProfile {
        id: id.to_string(),
        terminology: terminology.to_string(),
        context_summary: context.to_string(),
        focus_areas: set(focus),
        concerns: set(concerns),
    }
}

pub fn builtin_roles() -> Vec<RoleProfile> {
    vec![
        role(
            "General User",
            "plain",
            "A new user exploring the ERP without a specialised role.",
            &["home", "new", "save", "search"],
            &["finding the right module", "not losing work"],
        ),
        role(
            "Procurement Manager",
            "procurement",
            "Buys goods and services from suppliers and tracks orders until receipt.",
            &["buying", "purchase", "supplier", "quotation", "request for quotation"],
            &["supplier lead times", "approved price lists", "budget limits"],
        ),
        role(
            "Accountant",
            "finance",
            "Keeps the books: invoices, payments, journal entries and period closing.",
            &["accounting", "invoice", "payment", "journal", "ledger", "account"],
            &["balanced entries", "tax compliance", "period close"],
        ),
        role(
            "Sales Manager",
            "sales",
            "Turns quotations into sales orders and follows up with customers.",
            &["selling", "sales", "customer", "quotation", "lead"],
            &["delivery promises", "pricing rules", "customer credit"],
        ),
        role(
            "Stock Manager",
            "inventory",
            "Keeps warehouses stocked and movements traceable.",
            &["stock", "warehouse", "item", "material", "delivery note"],
            &["stock levels", "valuation", "batch traceability"],
        ),
        role(
            "HR Manager",
            "people",
            "Manages employee records, leave and payroll inputs.",
            &["hr", "employee", "leave", "attendance", "payroll"],
            &["personal data", "leave balances"],
        ),
    ]
}
