use crate::advisory::reconciler::StepContext;
use crate::advisory::service::{AdvisoryPurpose, PromptContext};
use crate::catalogue::roles::RoleProfile;
use crate::guidance::types::PageElement;

const COACH_SYSTEM_PROMPT: &str = "\
You are an ERP coach guiding a first-time user through a business workflow.

Rules:
- Recommend exactly one element the user should interact with next.
- Use the exact label of a visible element whenever one fits.
- Set IS_ERROR to true only when the user has left the expected path and must go back.
- Keep the instruction to one short sentence in the user's terminology.
- Reply with the requested lines only.";

const ANALYST_SYSTEM_PROMPT: &str = "You are a Frappe ERP coach.";

/// Build the next-step coaching prompt. Only the first `max_elements` labels are included.
pub fn step_prompt(
    role: &RoleProfile,
    goal: &str,
    ctx: &StepContext,
    elements: &[PageElement],
    max_elements: usize,
) -> PromptContext {
    let shown: Vec<String> = elements
        .iter()
        .take(max_elements)
        .map(|e| format!("\"{}\"", e.text.trim()))
        .collect();
    let concerns: Vec<&str> = role.concerns.iter().map(String::as_str).collect();
    let optional = if ctx.step.required { "" } else { " (optional)" };

    let user = format!(
        "User role: \"{role}\" ({terminology} terminology). {summary}\n\
         Role concerns: {concerns}\n\
         Goal: {goal}\n\
         Workflow \"{workflow}\", step {number} of {total}: {action} \"{target}\"{optional}\n\
         Current page: {page}\n\
         Suggested element: {pick}\n\
         Visible elements ({shown_count} of {total_elements}): {labels}\n\
         \n\
         Return exactly these lines:\n\
         NEXT_ACTION: <exact label of the element to interact with next>\n\
         INSTRUCTION: <one short sentence for the user>\n\
         REASON: <why this step matters>\n\
         IS_ERROR: <true or false>",
        role = role.id,
        terminology = role.terminology,
        summary = role.context_summary,
        concerns = if concerns.is_empty() { "none".to_string() } else { concerns.join(", ") },
        goal = goal,
        workflow = ctx.workflow_id,
        number = ctx.step_index + 1,
        total = ctx.total_steps,
        action = ctx.step.action.as_str(),
        target = ctx.step.target,
        optional = optional,
        page = ctx.page_state,
        pick = ctx.deterministic_pick.as_deref().unwrap_or("none"),
        shown_count = shown.len(),
        total_elements = elements.len(),
        labels = shown.join(", "),
    );

    PromptContext {
        purpose: AdvisoryPurpose::Advisory,
        system: COACH_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Build the job-analysis prompt from atlas context lines.
pub fn job_prompt(job: &str, industry: &str, modules: &[String], context_lines: &[String]) -> PromptContext {
    let user = format!(
        "User role: \"{job}\" in \"{industry}\" industry\n\
         Relevant modules from Atlas:\n\
         {modules}\n\
         \n\
         Example routes:\n\
         {routes}\n\
         \n\
         Return exactly two lines:\n\
         TUTORIAL: [step1|step2|step3|step4|step5]\n\
         SELECTORS: [sel1|sel2|sel3|sel4|sel5]",
        modules = modules.join(", "),
        routes = context_lines.join("\n"),
    );
    PromptContext {
        purpose: AdvisoryPurpose::Analysis,
        system: ANALYST_SYSTEM_PROMPT.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::roles::RoleTable;
    use crate::catalogue::workflows::{StepAction, WorkflowStep};
    use crate::guidance::page_state::PageState;

    fn ctx() -> StepContext {
        StepContext {
            workflow_id: "purchase order".into(),
            step_index: 0,
            total_steps: 9,
            step: WorkflowStep {
                action: StepAction::Navigate,
                target: "Buying".into(),
                required: true,
                rationale: "Orders live in Buying.".into(),
            },
            page_state: PageState::Home,
            deterministic_pick: Some("Buying".into()),
        }
    }

    #[test]
    fn caps_element_excerpt() {
        let table = RoleTable::builtin("General User").unwrap();
        let role = table.lookup("Procurement Manager").value();
        let elements: Vec<PageElement> = (0..40).map(|i| PageElement::new(format!("El{i}"))).collect();
        let prompt = step_prompt(role, "purchase order", &ctx(), &elements, 15);
        assert_eq!(prompt.purpose, AdvisoryPurpose::Advisory);
        assert!(prompt.user.contains("\"El14\""));
        assert!(!prompt.user.contains("\"El15\""));
        assert!(prompt.user.contains("(15 of 40)"));
        assert!(prompt.user.contains("step 1 of 9: navigate \"Buying\""));
        assert!(prompt.user.contains("Current page: home"));
        assert!(prompt.user.contains("IS_ERROR:"));
    }

    #[test]
    fn job_prompt_lists_modules_and_routes() {
        let prompt = job_prompt(
            "Buyer",
            "Retail",
            &["Buying".to_string()],
            &["Buying → Purchase Order (/app/purchase-order)".to_string()],
        );
        assert_eq!(prompt.purpose, AdvisoryPurpose::Analysis);
        assert!(prompt.user.contains("\"Buyer\" in \"Retail\""));
        assert!(prompt.user.contains("(/app/purchase-order)"));
        assert!(prompt.user.contains("TUTORIAL:"));
    }
}
