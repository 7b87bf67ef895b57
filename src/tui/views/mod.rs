mod findings;
mod plan;

pub use findings::{draw_findings_view, FindingsViewState};
pub use plan::{draw_plan_view, PlanPane, PlanViewState};
