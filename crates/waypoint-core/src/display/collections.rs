//! Collection wrappers.

use std::fmt;

use super::datetime::LocalDateTime;
use crate::models::Plan;

/// A list of plans shown as one compact entry each.
///
/// ```rust
/// use waypoint_core::display::Plans;
///
/// assert_eq!(Plans(vec![]).to_string(), "No plans found.\n");
/// ```
pub struct Plans(pub Vec<Plan>);

impl Plans {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Plans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No plans found.");
        }

        for plan in &self.0 {
            writeln!(f, "## {} (ID: {}) [{}]", plan.title, plan.id, plan.status)?;
            writeln!(f)?;
            writeln!(f, "- **Goal**: {}", plan.goal)?;
            if !plan.phase_ids.is_empty() {
                writeln!(f, "- **Phases**: {}", plan.phase_ids.len())?;
            }
            if let Some(parent) = plan.parent_plan_id {
                writeln!(f, "- **Parent**: {parent}")?;
            }
            writeln!(f, "- **Created**: {}", LocalDateTime(&plan.created_at))?;
            writeln!(f)?;
        }
        Ok(())
    }
}
