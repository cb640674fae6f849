//! Step path — groups merged for display, discovered as the flow advances.
//!
//! A group whose node mapping is flagged `displayWithPrevious` is shown on
//! the same page as the group before it. The path only records the steps
//! actually taken; branches not followed never appear.

use serde::Serialize;

use crate::models::FlowDefinition;

/// One or more groups shown together. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    group_ids: Vec<String>,
}

impl Step {
    pub fn group_ids(&self) -> &[String] {
        &self.group_ids
    }

    /// The group the step was entered through.
    pub fn lead_group_id(&self) -> &str {
        &self.group_ids[0]
    }

    pub fn contains(&self, group_id: &str) -> bool {
        self.group_ids.iter().any(|g| g == group_id)
    }
}

/// `group` followed by the maximal run of consecutive groups flagged
/// `displayWithPrevious`. `None` when the group id is unknown.
pub fn combined_step(def: &FlowDefinition, group_id: &str) -> Option<Step> {
    let start = def.group_index(group_id)?;
    let mut group_ids = vec![def.groups[start].id.clone()];

    for next in &def.groups[start + 1..] {
        let merged = def
            .mapping_for(&next.id)
            .is_some_and(|m| m.display_with_previous);
        if !merged {
            break;
        }
        group_ids.push(next.id.clone());
    }

    Some(Step { group_ids })
}

/// Ordered steps discovered so far.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepPath {
    steps: Vec<Step>,
}

impl StepPath {
    /// Path holding only the first group's combined step; empty when the
    /// definition has no groups.
    pub fn initial(def: &FlowDefinition) -> Self {
        let steps = def
            .first_group()
            .and_then(|g| combined_step(def, &g.id))
            .into_iter()
            .collect();
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Record the step reached after `from_index`, dropping anything that
    /// had been discovered beyond it. Returns the new step's index.
    pub(crate) fn advance_from(&mut self, from_index: usize, step: Step) -> usize {
        self.steps.truncate(from_index + 1);
        self.steps.push(step);
        self.steps.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Group, NodeMapping};

    fn definition() -> FlowDefinition {
        FlowDefinition::new(
            vec![
                Group::new("a", "A", 1),
                Group::new("b", "B", 2),
                Group::new("c", "C", 3),
                Group::new("d", "D", 4),
                Group::new("e", "E", 5),
            ],
            vec![],
            vec![
                NodeMapping::new("b").display_with_previous(),
                NodeMapping::new("d").display_with_previous(),
                NodeMapping::new("e").display_with_previous(),
            ],
        )
    }

    #[test]
    fn test_combined_step_merges_following_run() {
        let def = definition();
        assert_eq!(combined_step(&def, "a").unwrap().group_ids(), ["a", "b"]);
        assert_eq!(combined_step(&def, "c").unwrap().group_ids(), ["c", "d", "e"]);
    }

    #[test]
    fn test_combined_step_never_looks_backwards() {
        let def = definition();
        // "b" itself displays with previous, but a step entered at "b" starts at "b"
        let step = combined_step(&def, "b").unwrap();
        assert_eq!(step.lead_group_id(), "b");
        assert_eq!(step.group_ids(), ["b"]);
        assert!(!step.contains("a"));
    }

    #[test]
    fn test_combined_step_unknown_group() {
        assert!(combined_step(&definition(), "zzz").is_none());
    }

    #[test]
    fn test_initial_and_advance() {
        let def = definition();
        let mut path = StepPath::initial(&def);
        assert_eq!(path.len(), 1);
        let idx = path.advance_from(0, combined_step(&def, "c").unwrap());
        assert_eq!(idx, 1);
        // Re-submitting from the first step replaces the tail
        let idx = path.advance_from(0, combined_step(&def, "e").unwrap());
        assert_eq!(idx, 1);
        assert_eq!(path.len(), 2);
        assert_eq!(path.get(1).unwrap().lead_group_id(), "e");
    }

    #[test]
    fn test_initial_empty_definition() {
        assert!(StepPath::initial(&FlowDefinition::default()).is_empty());
    }
}
