use std::sync::Arc;

use serde::Serialize;

use crate::metadata::{Action, Event, Filter};
use crate::values::TypedValue;

/// Stored parent reference for filters attached directly under the rule's event.
pub const ROOT_PARENT_ID: i64 = -1;

/// Stored parents below this value are read as "attached to the rule root".
pub const FIRST_FILTER_ID: i64 = 1;

/// A fully hydrated rule: trigger event, filter forest and actions.
///
/// `id` is `None` until the rule has been saved; saving a rule whose id names
/// an existing record replaces that record wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub event: Arc<Event>,
    pub filters: Vec<FilterNode>,
    pub actions: Vec<RuleAction>,
}

impl Rule {
    pub fn new(name: impl Into<String>, event: Arc<Event>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            active: true,
            event,
            filters: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Every filter node in the rule, parents before children.
    pub fn filter_nodes(&self) -> Vec<&FilterNode> {
        let mut nodes = Vec::new();
        let mut stack: Vec<&FilterNode> = self.filters.iter().rev().collect();
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children.iter().rev());
        }
        nodes
    }
}

/// One condition in the filter tree. Children are owned by their parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterNode {
    pub id: Option<i64>,
    pub filter: Filter,
    pub value: TypedValue,
    pub children: Vec<FilterNode>,
}

impl FilterNode {
    pub fn new(filter: Filter, value: TypedValue) -> Self {
        Self {
            id: None,
            filter,
            value,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: FilterNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|child| (child, level + 1)));
        }
        deepest
    }
}

/// An action bound to a rule. `values[i]` is the value for `action.parameters[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleAction {
    pub id: Option<i64>,
    pub action: Arc<Action>,
    pub values: Vec<TypedValue>,
}

impl RuleAction {
    pub fn new(action: Arc<Action>, values: Vec<TypedValue>) -> Self {
        Self {
            id: None,
            action,
            values,
        }
    }
}

/// Sparse listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    pub id: i64,
    pub name: String,
    pub active: bool,
}
