use tracing::debug;

use crate::error::{IntegrityError, SessionError};
use crate::values::TypedValue;

use super::assembler::RuleContext;
use super::types::{FilterNode, ROOT_PARENT_ID, Rule};

impl RuleContext<'_> {
    /// Replace-by-insert: an existing record with the rule's id is deleted in
    /// full, then every row is written fresh. Returns the newly generated id.
    ///
    /// Filter nodes are written parents-first because a child row needs its
    /// parent's generated id.
    pub async fn save_rule(&self, rule: &Rule) -> Result<i64, SessionError> {
        for rule_action in &rule.actions {
            let expected = rule_action.action.parameters.len();
            if rule_action.values.len() != expected {
                return Err(IntegrityError::ParameterMismatch {
                    action_id: rule_action.action.id,
                    expected,
                    found: rule_action.values.len(),
                }
                .into());
            }
            for (parameter, value) in rule_action
                .action
                .parameters
                .iter()
                .zip(&rule_action.values)
            {
                self.check_value(parameter.data_type_id, value)?;
            }
        }
        for node in rule.filter_nodes() {
            self.check_value(node.filter.attribute.data_type_id, &node.value)?;
        }

        if let Some(existing) = rule.id {
            if self.store.fetch_rule(existing).await?.is_some() {
                self.delete_rule(existing).await?;
            }
        }

        let rule_id = self
            .store
            .insert_rule(rule.event.id, &rule.name, &rule.description, rule.active)
            .await?;

        for rule_action in &rule.actions {
            let rule_action_id = self
                .store
                .insert_rule_action(rule_id, rule_action.action.id)
                .await?;
            for (parameter, value) in rule_action
                .action
                .parameters
                .iter()
                .zip(&rule_action.values)
            {
                self.store
                    .insert_rule_action_parameter(
                        rule_action_id,
                        parameter.id,
                        &self.values.serialize(value),
                    )
                    .await?;
            }
        }

        let mut written = 0usize;
        let mut stack: Vec<(i64, &FilterNode)> = rule
            .filters
            .iter()
            .rev()
            .map(|node| (ROOT_PARENT_ID, node))
            .collect();
        while let Some((parent_id, node)) = stack.pop() {
            let node_id = self
                .store
                .insert_filter(
                    rule_id,
                    parent_id,
                    node.filter.attribute.id,
                    node.filter.id,
                    &self.values.serialize(&node.value),
                )
                .await?;
            written += 1;
            stack.extend(node.children.iter().rev().map(|child| (node_id, child)));
        }

        debug!(
            rule_id,
            actions = rule.actions.len(),
            filters = written,
            "rule rows written"
        );
        Ok(rule_id)
    }

    /// A value is only written if it can be read back as its declared data type.
    fn check_value(&self, data_type_id: i64, value: &TypedValue) -> Result<(), SessionError> {
        let kind = self.cache.value_kind(data_type_id)?;
        if value.kind() != kind {
            return Err(IntegrityError::ValueKindMismatch {
                data_type_id,
                expected: kind.to_string(),
                found: value.kind(),
            }
            .into());
        }
        self.values.create(kind, &self.values.serialize(value))?;
        Ok(())
    }
}
