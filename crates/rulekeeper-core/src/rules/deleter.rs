use tracing::debug;

use crate::error::SessionError;

use super::assembler::RuleContext;

impl RuleContext<'_> {
    /// Delete a rule and every row hanging off it. The rule is loaded first and
    /// its in-memory shape drives the deletes, so an unknown id fails with
    /// `NotFound` and a rule whose rows no longer assemble cannot be deleted.
    pub async fn delete_rule(&self, id: i64) -> Result<(), SessionError> {
        let rule = self.load_rule(id).await?;
        self.store.delete_rule(id).await?;

        let mut parameter_rows = 0usize;
        for rule_action in &rule.actions {
            let Some(rule_action_id) = rule_action.id else {
                continue;
            };
            self.store.delete_rule_action(rule_action_id).await?;
            for parameter in self
                .store
                .fetch_rule_action_parameters(rule_action_id)
                .await?
            {
                self.store.delete_rule_action_parameter(parameter.id).await?;
                parameter_rows += 1;
            }
        }

        let nodes = rule.filter_nodes();
        for node_id in nodes.iter().filter_map(|node| node.id) {
            self.store.delete_filter(node_id).await?;
        }

        debug!(
            rule_id = id,
            actions = rule.actions.len(),
            parameters = parameter_rows,
            filters = nodes.len(),
            "rule rows deleted"
        );
        Ok(())
    }
}
