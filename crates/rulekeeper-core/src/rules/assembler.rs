use libsql::Connection;
use tracing::debug;

use crate::error::{IntegrityError, SessionError};
use crate::metadata::MetadataCache;
use crate::values::{TypedValue, ValueFactory};

use super::repositories::{RuleActionRow, RuleStore};
use super::tree::FilterTreeBuilder;
use super::types::{Rule, RuleAction};

/// Loads, saves and deletes whole rules over one connection (or transaction).
pub struct RuleContext<'a> {
    pub(super) store: RuleStore<'a>,
    pub(super) cache: &'a MetadataCache,
    pub(super) values: &'a dyn ValueFactory,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        conn: &'a Connection,
        cache: &'a MetadataCache,
        values: &'a dyn ValueFactory,
    ) -> Self {
        Self {
            store: RuleStore::new(conn),
            cache,
            values,
        }
    }

    pub async fn load_rule(&self, id: i64) -> Result<Rule, SessionError> {
        let row = self
            .store
            .fetch_rule(id)
            .await?
            .ok_or(SessionError::NotFound { entity: "rule", id })?;
        let event = self
            .cache
            .event(row.event_id)
            .ok_or_else(|| SessionError::missing("event", row.event_id))?;

        let filter_rows = self.store.fetch_filters(id).await?;
        let filters = FilterTreeBuilder::new(self.cache, self.values).build(filter_rows)?;

        let mut actions = Vec::new();
        for action_row in self.store.fetch_rule_actions(id).await? {
            actions.push(self.load_rule_action(action_row).await?);
        }

        debug!(
            rule_id = id,
            filter_branches = filters.len(),
            actions = actions.len(),
            "rule loaded"
        );
        Ok(Rule {
            id: Some(row.id),
            name: row.name,
            description: row.description,
            active: row.enabled,
            event,
            filters,
            actions,
        })
    }

    async fn load_rule_action(&self, row: RuleActionRow) -> Result<RuleAction, SessionError> {
        let action = self
            .cache
            .action(row.action_id)
            .ok_or_else(|| SessionError::missing("action", row.action_id))?;
        let stored = self.store.fetch_rule_action_parameters(row.id).await?;

        let mismatch = |found: usize| IntegrityError::ParameterMismatch {
            action_id: action.id,
            expected: action.parameters.len(),
            found,
        };
        if stored.len() != action.parameters.len() {
            return Err(mismatch(stored.len()).into());
        }

        // Stored rows name their parameter; slot each value at that parameter's position.
        let mut slots: Vec<Option<TypedValue>> = vec![None; action.parameters.len()];
        for parameter_row in &stored {
            let position = action
                .parameters
                .iter()
                .position(|parameter| parameter.id == parameter_row.action_parameter_id)
                .ok_or(IntegrityError::UnknownParameter {
                    rule_action_id: row.id,
                    action_id: action.id,
                    parameter_id: parameter_row.action_parameter_id,
                })?;
            let kind = self
                .cache
                .value_kind(action.parameters[position].data_type_id)?;
            slots[position] = Some(self.values.create(kind, &parameter_row.data)?);
        }

        let filled = slots.iter().filter(|slot| slot.is_some()).count();
        let values = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| mismatch(filled))?;

        Ok(RuleAction {
            id: Some(row.id),
            action,
            values,
        })
    }
}
