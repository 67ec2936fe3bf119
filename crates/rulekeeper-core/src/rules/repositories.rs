use libsql::{Connection, Row, params, params::IntoParams};

use crate::error::SessionError;

use super::types::RuleSummary;

const RULE_COLUMNS: &str = "id, event_id, name, description, enabled";
const FILTER_COLUMNS: &str =
    "id, parent_rule_filter_id, event_attribute_id, data_filter_id, data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRow {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    pub description: String,
    pub enabled: bool,
}

/// A stored filter node. `parent_id` is `None`, or below `FIRST_FILTER_ID`, for root-level nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRow {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub attribute_id: i64,
    pub filter_kind_id: i64,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleActionRow {
    pub id: i64,
    pub action_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleActionParameterRow {
    pub id: i64,
    pub action_parameter_id: i64,
    pub data: String,
}

/// Row access for the rule-owned tables. Borrowing a connection lets callers
/// run several calls inside one transaction.
pub struct RuleStore<'c> {
    conn: &'c Connection,
}

impl<'c> RuleStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub async fn list_rules(&self) -> Result<Vec<RuleSummary>, SessionError> {
        let mut rows = self
            .conn
            .query("SELECT id, name, enabled FROM rules ORDER BY id", ())
            .await?;

        let mut rules = Vec::new();
        while let Some(row) = rows.next().await? {
            rules.push(RuleSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                active: row.get::<i64>(2)? != 0,
            });
        }
        Ok(rules)
    }

    pub async fn fetch_rule(&self, id: i64) -> Result<Option<RuleRow>, SessionError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {RULE_COLUMNS} FROM rules WHERE id = ?1"),
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_rule(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn insert_rule(
        &self,
        event_id: i64,
        name: &str,
        description: &str,
        enabled: bool,
    ) -> Result<i64, SessionError> {
        let enabled = enabled as i64;
        insert_returning_id(
            self.conn,
            "rules",
            "INSERT INTO rules (event_id, name, description, enabled) VALUES (?1, ?2, ?3, ?4) RETURNING id",
            params![event_id, name, description, enabled],
        )
        .await
    }

    pub async fn delete_rule(&self, id: i64) -> Result<u64, SessionError> {
        Ok(self
            .conn
            .execute("DELETE FROM rules WHERE id = ?1", params![id])
            .await?)
    }

    pub async fn fetch_filters(&self, rule_id: i64) -> Result<Vec<FilterRow>, SessionError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {FILTER_COLUMNS} FROM rule_filters WHERE rule_id = ?1"),
                params![rule_id],
            )
            .await?;

        let mut filters = Vec::new();
        while let Some(row) = rows.next().await? {
            filters.push(row_to_filter(&row)?);
        }
        Ok(filters)
    }

    pub async fn insert_filter(
        &self,
        rule_id: i64,
        parent_id: i64,
        attribute_id: i64,
        filter_kind_id: i64,
        data: &str,
    ) -> Result<i64, SessionError> {
        insert_returning_id(
            self.conn,
            "rule_filters",
            "INSERT INTO rule_filters (rule_id, parent_rule_filter_id, event_attribute_id, data_filter_id, data)
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
            params![rule_id, parent_id, attribute_id, filter_kind_id, data],
        )
        .await
    }

    pub async fn delete_filter(&self, id: i64) -> Result<u64, SessionError> {
        Ok(self
            .conn
            .execute("DELETE FROM rule_filters WHERE id = ?1", params![id])
            .await?)
    }

    pub async fn fetch_rule_actions(&self, rule_id: i64) -> Result<Vec<RuleActionRow>, SessionError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, action_id FROM rule_actions WHERE rule_id = ?1 ORDER BY id",
                params![rule_id],
            )
            .await?;

        let mut actions = Vec::new();
        while let Some(row) = rows.next().await? {
            actions.push(RuleActionRow {
                id: row.get(0)?,
                action_id: row.get(1)?,
            });
        }
        Ok(actions)
    }

    pub async fn insert_rule_action(&self, rule_id: i64, action_id: i64) -> Result<i64, SessionError> {
        insert_returning_id(
            self.conn,
            "rule_actions",
            "INSERT INTO rule_actions (rule_id, action_id) VALUES (?1, ?2) RETURNING id",
            params![rule_id, action_id],
        )
        .await
    }

    pub async fn delete_rule_action(&self, id: i64) -> Result<u64, SessionError> {
        Ok(self
            .conn
            .execute("DELETE FROM rule_actions WHERE id = ?1", params![id])
            .await?)
    }

    pub async fn fetch_rule_action_parameters(
        &self,
        rule_action_id: i64,
    ) -> Result<Vec<RuleActionParameterRow>, SessionError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, action_parameter_id, data FROM rule_action_parameters WHERE rule_action_id = ?1 ORDER BY id",
                params![rule_action_id],
            )
            .await?;

        let mut parameters = Vec::new();
        while let Some(row) = rows.next().await? {
            parameters.push(RuleActionParameterRow {
                id: row.get(0)?,
                action_parameter_id: row.get(1)?,
                data: row.get(2)?,
            });
        }
        Ok(parameters)
    }

    pub async fn insert_rule_action_parameter(
        &self,
        rule_action_id: i64,
        action_parameter_id: i64,
        data: &str,
    ) -> Result<i64, SessionError> {
        insert_returning_id(
            self.conn,
            "rule_action_parameters",
            "INSERT INTO rule_action_parameters (rule_action_id, action_parameter_id, data) VALUES (?1, ?2, ?3) RETURNING id",
            params![rule_action_id, action_parameter_id, data],
        )
        .await
    }

    pub async fn delete_rule_action_parameter(&self, id: i64) -> Result<u64, SessionError> {
        Ok(self
            .conn
            .execute(
                "DELETE FROM rule_action_parameters WHERE id = ?1",
                params![id],
            )
            .await?)
    }
}

pub(crate) async fn insert_returning_id(
    conn: &Connection,
    table: &'static str,
    sql: &str,
    params: impl IntoParams,
) -> Result<i64, SessionError> {
    let mut rows = conn.query(sql, params).await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Err(SessionError::InsertFailed(table)),
    }
}

fn row_to_rule(row: &Row) -> Result<RuleRow, libsql::Error> {
    let enabled: i64 = row.get(4)?;
    Ok(RuleRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        enabled: enabled != 0,
    })
}

fn row_to_filter(row: &Row) -> Result<FilterRow, libsql::Error> {
    Ok(FilterRow {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        attribute_id: row.get(2)?,
        filter_kind_id: row.get(3)?,
        data: row.get(4)?,
    })
}
