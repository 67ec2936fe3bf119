use libsql::{Connection, params, params::IntoParams};
use tracing::debug;

use crate::error::SessionError;
use crate::rules::repositories::insert_returning_id;

/// Writes reference rows on behalf of registering applications. Every method
/// returns the id generated by the store.
///
/// Open sessions keep their cache; call sites that register and then use the
/// new descriptors must open a fresh session.
pub struct Registry<'c> {
    conn: &'c Connection,
}

impl<'c> Registry<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub async fn register_data_type(&self, name: &str, kind: &str) -> Result<i64, SessionError> {
        self.insert(
            "data_types",
            "INSERT INTO data_types (name, kind) VALUES (?1, ?2) RETURNING id",
            params![name, kind],
        )
        .await
    }

    pub async fn register_filter(
        &self,
        name: &str,
        data_type_id: i64,
        compare_data_type_id: Option<i64>,
    ) -> Result<i64, SessionError> {
        self.insert(
            "data_filters",
            "INSERT INTO data_filters (name, data_type_id, compare_data_type_id) VALUES (?1, ?2, ?3) RETURNING id",
            params![name, data_type_id, compare_data_type_id],
        )
        .await
    }

    pub async fn register_application(
        &self,
        name: &str,
        description: &str,
        icon: Option<&str>,
    ) -> Result<i64, SessionError> {
        self.insert(
            "applications",
            "INSERT INTO applications (name, description, icon) VALUES (?1, ?2, ?3) RETURNING id",
            params![name, description, icon],
        )
        .await
    }

    pub async fn register_event(
        &self,
        name: &str,
        description: &str,
        icon: Option<&str>,
    ) -> Result<i64, SessionError> {
        self.insert(
            "events",
            "INSERT INTO events (name, description, icon) VALUES (?1, ?2, ?3) RETURNING id",
            params![name, description, icon],
        )
        .await
    }

    pub async fn register_attribute(
        &self,
        event_id: i64,
        data_type_id: i64,
        name: &str,
    ) -> Result<i64, SessionError> {
        self.insert(
            "event_attributes",
            "INSERT INTO event_attributes (event_id, data_type_id, name) VALUES (?1, ?2, ?3) RETURNING id",
            params![event_id, data_type_id, name],
        )
        .await
    }

    pub async fn register_action(
        &self,
        application_id: i64,
        name: &str,
    ) -> Result<i64, SessionError> {
        self.insert(
            "actions",
            "INSERT INTO actions (application_id, name) VALUES (?1, ?2) RETURNING id",
            params![application_id, name],
        )
        .await
    }

    /// Parameters are positional: register them in the order rule values will supply them.
    pub async fn register_action_parameter(
        &self,
        action_id: i64,
        data_type_id: i64,
        name: &str,
    ) -> Result<i64, SessionError> {
        self.insert(
            "action_parameters",
            "INSERT INTO action_parameters (action_id, data_type_id, name) VALUES (?1, ?2, ?3) RETURNING id",
            params![action_id, data_type_id, name],
        )
        .await
    }

    async fn insert(
        &self,
        table: &'static str,
        sql: &str,
        params: impl IntoParams,
    ) -> Result<i64, SessionError> {
        let id = insert_returning_id(self.conn, table, sql, params).await?;
        debug!(table, id, "registered reference row");
        Ok(id)
    }
}
