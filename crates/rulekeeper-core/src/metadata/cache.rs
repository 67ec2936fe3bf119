use std::collections::HashMap;
use std::sync::Arc;

use libsql::{Connection, Row, params};
use tracing::debug;

use crate::error::SessionError;

use super::types::{
    Action, ActionParameter, Application, DataType, Event, EventAttribute, Filter, FilterKind,
};

/// In-memory mirror of the reference tables, loaded once when a session opens.
///
/// Never refreshed: rows registered after `load` are invisible until a new
/// cache is built.
#[derive(Debug, Default)]
pub struct MetadataCache {
    data_types: HashMap<i64, DataType>,
    filter_kinds: HashMap<i64, FilterKind>,
    applications: HashMap<i64, Arc<Application>>,
    events: HashMap<i64, Arc<Event>>,
    attributes: HashMap<i64, Arc<EventAttribute>>,
    parameters: HashMap<i64, Arc<ActionParameter>>,
    actions: HashMap<i64, Arc<Action>>,
}

impl MetadataCache {
    pub async fn load(conn: &Connection) -> Result<Self, SessionError> {
        let mut cache = MetadataCache::default();

        for data_type in collect(conn, "SELECT id, name, kind FROM data_types", |row| {
            Ok(DataType {
                id: row.get(0)?,
                name: row.get(1)?,
                kind: row.get(2)?,
            })
        })
        .await?
        {
            cache.data_types.insert(data_type.id, data_type);
        }

        for filter in collect(conn, "SELECT id, name FROM data_filters", |row| {
            Ok(FilterKind {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .await?
        {
            cache.filter_kinds.insert(filter.id, filter);
        }

        for application in collect(
            conn,
            "SELECT id, name, description, icon FROM applications",
            |row| {
                Ok(Application {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    icon: row.get(3)?,
                })
            },
        )
        .await?
        {
            cache
                .applications
                .insert(application.id, Arc::new(application));
        }

        for event in collect(conn, "SELECT id, name, description, icon FROM events", |row| {
            Ok(Event {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                icon: row.get(3)?,
            })
        })
        .await?
        {
            cache.events.insert(event.id, Arc::new(event));
        }

        for attribute in collect(
            conn,
            "SELECT id, event_id, data_type_id, name FROM event_attributes",
            |row| {
                Ok(EventAttribute {
                    id: row.get(0)?,
                    event_id: row.get(1)?,
                    data_type_id: row.get(2)?,
                    name: row.get(3)?,
                })
            },
        )
        .await?
        {
            cache.attributes.insert(attribute.id, Arc::new(attribute));
        }

        // Parameter order is registration order; rule action values pair with it by position.
        let parameters: Vec<Arc<ActionParameter>> = collect(
            conn,
            "SELECT id, action_id, data_type_id, name FROM action_parameters ORDER BY id",
            |row| {
                Ok(Arc::new(ActionParameter {
                    id: row.get(0)?,
                    action_id: row.get(1)?,
                    data_type_id: row.get(2)?,
                    name: row.get(3)?,
                }))
            },
        )
        .await?;

        let action_rows = collect(
            conn,
            "SELECT id, application_id, name FROM actions",
            |row| Ok((row.get::<i64>(0)?, row.get::<i64>(1)?, row.get::<String>(2)?)),
        )
        .await?;
        for (id, application_id, name) in action_rows {
            let application = cache
                .applications
                .get(&application_id)
                .cloned()
                .ok_or_else(|| SessionError::missing("application", application_id))?;
            let action_parameters = parameters
                .iter()
                .filter(|parameter| parameter.action_id == id)
                .cloned()
                .collect();
            cache.actions.insert(
                id,
                Arc::new(Action {
                    id,
                    name,
                    application,
                    parameters: action_parameters,
                }),
            );
        }
        if let Some(orphan) = parameters
            .iter()
            .find(|parameter| !cache.actions.contains_key(&parameter.action_id))
        {
            return Err(SessionError::missing("action", orphan.action_id));
        }
        cache.parameters = parameters
            .into_iter()
            .map(|parameter| (parameter.id, parameter))
            .collect();

        debug!(
            data_types = cache.data_types.len(),
            applications = cache.applications.len(),
            events = cache.events.len(),
            attributes = cache.attributes.len(),
            actions = cache.actions.len(),
            "metadata cache loaded"
        );
        Ok(cache)
    }

    pub fn applications(&self) -> Vec<Arc<Application>> {
        sorted_by_id(self.applications.values().cloned(), |app| app.id)
    }

    pub fn events(&self) -> Vec<Arc<Event>> {
        sorted_by_id(self.events.values().cloned(), |event| event.id)
    }

    pub fn actions_for_application(&self, application_id: i64) -> Vec<Arc<Action>> {
        sorted_by_id(
            self.actions
                .values()
                .filter(|action| action.application.id == application_id)
                .cloned(),
            |action| action.id,
        )
    }

    pub fn attributes_for_event(&self, event_id: i64) -> Vec<Arc<EventAttribute>> {
        sorted_by_id(
            self.attributes
                .values()
                .filter(|attribute| attribute.event_id == event_id)
                .cloned(),
            |attribute| attribute.id,
        )
    }

    /// Filters compatible with the attribute's data type. Read from the store
    /// on every call; the compatible set is not cached.
    pub async fn filters_for_attribute(
        &self,
        conn: &Connection,
        attribute: &Arc<EventAttribute>,
    ) -> Result<Vec<Filter>, SessionError> {
        let mut rows = conn
            .query(
                "SELECT id, name FROM data_filters WHERE data_type_id = ?1 ORDER BY id",
                params![attribute.data_type_id],
            )
            .await?;

        let mut filters = Vec::new();
        while let Some(row) = rows.next().await? {
            filters.push(Filter {
                id: row.get(0)?,
                name: row.get(1)?,
                attribute: attribute.clone(),
            });
        }
        Ok(filters)
    }

    pub fn application(&self, id: i64) -> Option<Arc<Application>> {
        self.applications.get(&id).cloned()
    }

    pub fn event(&self, id: i64) -> Option<Arc<Event>> {
        self.events.get(&id).cloned()
    }

    pub fn attribute(&self, id: i64) -> Option<Arc<EventAttribute>> {
        self.attributes.get(&id).cloned()
    }

    pub fn parameter(&self, id: i64) -> Option<Arc<ActionParameter>> {
        self.parameters.get(&id).cloned()
    }

    pub fn action(&self, id: i64) -> Option<Arc<Action>> {
        self.actions.get(&id).cloned()
    }

    pub fn data_type(&self, id: i64) -> Option<&DataType> {
        self.data_types.get(&id)
    }

    pub fn filter_kind(&self, id: i64) -> Option<&FilterKind> {
        self.filter_kinds.get(&id)
    }

    /// Implementation kind of a data type, for handing values to the factory.
    pub(crate) fn value_kind(&self, data_type_id: i64) -> Result<&str, SessionError> {
        self.data_types
            .get(&data_type_id)
            .map(|data_type| data_type.kind.as_str())
            .ok_or_else(|| SessionError::missing("data type", data_type_id))
    }

    pub(crate) fn resolve_filter(
        &self,
        filter_kind_id: i64,
        attribute_id: i64,
    ) -> Result<Filter, SessionError> {
        let attribute = self
            .attribute(attribute_id)
            .ok_or_else(|| SessionError::missing("event attribute", attribute_id))?;
        let kind = self
            .filter_kind(filter_kind_id)
            .ok_or_else(|| SessionError::missing("filter", filter_kind_id))?;
        Ok(Filter {
            id: kind.id,
            name: kind.name.clone(),
            attribute,
        })
    }
}

async fn collect<T>(
    conn: &Connection,
    sql: &str,
    map: impl Fn(&Row) -> Result<T, libsql::Error>,
) -> Result<Vec<T>, libsql::Error> {
    let mut rows = conn.query(sql, ()).await?;
    let mut items = Vec::new();
    while let Some(row) = rows.next().await? {
        items.push(map(&row)?);
    }
    Ok(items)
}

fn sorted_by_id<T>(items: impl Iterator<Item = T>, id: impl Fn(&T) -> i64) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| id(item));
    items
}
