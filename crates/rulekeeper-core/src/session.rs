use std::sync::Arc;

use tracing::info;

use crate::db::Database;
use crate::error::SessionError;
use crate::metadata::{Action, ActionParameter, Application, Event, EventAttribute, Filter, MetadataCache};
use crate::rules::{Rule, RuleContext, RuleStore, RuleSummary};
use crate::values::{StandardValueFactory, ValueFactory};

/// One caller's view of the rule store.
///
/// The metadata cache is loaded eagerly on open and never refreshed. After
/// `close`, every operation (including a second `close`) fails with
/// `SessionError::ClosedHandle` without touching the store.
pub struct Session {
    db: Option<Database>,
    cache: MetadataCache,
    values: Arc<dyn ValueFactory>,
}

impl Session {
    pub async fn open(db: Database) -> Result<Self, SessionError> {
        Self::open_with_factory(db, Arc::new(StandardValueFactory)).await
    }

    pub async fn open_with_factory(
        db: Database,
        values: Arc<dyn ValueFactory>,
    ) -> Result<Self, SessionError> {
        let conn = db.connection().await?;
        let cache = MetadataCache::load(&conn).await?;
        info!("rule session opened");
        Ok(Self {
            db: Some(db),
            cache,
            values,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.db.is_none()
    }

    pub fn close(&mut self) -> Result<(), SessionError> {
        self.db.take().ok_or(SessionError::ClosedHandle)?;
        self.cache = MetadataCache::default();
        info!("rule session closed");
        Ok(())
    }

    fn database(&self) -> Result<&Database, SessionError> {
        self.db.as_ref().ok_or(SessionError::ClosedHandle)
    }

    fn open_cache(&self) -> Result<&MetadataCache, SessionError> {
        self.database()?;
        Ok(&self.cache)
    }

    pub fn all_applications(&self) -> Result<Vec<Arc<Application>>, SessionError> {
        Ok(self.open_cache()?.applications())
    }

    pub fn all_events(&self) -> Result<Vec<Arc<Event>>, SessionError> {
        Ok(self.open_cache()?.events())
    }

    pub fn actions_for_application(
        &self,
        application: &Application,
    ) -> Result<Vec<Arc<Action>>, SessionError> {
        Ok(self.open_cache()?.actions_for_application(application.id))
    }

    pub fn attributes_for_event(
        &self,
        event: &Event,
    ) -> Result<Vec<Arc<EventAttribute>>, SessionError> {
        Ok(self.open_cache()?.attributes_for_event(event.id))
    }

    pub async fn filters_for_attribute(
        &self,
        attribute: &Arc<EventAttribute>,
    ) -> Result<Vec<Filter>, SessionError> {
        let conn = self.database()?.connection().await?;
        self.cache.filters_for_attribute(&conn, attribute).await
    }

    pub fn application(&self, id: i64) -> Result<Arc<Application>, SessionError> {
        self.open_cache()?
            .application(id)
            .ok_or(SessionError::NotFound {
                entity: "application",
                id,
            })
    }

    pub fn event(&self, id: i64) -> Result<Arc<Event>, SessionError> {
        self.open_cache()?
            .event(id)
            .ok_or(SessionError::NotFound { entity: "event", id })
    }

    pub fn attribute(&self, id: i64) -> Result<Arc<EventAttribute>, SessionError> {
        self.open_cache()?
            .attribute(id)
            .ok_or(SessionError::NotFound {
                entity: "event attribute",
                id,
            })
    }

    pub fn action(&self, id: i64) -> Result<Arc<Action>, SessionError> {
        self.open_cache()?
            .action(id)
            .ok_or(SessionError::NotFound { entity: "action", id })
    }

    pub fn parameter(&self, id: i64) -> Result<Arc<ActionParameter>, SessionError> {
        self.open_cache()?
            .parameter(id)
            .ok_or(SessionError::NotFound {
                entity: "action parameter",
                id,
            })
    }

    pub async fn list_rules(&self) -> Result<Vec<RuleSummary>, SessionError> {
        let conn = self.database()?.connection().await?;
        RuleStore::new(&conn).list_rules().await
    }

    pub async fn load_rule(&self, id: i64) -> Result<Rule, SessionError> {
        let conn = self.database()?.connection().await?;
        RuleContext::new(&conn, &self.cache, self.values.as_ref())
            .load_rule(id)
            .await
    }

    /// Save inside one transaction: a failure part way leaves the previous
    /// version of the rule (if any) untouched.
    pub async fn save_rule(&self, rule: &Rule) -> Result<i64, SessionError> {
        let conn = self.database()?.connection().await?;
        let tx = conn.transaction().await?;
        let rule_id = RuleContext::new(&tx, &self.cache, self.values.as_ref())
            .save_rule(rule)
            .await?;
        tx.commit().await?;
        info!(rule_id, replaced = ?rule.id, "rule saved");
        Ok(rule_id)
    }

    pub async fn delete_rule(&self, id: i64) -> Result<(), SessionError> {
        let conn = self.database()?.connection().await?;
        let tx = conn.transaction().await?;
        RuleContext::new(&tx, &self.cache, self.values.as_ref())
            .delete_rule(id)
            .await?;
        tx.commit().await?;
        info!(rule_id = id, "rule deleted");
        Ok(())
    }
}
