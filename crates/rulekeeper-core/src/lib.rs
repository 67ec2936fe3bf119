pub mod config;
pub mod db;
pub mod error;
pub mod metadata;
pub mod migrations;
pub mod rules;
pub mod session;
pub mod telemetry;
pub mod values;

pub use config::Config;
pub use db::{Database, DbError};
pub use error::{IntegrityError, SessionError};
pub use metadata::{
    Action, ActionParameter, Application, DataType, Event, EventAttribute, Filter, FilterKind,
    MetadataCache, Registry,
};
pub use rules::{FilterNode, ROOT_PARENT_ID, Rule, RuleAction, RuleSummary};
pub use session::Session;
pub use telemetry::{TelemetryError, init_logging};
pub use values::{StandardValueFactory, TypedValue, ValueError, ValueFactory};
