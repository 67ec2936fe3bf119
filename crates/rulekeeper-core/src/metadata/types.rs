use std::sync::Arc;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataType {
    pub id: i64,
    pub name: String,
    /// Implementation kind handed to the value factory, e.g. `text` or `datetime`.
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterKind {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventAttribute {
    pub id: i64,
    pub event_id: i64,
    pub data_type_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionParameter {
    pub id: i64,
    pub action_id: i64,
    pub data_type_id: i64,
    pub name: String,
}

/// A registered action. `parameters` is ordered; rule actions pair their
/// values with it by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub id: i64,
    pub name: String,
    pub application: Arc<Application>,
    pub parameters: Vec<Arc<ActionParameter>>,
}

/// A filter kind bound to the attribute it compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub id: i64,
    pub name: String,
    pub attribute: Arc<EventAttribute>,
}
