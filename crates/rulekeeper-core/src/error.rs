use thiserror::Error;

use crate::db::DbError;
use crate::values::ValueError;

/// Persisted rows that cannot be assembled into a valid rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("filter rows {0:?} never reach the rule root (dangling or cyclic parent)")]
    UnresolvedFilters(Vec<i64>),
    #[error("filter row {0} appears more than once")]
    DuplicateFilter(i64),
    #[error("{kind} {id} is referenced but not registered")]
    MissingDescriptor { kind: &'static str, id: i64 },
    #[error("action {action_id} declares {expected} parameters but {found} values were supplied")]
    ParameterMismatch {
        action_id: i64,
        expected: usize,
        found: usize,
    },
    #[error("value of kind {found} does not fit data type {data_type_id} ({expected})")]
    ValueKindMismatch {
        data_type_id: i64,
        expected: String,
        found: &'static str,
    },
    #[error("rule action {rule_action_id} stores parameter {parameter_id}, which action {action_id} does not declare")]
    UnknownParameter {
        rule_action_id: i64,
        action_id: i64,
        parameter_id: i64,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    ClosedHandle,
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },
    #[error("insert into {0} returned no id")]
    InsertFailed(&'static str),
    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] IntegrityError),
    #[error("database error: {0}")]
    Database(#[from] DbError),
    #[error("sql error: {0}")]
    Sql(#[from] libsql::Error),
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

impl SessionError {
    pub(crate) fn missing(kind: &'static str, id: i64) -> Self {
        IntegrityError::MissingDescriptor { kind, id }.into()
    }
}
