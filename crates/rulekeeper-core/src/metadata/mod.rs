pub mod cache;
pub mod registry;
pub mod types;

pub use cache::MetadataCache;
pub use registry::Registry;
pub use types::{
    Action, ActionParameter, Application, DataType, Event, EventAttribute, Filter, FilterKind,
};
