pub mod assembler;
pub mod deleter;
pub mod repositories;
pub mod tree;
pub mod types;
pub mod writer;

pub use assembler::RuleContext;
pub use repositories::{FilterRow, RuleStore};
pub use tree::{FilterTreeBuilder, PendingNode, assemble_forest};
pub use types::{FIRST_FILTER_ID, FilterNode, ROOT_PARENT_ID, Rule, RuleAction, RuleSummary};
