use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::{IntegrityError, SessionError};
use crate::metadata::MetadataCache;
use crate::values::ValueFactory;

use super::repositories::FilterRow;
use super::types::{FIRST_FILTER_ID, FilterNode, ROOT_PARENT_ID};

/// A node waiting to be linked under its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNode<T> {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub item: T,
}

fn is_root_parent(node_id: i64, parent_id: Option<i64>) -> bool {
    match parent_id {
        None => true,
        Some(ROOT_PARENT_ID) => true,
        Some(parent) if parent < FIRST_FILTER_ID => {
            warn!(node_id, parent, "non-canonical root parent reference");
            true
        }
        Some(_) => false,
    }
}

/// Link nodes given in any order into a forest hanging off the rule root.
///
/// Builds a parent -> children index, walks it from the root-level nodes with
/// an explicit stack, then constructs owned nodes leaves-first. Nodes the walk
/// never reaches have a dangling or cyclic parent and fail the whole assembly.
/// Siblings come out in ascending id order.
pub fn assemble_forest<T, N>(
    nodes: Vec<PendingNode<T>>,
    mut build: impl FnMut(i64, T, Vec<N>) -> N,
) -> Result<Vec<N>, IntegrityError> {
    let mut items: HashMap<i64, T> = HashMap::with_capacity(nodes.len());
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut roots = Vec::new();

    for node in nodes {
        if items.insert(node.id, node.item).is_some() {
            return Err(IntegrityError::DuplicateFilter(node.id));
        }
        if is_root_parent(node.id, node.parent_id) {
            roots.push(node.id);
        } else if let Some(parent) = node.parent_id {
            children.entry(parent).or_default().push(node.id);
        }
    }
    roots.sort_unstable();
    for siblings in children.values_mut() {
        siblings.sort_unstable();
    }

    let mut order = Vec::with_capacity(items.len());
    let mut stack: Vec<i64> = roots.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        order.push(id);
        if let Some(siblings) = children.get(&id) {
            stack.extend(siblings.iter().rev());
        }
    }

    if order.len() != items.len() {
        let reached: HashSet<i64> = order.iter().copied().collect();
        let mut unresolved: Vec<i64> = items
            .keys()
            .filter(|id| !reached.contains(id))
            .copied()
            .collect();
        unresolved.sort_unstable();
        return Err(IntegrityError::UnresolvedFilters(unresolved));
    }

    let mut built: HashMap<i64, N> = HashMap::with_capacity(order.len());
    for id in order.into_iter().rev() {
        let Some(item) = items.remove(&id) else {
            continue;
        };
        let kids = children
            .get(&id)
            .map(|siblings| {
                siblings
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect()
            })
            .unwrap_or_default();
        built.insert(id, build(id, item, kids));
    }

    Ok(roots
        .iter()
        .filter_map(|id| built.remove(id))
        .collect())
}

/// Turns one rule's stored filter rows into its filter forest, resolving
/// descriptors through the metadata cache and values through the factory.
pub struct FilterTreeBuilder<'a> {
    cache: &'a MetadataCache,
    values: &'a dyn ValueFactory,
}

impl<'a> FilterTreeBuilder<'a> {
    pub fn new(cache: &'a MetadataCache, values: &'a dyn ValueFactory) -> Self {
        Self { cache, values }
    }

    pub fn build(&self, rows: Vec<FilterRow>) -> Result<Vec<FilterNode>, SessionError> {
        let mut pending = Vec::with_capacity(rows.len());
        for row in rows {
            let filter = self
                .cache
                .resolve_filter(row.filter_kind_id, row.attribute_id)?;
            let kind = self.cache.value_kind(filter.attribute.data_type_id)?;
            let value = self.values.create(kind, &row.data)?;
            pending.push(PendingNode {
                id: row.id,
                parent_id: row.parent_id,
                item: (filter, value),
            });
        }

        let forest = assemble_forest(pending, |id, (filter, value), children| FilterNode {
            id: Some(id),
            filter,
            value,
            children,
        })?;
        Ok(forest)
    }
}
