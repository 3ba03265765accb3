//! Item merging
//!
//! Builds the published collection out of the fetched entities and the
//! view's local state.

use crate::decode::Entity;
use crate::types::EntityKey;
use std::collections::{HashMap, HashSet};

/// Local state merged on top of the fetched entities
#[derive(Debug)]
pub(crate) struct MergeInput<'a, T> {
    pub fixed_keys: &'a [EntityKey],
    pub pinned: &'a HashMap<EntityKey, T>,
    pub added: &'a [T],
    pub removed: &'a HashSet<EntityKey>,
    pub max_items: Option<usize>,
}

/// Merge fixed, added and fetched entities
///
/// Order is fixed keys (in declaration order), then locally added entities
/// not part of the fetched set, then the fetched entities. Each key appears
/// once, at its first position, keyed by the entity's own key. The copy
/// used for a key is the locally added one, else the fetched one, else the
/// pinned one.
pub(crate) fn merge_items<T: Entity>(input: &MergeInput<'_, T>, fetched: &[T]) -> Vec<T> {
    let fetched_by_key: HashMap<EntityKey, &T> =
        fetched.iter().map(|entity| (entity.key(), entity)).collect();
    let added_by_key: HashMap<EntityKey, &T> =
        input.added.iter().map(|entity| (entity.key(), entity)).collect();

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(input.fixed_keys.len() + input.added.len() + fetched.len());
    let mut push = |entity: &T| {
        let key = entity.key();
        if !input.removed.contains(&key) && seen.insert(key) {
            items.push(entity.clone());
        }
    };

    for key in input.fixed_keys {
        let entity = added_by_key
            .get(key)
            .or_else(|| fetched_by_key.get(key))
            .copied()
            .or_else(|| input.pinned.get(key));
        if let Some(entity) = entity {
            push(entity);
        }
    }

    for entity in input.added {
        if !fetched_by_key.contains_key(&entity.key()) {
            push(entity);
        }
    }

    for entity in fetched {
        let key = entity.key();
        let entity = added_by_key.get(&key).copied().unwrap_or(entity);
        push(entity);
    }

    if let Some(max) = input.max_items {
        items.truncate(max);
    }
    items
}
