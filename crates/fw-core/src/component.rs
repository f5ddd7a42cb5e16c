//! Per-entity typed data slots.
//!
//! The table maps `(entity, data kind)` to one record, so any entity can
//! carry any number of differently-typed records (its transform, its port
//! index, its line index, host data) without the entity struct knowing
//! about them.

use crate::id::EntityKey;
use std::any::{Any, TypeId};
use std::collections::HashMap;

#[derive(Default)]
pub struct ComponentTable {
    slots: HashMap<(EntityKey, TypeId), Box<dyn Any>>,
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or replace) the `T` record of an entity. Returns the old one.
    pub fn insert<T: Any>(&mut self, entity: impl Into<EntityKey>, data: T) -> Option<T> {
        self.slots
            .insert((entity.into(), TypeId::of::<T>()), Box::new(data))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|b| *b)
    }

    pub fn get<T: Any>(&self, entity: impl Into<EntityKey>) -> Option<&T> {
        self.slots
            .get(&(entity.into(), TypeId::of::<T>()))
            .and_then(|b| b.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, entity: impl Into<EntityKey>) -> Option<&mut T> {
        self.slots
            .get_mut(&(entity.into(), TypeId::of::<T>()))
            .and_then(|b| b.downcast_mut::<T>())
    }

    /// Get the `T` record, creating it with `Default` on first access.
    pub fn get_or_default<T: Any + Default>(&mut self, entity: impl Into<EntityKey>) -> &mut T {
        self.slots
            .entry((entity.into(), TypeId::of::<T>()))
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .expect("component slot holds the type it is keyed by")
    }

    pub fn remove<T: Any>(&mut self, entity: impl Into<EntityKey>) -> Option<T> {
        self.slots
            .remove(&(entity.into(), TypeId::of::<T>()))
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Drop every record attached to an entity.
    pub fn remove_entity(&mut self, entity: impl Into<EntityKey>) {
        let key = entity.into();
        self.slots.retain(|(k, _), _| *k != key);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;

    #[derive(Debug, Default, PartialEq)]
    struct Weight(u32);

    #[derive(Debug, Default, PartialEq)]
    struct Label(&'static str);

    #[test]
    fn slots_are_keyed_by_type() {
        let mut table = ComponentTable::new();
        let n = NodeId::intern("component_node");
        table.insert(n, Weight(3));
        table.insert(n, Label("hi"));

        assert_eq!(table.get::<Weight>(n), Some(&Weight(3)));
        assert_eq!(table.get::<Label>(n), Some(&Label("hi")));

        table.get_or_default::<Weight>(n).0 += 1;
        assert_eq!(table.get::<Weight>(n), Some(&Weight(4)));

        table.remove_entity(n);
        assert!(table.is_empty());
    }
}
