//! The system arena
//!
//! Backs both pipeline queries. Uses the same stable-handle idiom as
//! [`crate::foundation::collections`] (a `slotmap` arena plus an index from
//! the public [`Entity`] id to the internal handle) so descriptors never
//! move once inserted.

use std::collections::HashMap;

use crate::ecs::entity::Entity;
use crate::ecs::system::SystemDescriptor;
use crate::foundation::collections::{Handle, HandleMap};

/// Owns every system descriptor in a world, keyed by stable [`Entity`] id.
#[derive(Default)]
pub struct SystemRegistry {
    arena: HandleMap<SystemDescriptor>,
    index: HashMap<Entity, Handle>,
}

impl SystemRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: HandleMap::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a descriptor, keyed by its own id.
    pub fn insert(&mut self, descriptor: SystemDescriptor) -> Entity {
        let id = descriptor.id();
        let handle = self.arena.insert(descriptor);
        self.index.insert(id, handle);
        id
    }

    /// Remove a system by id. Destroys its descriptor.
    pub fn remove(&mut self, id: Entity) -> Option<SystemDescriptor> {
        let handle = self.index.remove(&id)?;
        self.arena.remove(handle)
    }

    /// Look up a descriptor by id.
    #[must_use]
    pub fn get(&self, id: Entity) -> Option<&SystemDescriptor> {
        let handle = *self.index.get(&id)?;
        self.arena.get(handle)
    }

    /// Look up a descriptor by id, mutably.
    pub fn get_mut(&mut self, id: Entity) -> Option<&mut SystemDescriptor> {
        let handle = *self.index.get(&id)?;
        self.arena.get_mut(handle)
    }

    /// Iterate every registered descriptor (both pipeline queries filter
    /// this).
    pub fn iter(&self) -> impl Iterator<Item = &SystemDescriptor> {
        self.arena.values()
    }

    /// Number of registered systems, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether no systems are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}
