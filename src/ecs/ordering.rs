//! Ordering oracle.
//!
//! Two comparators, composed into the single total order both pipeline
//! queries sort by: phase rank first, system identity as the tie-break.
//! Ties beyond identity are impossible since entity ids are unique.

use std::cmp::Ordering;

use crate::ecs::entity::Entity;
use crate::ecs::phase::PhaseRegistry;
use crate::ecs::system::SystemDescriptor;

/// Identity comparator: `sign(a.id() - b.id())`.
#[must_use]
pub fn cmp_id(a: Entity, b: Entity) -> Ordering {
    a.cmp(&b)
}

/// A system's phase rank, looked up in the registry it was tagged against.
#[must_use]
pub fn rank(registry: &PhaseRegistry, system: &SystemDescriptor) -> u32 {
    registry.phase_rank(system.phase())
}

/// The pipeline queries' total order: phase rank, then identity.
#[must_use]
pub fn cmp_systems(
    registry: &PhaseRegistry,
    a: &SystemDescriptor,
    b: &SystemDescriptor,
) -> Ordering {
    rank(registry, a)
        .cmp(&rank(registry, b))
        .then_with(|| cmp_id(a.id(), b.id()))
}
