//! Activation sweep.
//!
//! Scans the build query and marks `Inactive` every system whose query
//! currently matches zero storage tables. Reactivation is not this sweep's
//! job — a system's query gains matches as a side effect of external
//! component add/remove, at which point the world clears `Inactive` for it
//! directly.

use crate::ecs::phase::PhaseRegistry;
use crate::ecs::query::PipelineQueries;
use crate::ecs::registry::SystemRegistry;

/// Deactivate every system in `queries`'s build query whose query matches
/// no tables. Adding the `Inactive` tag mid-iteration must not perturb the
/// sweep itself, so this collects ids first and mutates the registry only
/// after the scan completes.
pub fn deactivate_systems(
    registry: &mut SystemRegistry,
    queries: &PipelineQueries,
    phase_registry: &PhaseRegistry,
) {
    let to_deactivate: Vec<_> = queries
        .build_query(registry, phase_registry)
        .iter()
        .filter(|system| !system.matches_any_table())
        .map(|system| system.id())
        .collect();

    for id in to_deactivate {
        if let Some(system) = registry.get_mut(id) {
            system.set_inactive(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Column, IoKind};
    use crate::ecs::entity::EntityAllocator;
    use crate::ecs::system::test_support::{CountingBody, StubQuery};
    use crate::ecs::system::SystemDescriptor;

    fn push_system(
        registry: &mut SystemRegistry,
        alloc: &mut EntityAllocator,
        phase_registry: &PhaseRegistry,
        phase_name: &str,
        matches: bool,
    ) -> crate::ecs::entity::Entity {
        let phase = phase_registry.phase_by_name(phase_name).unwrap();
        let id = alloc.allocate();
        let component = alloc.allocate();
        let descriptor = SystemDescriptor::new(
            id,
            phase,
            Box::new(StubQuery {
                columns: vec![Column::new(component, IoKind::In)],
                matches,
            }),
            Box::new(CountingBody::default()),
        );
        registry.insert(descriptor);
        id
    }

    #[test]
    fn systems_matching_no_tables_are_marked_inactive() {
        let mut phase_registry = PhaseRegistry::new();
        let phase = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();
        let empty = push_system(&mut registry, &mut alloc, &phase_registry, "OnUpdate", false);
        let queries = PipelineQueries::new([phase]);

        deactivate_systems(&mut registry, &queries, &phase_registry);

        assert!(!registry.get(empty).unwrap().is_active());
    }

    #[test]
    fn never_deactivates_a_system_whose_query_matches_at_least_one_table() {
        let mut phase_registry = PhaseRegistry::new();
        let phase = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();
        let populated = push_system(&mut registry, &mut alloc, &phase_registry, "OnUpdate", true);
        let queries = PipelineQueries::new([phase]);

        deactivate_systems(&mut registry, &queries, &phase_registry);

        assert!(registry.get(populated).unwrap().is_active());
    }

    #[test]
    fn sweep_does_not_reactivate_an_already_inactive_system() {
        let mut phase_registry = PhaseRegistry::new();
        let phase = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();
        let id = push_system(&mut registry, &mut alloc, &phase_registry, "OnUpdate", true);
        registry.get_mut(id).unwrap().set_inactive(true);
        let queries = PipelineQueries::new([phase]);

        deactivate_systems(&mut registry, &queries, &phase_registry);

        assert!(!registry.get(id).unwrap().is_active());
    }
}
