//! Pipeline queries.
//!
//! Two filtered, sorted views over the system registry: the *run query*
//! (active systems only, what the frame driver iterates) and the *build
//! query* (active + inactive, what the plan builder iterates — an inactive
//! system may activate between frames, so the plan must already contain the
//! merges its future activation requires).
//!
//! Both are recomputed from the registry on demand rather than maintained
//! incrementally; filtering and sorting a few hundred systems is cheap, and
//! this keeps the two views trivially consistent with the registry without
//! a separate invalidation path to get wrong.

use std::collections::HashSet;

use crate::ecs::entity::Entity;
use crate::ecs::ordering::cmp_systems;
use crate::ecs::phase::{PhaseId, PhaseRegistry};
use crate::ecs::registry::SystemRegistry;
use crate::ecs::system::SystemDescriptor;

/// The phase set a pipeline cares about, plus the run query's match-count
/// bookkeeping.
pub struct PipelineQueries {
    phases: HashSet<PhaseId>,
    match_count: u64,
    last_run_ids: Vec<Entity>,
}

impl PipelineQueries {
    /// Build queries that match systems tagged with any of `phases`.
    pub fn new(phases: impl IntoIterator<Item = PhaseId>) -> Self {
        Self {
            phases: phases.into_iter().collect(),
            match_count: 0,
            last_run_ids: Vec::new(),
        }
    }

    fn in_scope(&self, system: &SystemDescriptor) -> bool {
        self.phases.contains(&system.phase())
    }

    /// Build query: active + inactive systems in scope, sorted by (phase
    /// rank, identity). Excludes hidden (disabled) systems — those are
    /// invisible to the scheduler entirely.
    pub fn build_query<'a>(
        &self,
        registry: &'a SystemRegistry,
        phase_registry: &PhaseRegistry,
    ) -> Vec<&'a SystemDescriptor> {
        let mut systems: Vec<&SystemDescriptor> = registry
            .iter()
            .filter(|s| self.in_scope(s) && !s.is_hidden())
            .collect();
        systems.sort_by(|a, b| cmp_systems(phase_registry, a, b));
        systems
    }

    /// Run query: active systems in scope, sorted the same way as the build
    /// query. Refreshes `match_count` as a side effect, mirroring the
    /// "force sort of query as this could increase the match_count" step
    /// the plan builder relies on before comparing against its last build.
    pub fn run_query<'a>(
        &mut self,
        registry: &'a SystemRegistry,
        phase_registry: &PhaseRegistry,
    ) -> Vec<&'a SystemDescriptor> {
        let mut systems: Vec<&SystemDescriptor> = registry
            .iter()
            .filter(|s| self.in_scope(s) && !s.is_hidden() && s.is_active())
            .collect();
        systems.sort_by(|a, b| cmp_systems(phase_registry, a, b));

        let ids: Vec<Entity> = systems.iter().map(|s| s.id()).collect();
        if ids != self.last_run_ids {
            self.match_count += 1;
            self.last_run_ids = ids;
        }

        systems
    }

    /// The run query's monotone match-set version counter.
    #[must_use]
    pub const fn match_count(&self) -> u64 {
        self.match_count
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
        phase: PhaseId,
        active: bool,
    ) -> Entity {
        let id = alloc.allocate();
        let component = alloc.allocate();
        let mut descriptor = SystemDescriptor::new(
            id,
            phase,
            Box::new(StubQuery {
                columns: vec![Column::new(component, IoKind::In)],
                matches: active,
            }),
            Box::new(CountingBody::default()),
        );
        descriptor.set_inactive(!active);
        registry.insert(descriptor);
        id
    }

    #[test]
    fn build_query_includes_inactive_run_query_does_not() {
        let mut phase_registry = PhaseRegistry::new();
        let phase = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();

        push_system(&mut registry, &mut alloc, phase, true);
        push_system(&mut registry, &mut alloc, phase, false);

        let mut queries = PipelineQueries::new([phase]);
        assert_eq!(queries.build_query(&registry, &phase_registry).len(), 2);
        assert_eq!(queries.run_query(&registry, &phase_registry).len(), 1);
    }

    #[test]
    fn disabled_system_is_excluded_from_both_queries_unlike_inactive() {
        let mut phase_registry = PhaseRegistry::new();
        let phase = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();

        let inactive = push_system(&mut registry, &mut alloc, phase, false);
        let disabled = push_system(&mut registry, &mut alloc, phase, true);
        registry.get_mut(disabled).unwrap().set_disabled(true);

        let mut queries = PipelineQueries::new([phase]);

        // Inactive still occupies a build query slot; disabled does not.
        let build = queries.build_query(&registry, &phase_registry);
        assert_eq!(build.len(), 1);
        assert_eq!(build[0].id(), inactive);

        // Neither runs.
        assert_eq!(queries.run_query(&registry, &phase_registry).len(), 0);
    }

    #[test]
    fn match_count_only_changes_when_the_active_set_changes() {
        let mut phase_registry = PhaseRegistry::new();
        let phase = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();
        let a = push_system(&mut registry, &mut alloc, phase, true);
        let _b = push_system(&mut registry, &mut alloc, phase, true);

        let mut queries = PipelineQueries::new([phase]);
        queries.run_query(&registry, &phase_registry);
        let after_first = queries.match_count();

        queries.run_query(&registry, &phase_registry);
        assert_eq!(queries.match_count(), after_first, "unchanged set must not bump match_count");

        registry.get_mut(a).unwrap().set_inactive(true);
        queries.run_query(&registry, &phase_registry);
        assert!(queries.match_count() > after_first, "deactivation must bump match_count");
    }
}
