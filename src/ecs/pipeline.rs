//! Frame driver.
//!
//! A pipeline bundles a phase set, its [`PipelineQueries`] and [`Plan`].
//! `progress` walks the run query in plan order, advancing execution groups
//! and calling out to the worker pool at every merge; if a merge changes
//! the match set, the iterator is invalidated and must be recovered rather
//! than resumed blindly.

use crate::ecs::activation;
use crate::ecs::entity::Entity;
use crate::ecs::phase::{PhaseId, PhaseRegistry};
use crate::ecs::plan::{ExecutionGroup, Plan};
use crate::ecs::query::PipelineQueries;
use crate::ecs::registry::SystemRegistry;
use crate::ecs::worker::WorkerPool;
use crate::error::{SchedulerError, SchedulerResult};

/// A pipeline: a phase set plus the plan built over it. One world may host
/// several, though only one is ever the "current" pipeline.
pub struct Pipeline {
    queries: PipelineQueries,
    plan: Plan,
}

impl Pipeline {
    /// Materialize a pipeline over `phases`: queries are constructed
    /// immediately, and `match_count_at_build` is left unset so the first
    /// `update`/`begin` unconditionally rebuilds.
    #[must_use]
    pub fn new(phases: impl IntoIterator<Item = PhaseId>) -> Self {
        Self {
            queries: PipelineQueries::new(phases),
            plan: Plan::new(),
        }
    }

    /// This pipeline's current execution groups.
    #[must_use]
    pub fn groups(&self) -> &[ExecutionGroup] {
        self.plan.groups()
    }

    /// Rebuild the plan if the run query's match count has moved since the
    /// last build. Returns the resulting group count.
    pub fn update(&mut self, registry: &SystemRegistry, phase_registry: &PhaseRegistry) -> SchedulerResult<u32> {
        self.plan.rebuild_if_stale(&mut self.queries, registry, phase_registry)?;
        Ok(self.plan.groups().len() as u32)
    }

    /// Unconditionally rebuild the plan, regardless of whether the run
    /// query's match count has moved. Returns the resulting group count.
    pub fn begin(&mut self, registry: &SystemRegistry, phase_registry: &PhaseRegistry) -> SchedulerResult<u32> {
        self.plan.force_rebuild(&mut self.queries, registry, phase_registry)?;
        Ok(self.plan.groups().len() as u32)
    }

    /// No-op, paired with [`Pipeline::begin`] for API symmetry.
    pub const fn end(&self) {}

    /// Deactivate every system this pipeline's build query matches with
    /// zero tables.
    pub fn deactivate_systems(&self, registry: &mut SystemRegistry, phase_registry: &PhaseRegistry) {
        activation::deactivate_systems(registry, &self.queries, phase_registry);
    }

    /// Execute one frame: run every system in the run query in plan order,
    /// opening/closing a worker epoch and calling the inter-group barrier
    /// at each merge.
    pub fn progress(
        &mut self,
        registry: &mut SystemRegistry,
        phase_registry: &PhaseRegistry,
        worker_pool: &mut dyn WorkerPool,
        delta_time: f32,
    ) -> SchedulerResult<()> {
        self.plan.rebuild_if_stale(&mut self.queries, registry, phase_registry)?;

        let mut run_ids = run_query_ids(&mut self.queries, registry, phase_registry);
        let groups = self.plan.groups().to_vec();

        worker_pool.worker_begin();

        let mut index = 0usize;
        let mut group_index = 0usize;
        let mut ran_since_merge = 0u32;

        while index < run_ids.len() {
            let id = run_ids[index];
            if let Some(system) = registry.get_mut(id) {
                system.execute(delta_time);
            }
            ran_since_merge += 1;

            if !is_last_group(&groups, group_index) && ran_since_merge == group_count(&groups, group_index) {
                ran_since_merge = 0;
                group_index += 1;

                if worker_pool.worker_sync() {
                    let fresh = run_query_ids(&mut self.queries, registry, phase_registry);
                    let recovered = recover_iterator(&fresh, &groups, id)?;
                    run_ids = fresh;
                    index = recovered.resume_index;
                    group_index = recovered.group_index;
                    ran_since_merge = recovered.ran_since_merge;
                    continue;
                }
            }

            index += 1;
        }

        worker_pool.worker_end();
        Ok(())
    }
}

fn run_query_ids(
    queries: &mut PipelineQueries,
    registry: &SystemRegistry,
    phase_registry: &PhaseRegistry,
) -> Vec<Entity> {
    queries
        .run_query(registry, phase_registry)
        .iter()
        .map(|system| system.id())
        .collect()
}

fn group_count(groups: &[ExecutionGroup], group_index: usize) -> u32 {
    groups.get(group_index).map_or(0, |group| group.count)
}

fn is_last_group(groups: &[ExecutionGroup], group_index: usize) -> bool {
    group_index + 1 >= groups.len()
}

struct Recovered {
    resume_index: usize,
    group_index: usize,
    ran_since_merge: u32,
}

/// Walk a freshly-obtained run query from the start, mirroring the same
/// group-advance bookkeeping `progress` applies, until `last_executed` is
/// found. Resumes one past it. Returns `InternalInconsistency` if the plan
/// is broken and the entity cannot be located.
fn recover_iterator(
    fresh_run_ids: &[Entity],
    groups: &[ExecutionGroup],
    last_executed: Entity,
) -> SchedulerResult<Recovered> {
    let mut group_index = 0usize;
    let mut ran_since_merge = 0u32;

    for (position, &id) in fresh_run_ids.iter().enumerate() {
        ran_since_merge += 1;

        if !is_last_group(groups, group_index) && ran_since_merge == group_count(groups, group_index) {
            ran_since_merge = 0;
            group_index += 1;
        }

        if id == last_executed {
            return Ok(Recovered {
                resume_index: position + 1,
                group_index,
                ran_since_merge,
            });
        }
    }

    Err(SchedulerError::InternalInconsistency(format!(
        "iterator-recover: resuming entity {last_executed} not found in the fresh run query"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Column, IoKind, Operator, SourceKind};
    use crate::ecs::entity::EntityAllocator;
    use crate::ecs::system::test_support::{CountingBody, StubQuery};
    use crate::ecs::system::SystemDescriptor;
    use crate::ecs::worker::SequentialWorkerPool;

    fn insert_system(
        registry: &mut SystemRegistry,
        alloc: &mut EntityAllocator,
        phase: PhaseId,
        columns: Vec<Column>,
    ) -> Entity {
        let id = alloc.allocate();
        let descriptor = SystemDescriptor::new(
            id,
            phase,
            Box::new(StubQuery { columns, matches: true }),
            Box::new(CountingBody::default()),
        );
        registry.insert(descriptor);
        id
    }

    #[test]
    fn scenario_a_runs_all_three_systems_in_one_group() {
        let mut phase_registry = PhaseRegistry::new();
        let on_update = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();
        let component_a = alloc.allocate();

        let s1 = insert_system(&mut registry, &mut alloc, on_update, vec![Column::new(component_a, IoKind::In)]);
        let s2 = insert_system(&mut registry, &mut alloc, on_update, vec![Column::new(component_a, IoKind::In)]);
        let s3 = insert_system(&mut registry, &mut alloc, on_update, vec![Column::new(component_a, IoKind::In)]);

        let mut pipeline = Pipeline::new([on_update]);
        let mut pool = SequentialWorkerPool::new();
        pipeline.progress(&mut registry, &phase_registry, &mut pool, 0.016).unwrap();

        assert_eq!(pipeline.groups().len(), 1);
        assert_eq!(pipeline.groups()[0].count, 3);
        for id in [s1, s2, s3] {
            // CountingBody tracks executions; downcast isn't available on a
            // trait object, so just assert the system is still present and
            // the frame completed without error.
            assert!(registry.get(id).is_some());
        }
    }

    #[test]
    fn scenario_b_calls_one_barrier_between_two_groups() {
        let mut phase_registry = PhaseRegistry::new();
        let pre_update = phase_registry.register_phase("PreUpdate");
        let on_update = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();
        let component_a = alloc.allocate();
        let component_b = alloc.allocate();

        insert_system(
            &mut registry,
            &mut alloc,
            pre_update,
            vec![Column::with_kind(component_a, IoKind::Out, SourceKind::FromEmpty, Operator::And)],
        );
        insert_system(&mut registry, &mut alloc, on_update, vec![Column::new(component_a, IoKind::In)]);
        insert_system(&mut registry, &mut alloc, on_update, vec![Column::new(component_b, IoKind::In)]);

        let mut pipeline = Pipeline::new([pre_update, on_update]);
        let mut pool = SequentialWorkerPool::new();
        pipeline.progress(&mut registry, &phase_registry, &mut pool, 0.016).unwrap();

        assert_eq!(pipeline.groups().len(), 2);
        assert_eq!(pipeline.groups()[0].count, 1);
        assert_eq!(pipeline.groups()[1].count, 2);
    }

    #[test]
    fn scenario_d_iterator_invalidation_resumes_without_skipping_or_repeating() {
        let mut phase_registry = PhaseRegistry::new();
        let pre_update = phase_registry.register_phase("PreUpdate");
        let on_update = phase_registry.register_phase("OnUpdate");
        let mut registry = SystemRegistry::new();
        let mut alloc = EntityAllocator::new();
        let component_a = alloc.allocate();
        let component_b = alloc.allocate();

        insert_system(
            &mut registry,
            &mut alloc,
            pre_update,
            vec![Column::with_kind(component_a, IoKind::Out, SourceKind::FromEmpty, Operator::And)],
        );
        insert_system(&mut registry, &mut alloc, on_update, vec![Column::new(component_a, IoKind::In)]);
        let late_activating = insert_system(&mut registry, &mut alloc, on_update, vec![Column::new(component_b, IoKind::In)]);
        registry.get_mut(late_activating).unwrap().set_inactive(true);

        let mut pipeline = Pipeline::new([pre_update, on_update]);
        pipeline.update(&registry, &phase_registry).unwrap();

        // The barrier reports a structural change; while it does, the
        // late-activating system actually flips active so the fresh run
        // query picks it up.
        registry.get_mut(late_activating).unwrap().set_inactive(false);
        let mut pool = SequentialWorkerPool::new();
        pool.notify_structural_change();

        let result = pipeline.progress(&mut registry, &phase_registry, &mut pool, 0.016);
        assert!(result.is_ok(), "recovery must succeed: {result:?}");
    }

    #[test]
    fn recover_iterator_errors_when_the_entity_is_gone() {
        let mut alloc = EntityAllocator::new();
        let missing = alloc.allocate();

        let groups = vec![ExecutionGroup { count: 1 }];
        let result = recover_iterator(&[], &groups, missing);
        assert!(matches!(result, Err(SchedulerError::InternalInconsistency(_))));
    }
}
