//! Plan builder — the central scheduling algorithm.
//!
//! A single forward pass over the build query that tracks, per component,
//! whether it has been written directly to main storage or only staged
//! (e.g. via a deferred command) since the last merge. A reader of a
//! staged write needs a barrier before it; a reader of a main write does
//! not, because main writes are already visible. The pass inserts the
//! minimum number of merges a single greedy sweep can find — no claim of
//! global optimality.

use std::collections::HashMap;

use crate::ecs::component::{Column, ComponentId, IoKind, Operator, SourceKind};
use crate::ecs::phase::PhaseRegistry;
use crate::ecs::query::PipelineQueries;
use crate::ecs::registry::SystemRegistry;
use crate::ecs::system::SystemDescriptor;
use crate::error::{SchedulerError, SchedulerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    NotWritten,
    WriteToMain,
    WriteToStage,
}

/// A maximal contiguous run of active systems between two merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionGroup {
    /// Number of *active* systems in this group. Inactive systems
    /// contributed to planning (they may activate later) but not to this
    /// count, since the run query skips them.
    pub count: u32,
}

fn check_column_component(
    column: Column,
    is_active: bool,
    write_state: &mut HashMap<ComponentId, WriteState>,
) -> bool {
    let state = write_state
        .get(&column.component_id)
        .copied()
        .unwrap_or(WriteState::NotWritten);
    let mut requests_merge = false;

    if column.source_kind == SourceKind::FromSelf && column.operator != Operator::Not {
        match column.io_kind {
            IoKind::In => {
                if state == WriteState::WriteToStage {
                    requests_merge = true;
                }
            }
            IoKind::InOut => {
                if state == WriteState::WriteToStage {
                    requests_merge = true;
                }
                if is_active {
                    write_state.insert(column.component_id, WriteState::WriteToMain);
                }
            }
            IoKind::Out => {
                if is_active {
                    write_state.insert(column.component_id, WriteState::WriteToMain);
                }
            }
        }
    } else if column.source_kind == SourceKind::FromEmpty || column.operator == Operator::Not {
        match column.io_kind {
            IoKind::InOut | IoKind::Out => {
                if is_active {
                    write_state.insert(column.component_id, WriteState::WriteToStage);
                }
            }
            IoKind::In => {}
        }
    }

    requests_merge
}

fn check_column(
    column: Column,
    is_active: bool,
    write_state: &mut HashMap<ComponentId, WriteState>,
) -> bool {
    if column.operator == Operator::Or {
        return false;
    }
    check_column_component(column, is_active, write_state)
}

/// Evaluate every column of a system against the current write state.
/// Never short-circuits: every column's side effect on `write_state` must
/// be applied, not just the first one that requests a merge.
fn system_needs_merge(
    system: &SystemDescriptor,
    is_active: bool,
    write_state: &mut HashMap<ComponentId, WriteState>,
) -> bool {
    let mut needs_merge = false;
    for &column in system.columns() {
        needs_merge |= check_column(column, is_active, write_state);
    }
    needs_merge
}

/// Run the single forward sweep over an already phase/identity-sorted
/// build query, producing the group vector.
pub fn build_plan(build_query: &[&SystemDescriptor]) -> SchedulerResult<Vec<ExecutionGroup>> {
    let mut write_state: HashMap<ComponentId, WriteState> = HashMap::new();
    let mut groups: Vec<ExecutionGroup> = Vec::new();
    let mut has_open_group = false;

    for &system in build_query {
        let is_active = system.is_active();
        let mut needs_merge = system_needs_merge(system, is_active, &mut write_state);

        if needs_merge {
            // After a merge, every staged write becomes visible, so the
            // write-state scratch map resets entirely.
            write_state.clear();
            has_open_group = false;
            needs_merge = false;

            // Re-evaluate so an active system's own writes are recorded
            // against the fresh state. An inactive system can't write
            // anything, so skip it — evaluating it would only risk
            // inserting an unnecessary second merge.
            if is_active {
                needs_merge = system_needs_merge(system, true, &mut write_state);
            }

            if needs_merge {
                debug_assert!(
                    false,
                    "plan re-evaluation after a forced merge requested another merge"
                );
                return Err(SchedulerError::InternalInconsistency(
                    "plan re-evaluation after a forced merge requested another merge".to_string(),
                ));
            }
        }

        if !has_open_group {
            groups.push(ExecutionGroup::default());
            has_open_group = true;
        }

        if is_active {
            groups.last_mut().expect("just pushed").count += 1;
        }
    }

    Ok(groups)
}

/// The live plan owned by a pipeline: its groups, plus the run query's
/// match-count at the time of the last build, used to skip unnecessary
/// rebuilds.
#[derive(Debug, Default)]
pub struct Plan {
    groups: Vec<ExecutionGroup>,
    match_count_at_build: Option<u64>,
}

impl Plan {
    /// An empty, never-built plan. `match_count_at_build` starts at `None`
    /// so the very first `rebuild_if_stale` always rebuilds, regardless of
    /// what the run query's match count happens to be.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            match_count_at_build: None,
        }
    }

    /// This plan's execution groups, in order.
    #[must_use]
    pub fn groups(&self) -> &[ExecutionGroup] {
        &self.groups
    }

    /// Sum of `count` across every group — the number of active systems
    /// this plan was built against.
    #[must_use]
    pub fn active_system_count(&self) -> u32 {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Rebuild from the registry if the run query's match count has
    /// changed since the last build; otherwise leave the plan untouched.
    /// Returns whether a rebuild happened.
    pub fn rebuild_if_stale(
        &mut self,
        queries: &mut PipelineQueries,
        registry: &SystemRegistry,
        phase_registry: &PhaseRegistry,
    ) -> SchedulerResult<bool> {
        // Force-refresh match_count by re-sorting the run query before
        // comparing: the act of asking for it is what catches membership
        // changes.
        queries.run_query(registry, phase_registry);
        let current = queries.match_count();

        if self.match_count_at_build == Some(current) {
            log::trace!("plan unchanged, match_count={current}");
            return Ok(false);
        }

        let build_query = queries.build_query(registry, phase_registry);
        log::debug!("rebuilding plan over {} systems", build_query.len());
        self.groups = build_plan(&build_query)?;
        self.match_count_at_build = Some(current);
        Ok(true)
    }

    /// Rebuild unconditionally, regardless of whether the match count has
    /// moved.
    pub fn force_rebuild(
        &mut self,
        queries: &mut PipelineQueries,
        registry: &SystemRegistry,
        phase_registry: &PhaseRegistry,
    ) -> SchedulerResult<()> {
        queries.run_query(registry, phase_registry);
        let build_query = queries.build_query(registry, phase_registry);
        self.groups = build_plan(&build_query)?;
        self.match_count_at_build = Some(queries.match_count());
        Ok(())
    }
}
