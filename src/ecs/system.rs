//! System descriptor.
//!
//! A system is a query plus a body, tagged with a phase. The scheduler only
//! ever touches the descriptor through the accessors below — the query
//! engine that produced `query` and the function behind `body` are external
//! collaborators the scheduler treats as black boxes.

use bitflags::bitflags;

use crate::ecs::component::Column;
use crate::ecs::entity::Entity;
use crate::ecs::phase::PhaseId;

bitflags! {
    /// Tags that exclude a system from one or both pipeline queries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SystemFlags: u8 {
        /// Set by the Activation Sweep (or external add/remove of
        /// components) when the system's query currently matches zero
        /// storage tables. Excludes the system from the run query only.
        const INACTIVE = 0b0000_0001;
        /// Set internally (e.g. during module teardown). Excludes the
        /// system from both pipeline queries.
        const DISABLED_INTERN = 0b0000_0010;
        /// Set by the embedder. Excludes the system from both pipeline
        /// queries, same as `DISABLED_INTERN`.
        const DISABLED = 0b0000_0100;
    }
}

impl SystemFlags {
    const HIDDEN: Self = Self::DISABLED_INTERN.union(Self::DISABLED);

    /// Whether this system is invisible to both the run and build queries.
    #[must_use]
    pub const fn is_hidden(self) -> bool {
        self.intersects(Self::HIDDEN)
    }
}

/// A query handle supplied by the (external, black-box) query engine. The
/// scheduler uses it for exactly two things: reading the columns it
/// declared for planning, and asking whether it currently matches any
/// storage table (for the Activation Sweep).
pub trait SystemQuery: Send + Sync {
    /// The column I/O declarations this query was built with.
    fn columns(&self) -> &[Column];

    /// Whether the query currently matches at least one storage table.
    fn matches_any_table(&self) -> bool;
}

/// The system's executable body, supplied by the embedder. Opaque to the
/// driver: it is invoked and otherwise never inspected.
pub trait SystemBody: Send + Sync {
    /// Run one tick of this system.
    fn execute(&mut self, delta_time: f32);
}

/// Per-system record: query handle, I/O declarations (via the query),
/// active bit, phase tag.
pub struct SystemDescriptor {
    entity_id: Entity,
    phase: PhaseId,
    query: Box<dyn SystemQuery>,
    body: Box<dyn SystemBody>,
    flags: SystemFlags,
}

impl SystemDescriptor {
    /// Construct a descriptor. Newly created systems start active; the
    /// first Activation Sweep (or plan build) corrects that if the query
    /// does not yet match anything.
    pub fn new(entity_id: Entity, phase: PhaseId, query: Box<dyn SystemQuery>, body: Box<dyn SystemBody>) -> Self {
        Self {
            entity_id,
            phase,
            query,
            body,
            flags: SystemFlags::empty(),
        }
    }

    /// The column I/O declarations of this system's query.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.query.columns()
    }

    /// Whether this system is currently active (its query matches at least
    /// one table and it has not been marked `Inactive`).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.flags.contains(SystemFlags::INACTIVE)
    }

    /// Whether this system is disabled (invisible to both pipeline
    /// queries).
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.flags.is_hidden()
    }

    /// The phase this system is tagged with.
    #[must_use]
    pub const fn phase(&self) -> PhaseId {
        self.phase
    }

    /// This system's stable identity.
    #[must_use]
    pub const fn id(&self) -> Entity {
        self.entity_id
    }

    /// Whether the system's query currently matches at least one storage
    /// table — consulted only by the Activation Sweep.
    #[must_use]
    pub fn matches_any_table(&self) -> bool {
        self.query.matches_any_table()
    }

    /// Run this system's body for one tick. Called only by the frame
    /// driver, at the position the plan dictates.
    pub fn execute(&mut self, delta_time: f32) {
        self.body.execute(delta_time);
    }

    pub(crate) fn set_inactive(&mut self, inactive: bool) {
        self.flags.set(SystemFlags::INACTIVE, inactive);
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        self.flags.set(SystemFlags::DISABLED, disabled);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{Column, SystemBody, SystemQuery};

    /// A query stub whose column list and match state are set up front —
    /// enough to drive the planner and activation sweep in tests without a
    /// real query engine.
    pub struct StubQuery {
        pub columns: Vec<Column>,
        pub matches: bool,
    }

    impl SystemQuery for StubQuery {
        fn columns(&self) -> &[Column] {
            &self.columns
        }

        fn matches_any_table(&self) -> bool {
            self.matches
        }
    }

    /// A system body that just counts how many times it ran.
    #[derive(Default)]
    pub struct CountingBody {
        pub runs: u32,
    }

    impl SystemBody for CountingBody {
        fn execute(&mut self, _delta_time: f32) {
            self.runs += 1;
        }
    }
}
