//! Column vocabulary: component identifiers and the per-column I/O
//! declarations a system's query carries.

use crate::ecs::entity::Entity;

/// Identifies a component type for write-state tracking during planning.
/// The scheduler never inspects component payloads — only this identifier.
pub type ComponentId = Entity;

/// Column I/O kind: whether a column is read, written, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoKind {
    /// Read-only access.
    In,
    /// Write-only access.
    Out,
    /// Read and write access.
    InOut,
}

/// Column source kind. Only `FromSelf` and `FromEmpty` affect planning;
/// other source kinds (e.g. a shared/parent-entity source in a richer query
/// engine) are transparent to the scheduler and treated as non-accessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The column reads/writes the component on the matched entity itself.
    FromSelf,
    /// The column has no entity source (e.g. a singleton or a deferred
    /// command write) — still affects write-state tracking.
    FromEmpty,
    /// Any other source kind; transparent to planning.
    Other,
}

/// Column operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// The component must be present (the common case).
    And,
    /// Part of an `Or` chain; planning treats `Or` columns as inert.
    Or,
    /// The component must be absent from the matched entity.
    Not,
}

/// One column of a system's query: what component it touches, how, and
/// from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// The component this column declares access to.
    pub component_id: ComponentId,
    /// Read/write/read-write.
    pub io_kind: IoKind,
    /// Where the column's data comes from.
    pub source_kind: SourceKind,
    /// `And`/`Or`/`Not`.
    pub operator: Operator,
}

impl Column {
    /// Construct a plain `FromSelf`/`And` column with the given I/O kind —
    /// the common case for a system's own components.
    #[must_use]
    pub const fn new(component_id: ComponentId, io_kind: IoKind) -> Self {
        Self {
            component_id,
            io_kind,
            source_kind: SourceKind::FromSelf,
            operator: Operator::And,
        }
    }

    /// Construct a column with an explicit source kind and operator.
    #[must_use]
    pub const fn with_kind(
        component_id: ComponentId,
        io_kind: IoKind,
        source_kind: SourceKind,
        operator: Operator,
    ) -> Self {
        Self {
            component_id,
            io_kind,
            source_kind,
            operator,
        }
    }
}
