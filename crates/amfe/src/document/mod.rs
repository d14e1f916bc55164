//! The modular AMFE document model.
//!
//! A document is a header plus a tree of
//! Process → Subprocess → Failure → elements. Subtrees are shared through
//! [`std::sync::Arc`]; edits copy only the path from the root to the touched
//! node, so snapshots are cheap and stay valid after later edits.

pub mod ids;
pub mod model;
pub mod tree;

use std::fmt;

pub use ids::IdGenerator;
pub use model::{
    Element, Evaluation, Failure, Header, MatrixDocument, Process, ScoreField, Subprocess,
    DEFAULT_INSTITUTION, DEFAULT_PROCESS_COLOR,
};
pub use tree::{FailurePath, ProcessTree};

/// The kinds of list attached to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Potential effects.
    Effect,
    /// Potential causes.
    Cause,
    /// Existing barriers.
    Barrier,
    /// Recommended actions.
    RecommendedAction,
    /// Actions already taken.
    TakenAction,
}

impl ElementKind {
    /// Every element kind, in display order.
    pub const ALL: [Self; 5] = [
        Self::Effect,
        Self::Cause,
        Self::Barrier,
        Self::RecommendedAction,
        Self::TakenAction,
    ];

    /// Prefix of generated element ids.
    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Effect => "efecto",
            Self::Cause => "causa",
            Self::Barrier => "barrera",
            Self::RecommendedAction => "accionRec",
            Self::TakenAction => "accionTom",
        }
    }

    /// Wire name of the list on a failure.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Effect => "efectosPotenciales",
            Self::Cause => "causasPotenciales",
            Self::Barrier => "barrerasExistentes",
            Self::RecommendedAction => "accionesRecomendadas",
            Self::TakenAction => "accionesTomadas",
        }
    }

    /// Whether every failure needs at least one element of this kind.
    ///
    /// Action lists start empty.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, Self::Effect | Self::Cause | Self::Barrier)
    }

    /// Parse a wire name back into a kind.
    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }
}

impl From<ElementKind> for NodeKind {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Effect => Self::Effect,
            ElementKind::Cause => Self::Cause,
            ElementKind::Barrier => Self::Barrier,
            ElementKind::RecommendedAction => Self::RecommendedAction,
            ElementKind::TakenAction => Self::TakenAction,
        }
    }
}

/// Every level of the document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A top-level process.
    Process,
    /// A subprocess of a process.
    Subprocess,
    /// A potential failure of a subprocess.
    Failure,
    /// A potential effect.
    Effect,
    /// A potential cause.
    Cause,
    /// An existing barrier.
    Barrier,
    /// A recommended action.
    RecommendedAction,
    /// A taken action.
    TakenAction,
}

impl NodeKind {
    /// Warning shown when removing the last node of this kind is refused.
    #[must_use]
    pub fn minimum_warning(self) -> &'static str {
        match self {
            Self::Process => "there must be at least one process",
            Self::Subprocess => "there must be at least one subprocess per process",
            Self::Failure => "there must be at least one failure per subprocess",
            Self::Effect => "there must be at least one effect per failure",
            Self::Cause => "there must be at least one cause per failure",
            Self::Barrier => "there must be at least one barrier per failure",
            Self::RecommendedAction => "there must be at least one recommended action",
            Self::TakenAction => "there must be at least one taken action",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Process => "process",
            Self::Subprocess => "subprocess",
            Self::Failure => "failure",
            Self::Effect => "effect",
            Self::Cause => "cause",
            Self::Barrier => "barrier",
            Self::RecommendedAction => "recommended action",
            Self::TakenAction => "taken action",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_kind_wire_names_round_trip() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::from_wire_name(kind.wire_name()), Some(kind));
        }
        assert_eq!(ElementKind::from_wire_name("procesos"), None);
    }

    #[test]
    fn test_node_kind_display() {
        assert_eq!(NodeKind::RecommendedAction.to_string(), "recommended action");
        assert_eq!(NodeKind::from(ElementKind::Barrier), NodeKind::Barrier);
    }

    #[test]
    fn test_minimum_warning_mentions_parent() {
        assert!(NodeKind::Failure.minimum_warning().contains("per subprocess"));
    }
}
