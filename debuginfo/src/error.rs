use alloc::{string::String, vec::Vec};

use compact_str::CompactString;
use quillc_ir::{
    Function,
    debug::{InvalidNodeError, NodeRef},
};

/// Errors produced by [DebugInfoBuilder](crate::DebugInfoBuilder).
///
/// None of these are transient: every variant is a caller error, surfaced
/// synchronously, and nothing is retried automatically. The only failure that
/// is *recoverable* is [UnresolvedForwardDeclarations](Self::UnresolvedForwardDeclarations),
/// which leaves the builder open so the caller can resolve the named types and
/// try to finalize again.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuilderError {
    /// The compile unit is created exactly once per module
    #[error("a compile unit has already been created for this module")]
    CompileUnitAlreadySet,
    /// Every other operation requires the compile unit to exist first
    #[error("no compile unit: the compile unit must be created before any other debug metadata")]
    NoCompileUnit,
    /// The builder was finalized; the graph is frozen
    #[error("debug info has been finalized and can no longer be modified")]
    Finalized,
    /// Finalization found forward declarations that were never resolved
    #[error("cannot finalize debug metadata: unresolved forward declarations: {names}")]
    UnresolvedForwardDeclarations {
        names: String,
        refs: Vec<NodeRef>,
    },
    /// The forward declaration was already resolved once
    #[error("forward declaration {0} has already been resolved")]
    AlreadyResolved(NodeRef),
    /// The node passed as the resolution target of a replace-all-uses is the
    /// forward declaration itself
    #[error("cannot resolve forward declaration {0} to itself")]
    SelfResolution(NodeRef),
    /// Only forward declarations can be resolved
    #[error("{node} is not a forward declaration: {kind} nodes cannot be resolved")]
    NotAForwardDeclaration {
        node: NodeRef,
        kind: &'static str,
    },
    /// An IR function is described by at most one subprogram
    #[error("{function} is already described by subprogram {subprogram}")]
    FunctionAlreadyBound {
        function: Function,
        subprogram: NodeRef,
    },
    /// A subprogram definition needs the line of its opening brace
    #[error("subprogram '{name}' is a definition but has no scope line")]
    MissingScopeLine { name: CompactString },
    /// Parameter indices are 1-based
    #[error("argument index must be 1-based, got 0")]
    InvalidArgumentIndex,
    /// A node of the wrong kind was passed where a scope was expected
    #[error("invalid scope {node}: expected {expected}, got {kind}")]
    InvalidScope {
        node: NodeRef,
        expected: &'static str,
        kind: &'static str,
    },
    /// A node of the wrong kind was passed
    #[error("expected a {expected} node, but {node} is a {actual}")]
    UnexpectedNodeKind {
        node: NodeRef,
        expected: &'static str,
        actual: &'static str,
    },
    /// The forward-declaration flag is managed by the builder
    #[error("the forward-declaration flag cannot be passed explicitly")]
    ExplicitForwardDeclFlag,
    /// A struct-level coordinate disagrees with the target layout
    #[error(
        "layout mismatch for struct '{name}': {what} is {actual}, but the target layout computes {expected}"
    )]
    LayoutMismatch {
        name: CompactString,
        what: &'static str,
        actual: u64,
        expected: u64,
    },
    /// A member coordinate disagrees with the target layout
    #[error(
        "layout mismatch for member '{member}' of struct '{name}': {what} is {actual}, but the target layout computes {expected}"
    )]
    MemberLayoutMismatch {
        name: CompactString,
        member: CompactString,
        what: &'static str,
        actual: u64,
        expected: u64,
    },
    /// A handle was used after its node was replaced, or belongs to another graph
    #[error(transparent)]
    InvalidNode(#[from] InvalidNodeError),
}
