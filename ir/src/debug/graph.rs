use core::fmt;

use compact_str::CompactString;
use cranelift_entity::PrimaryMap;

use super::{BasicTypeNode, DiFlags, FileNode, MetadataNode, NodeRef, TypeEncoding};
use crate::FxHashMap;

/// The error produced when dereferencing a [NodeRef] that is no longer (or
/// never was) a live node of the graph
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidNodeError {
    /// The handle does not belong to this graph
    #[error("unknown metadata handle {0}")]
    Unknown(NodeRef),
    /// The handle referred to a forward declaration that has since been
    /// replaced by its complete definition
    #[error("stale metadata handle {0}: node was replaced during type resolution")]
    Replaced(NodeRef),
}

/// The graph of debug metadata nodes for a single compilation unit.
///
/// All nodes live in one arena and refer to each other by [NodeRef] index.
/// The graph is exclusively owned by the module being compiled; nodes are
/// never shared across graphs, and are never destroyed individually - the
/// whole graph lives exactly as long as its compilation unit.
///
/// File and basic type nodes are deduplicated by value so that equal
/// definitions compare equal by handle. Every other node kind has identity:
/// two composites with identical fields are still distinct nodes.
#[derive(Debug, Default)]
pub struct MetadataGraph {
    nodes: PrimaryMap<NodeRef, MetadataNode>,
    compile_unit: Option<NodeRef>,
    files: FxHashMap<(CompactString, CompactString), NodeRef>,
    basic_types: FxHashMap<(CompactString, u64, TypeEncoding), NodeRef>,
}

impl MetadataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new node in this graph.
    ///
    /// This is identity-based creation: no deduplication is performed. Use
    /// [intern_file](Self::intern_file) and
    /// [intern_basic_type](Self::intern_basic_type) for the value-deduplicated
    /// node kinds.
    pub fn insert(&mut self, node: MetadataNode) -> NodeRef {
        if self.compile_unit.is_none() && matches!(node, MetadataNode::CompileUnit(_)) {
            let id = self.nodes.push(node);
            self.compile_unit = Some(id);
            return id;
        }
        self.nodes.push(node)
    }

    /// Get the handle of the file described by `(directory, name)`, allocating
    /// the node if this is the first time the pair is seen
    pub fn intern_file(&mut self, directory: &str, name: &str) -> NodeRef {
        let key = (CompactString::new(directory), CompactString::new(name));
        if let Some(id) = self.files.get(&key) {
            return *id;
        }
        let id = self.nodes.push(MetadataNode::File(FileNode {
            directory: key.0.clone(),
            name: key.1.clone(),
        }));
        self.files.insert(key, id);
        id
    }

    /// Get the handle of the basic type `(name, bit_size, encoding)`,
    /// allocating the node if this is the first time the triple is seen
    pub fn intern_basic_type(
        &mut self,
        name: &str,
        bit_size: u64,
        encoding: TypeEncoding,
    ) -> NodeRef {
        let key = (CompactString::new(name), bit_size, encoding);
        if let Some(id) = self.basic_types.get(&key) {
            return *id;
        }
        let id = self.nodes.push(MetadataNode::BasicType(BasicTypeNode {
            name: key.0.clone(),
            bit_size,
            encoding,
        }));
        self.basic_types.insert(key, id);
        id
    }

    /// The compile unit node, once one has been created
    pub fn compile_unit(&self) -> Option<NodeRef> {
        self.compile_unit
    }

    /// Dereference `id`, panicking if the handle is stale or foreign.
    ///
    /// A stale handle is a bug in the caller; panicking here keeps the
    /// breakage at the point of misuse instead of letting a tombstone flow
    /// into consumers as if it were a live node.
    pub fn node(&self, id: NodeRef) -> &MetadataNode {
        match self.try_node(id) {
            Ok(node) => node,
            Err(err) => panic!("{err}"),
        }
    }

    /// Dereference `id`, reporting stale or foreign handles as errors
    pub fn try_node(&self, id: NodeRef) -> Result<&MetadataNode, InvalidNodeError> {
        match self.nodes.get(id) {
            None => Err(InvalidNodeError::Unknown(id)),
            Some(MetadataNode::Replaced { .. }) => Err(InvalidNodeError::Replaced(id)),
            Some(node) => Ok(node),
        }
    }

    /// Returns true if `id` refers to a live temporary (forward declaration)
    pub fn is_temporary(&self, id: NodeRef) -> bool {
        matches!(self.nodes.get(id), Some(node) if node.is_temporary())
    }

    /// Iterate over every live temporary node in the graph
    pub fn temporaries(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes
            .iter()
            .filter_map(|(id, node)| node.is_temporary().then_some(id))
    }

    /// Iterate over every live node in the graph, in creation order
    pub fn live_nodes(&self) -> impl Iterator<Item = (NodeRef, &MetadataNode)> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| !matches!(node, MetadataNode::Replaced { .. }))
    }

    /// The number of nodes ever allocated in this graph, including tombstones
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Rewrite every reference to `from` held by any live node of the graph so
    /// that it refers to `to`, then tombstone `from`.
    ///
    /// Returns the number of nodes that held at least one rewritten reference.
    /// After this call, `from` is invalid: dereferencing it fails. The caller
    /// is responsible for ensuring `from` is a live temporary and `to` a live
    /// node; calling this twice for the same `from` is a caller bug.
    pub fn replace_all_uses(&mut self, from: NodeRef, to: NodeRef) -> usize {
        debug_assert_ne!(from, to, "cannot replace a node with itself");
        debug_assert!(!matches!(self.nodes[from], MetadataNode::Replaced { .. }));
        let mut replaced = 0;
        for (id, node) in self.nodes.iter_mut() {
            if id == from {
                continue;
            }
            if node.replace_refs(from, to) {
                replaced += 1;
            }
        }
        self.nodes[from] = MetadataNode::Replaced { with: to };
        replaced
    }

    /// The parent scope of `id`, or `None` if `id` is the compile unit.
    ///
    /// Files have no parent of their own; they are treated as direct children
    /// of the compilation unit, which keeps every scope chain rooted at the
    /// compile unit node.
    pub fn scope_parent(&self, id: NodeRef) -> Option<NodeRef> {
        match self.node(id) {
            MetadataNode::CompileUnit(_) => None,
            MetadataNode::File(_) => self.compile_unit,
            MetadataNode::Subprogram(node) => Some(node.scope),
            MetadataNode::LexicalBlock(node) => Some(node.scope),
            MetadataNode::CompositeType(node) => Some(node.scope),
            node => panic!("{} nodes are not scopes", node.kind_name()),
        }
    }

    /// The file a scope belongs to, or `None` for the compile unit itself
    pub fn scope_file(&self, id: NodeRef) -> Option<NodeRef> {
        match self.node(id) {
            MetadataNode::CompileUnit(node) => Some(node.file),
            MetadataNode::File(_) => Some(id),
            MetadataNode::Subprogram(node) => Some(node.file),
            MetadataNode::LexicalBlock(node) => Some(node.file),
            MetadataNode::CompositeType(node) => Some(node.file),
            node => panic!("{} nodes are not scopes", node.kind_name()),
        }
    }

    /// The name of a scope; empty for unnamed scopes such as lexical blocks
    pub fn scope_name(&self, id: NodeRef) -> &str {
        self.node(id).name().unwrap_or("")
    }

    /// Walk the parent chain of `id` until the compile unit is reached.
    ///
    /// Scopes form a tree by construction (a scope's parent must exist before
    /// the scope does), so this walk is bounded by the node count; the bound
    /// is asserted rather than relied on for cycle detection.
    pub fn compile_unit_of(&self, id: NodeRef) -> NodeRef {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match self.scope_parent(current) {
                None => return current,
                Some(parent) => current = parent,
            }
        }
        unreachable!("scope parent chain does not terminate at a compile unit")
    }

    /// Render `id` for display, e.g. `di.subprogram(name = copy, ...)`
    pub fn display(&self, id: NodeRef) -> NodeDisplay<'_> {
        NodeDisplay { graph: self, id }
    }

    fn file_path(&self, id: NodeRef) -> (&str, &str) {
        match self.node(id) {
            MetadataNode::File(file) => (file.directory.as_str(), file.name.as_str()),
            node => panic!("expected file node, got {}", node.kind_name()),
        }
    }
}

/// Renders a metadata node in a compact, single-line form for logs and tests
pub struct NodeDisplay<'a> {
    graph: &'a MetadataGraph,
    id: NodeRef,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.graph;
        match graph.nodes.get(self.id) {
            None => write!(f, "di.unknown({})", self.id),
            Some(MetadataNode::Replaced { with }) => write!(f, "di.replaced(with = {with})"),
            Some(MetadataNode::File(node)) => {
                write!(f, "di.file({}/{})", node.directory, node.name)
            }
            Some(MetadataNode::CompileUnit(node)) => {
                let (dir, name) = graph.file_path(node.file);
                write!(
                    f,
                    "di.compile_unit(language = {:?}, file = {dir}/{name}, producer = {}",
                    node.language, node.producer
                )?;
                if node.optimized {
                    f.write_str(", optimized")?;
                }
                f.write_str(")")
            }
            Some(MetadataNode::Subprogram(node)) => {
                let (_, file) = graph.file_path(node.file);
                write!(f, "di.subprogram(name = {}, file = {file}, line = {}", node.name, node.line)?;
                if let Some(linkage) = node.linkage_name.as_deref() {
                    write!(f, ", linkage = {linkage}")?;
                }
                if node.is_definition {
                    f.write_str(", definition")?;
                }
                if node.is_local_to_unit {
                    f.write_str(", local")?;
                }
                write!(f, ", ir = {})", node.function)
            }
            Some(MetadataNode::LexicalBlock(node)) => {
                write!(f, "di.lexical_block(scope = {}, line = {}, column = {})", node.scope, node.line, node.column)
            }
            Some(MetadataNode::BasicType(node)) => {
                write!(
                    f,
                    "di.basic_type(name = {}, bits = {}, encoding = {:?})",
                    node.name, node.bit_size, node.encoding
                )
            }
            Some(MetadataNode::PointerType(node)) => {
                write!(f, "di.pointer_type(pointee = {}, bits = {})", node.pointee, node.bit_size)
            }
            Some(MetadataNode::QualifiedType(node)) => {
                write!(f, "di.qualified_type({:?} {})", node.qualifier, node.base)
            }
            Some(MetadataNode::ArrayType(node)) => {
                write!(
                    f,
                    "di.array_type(element = {}, len = {}, bits = {})",
                    node.element, node.len, node.bit_size
                )
            }
            Some(MetadataNode::SubroutineType(node)) => {
                f.write_str("di.subroutine_type(")?;
                match node.result {
                    Some(result) => write!(f, "result = {result}")?,
                    None => f.write_str("result = void")?,
                }
                for param in node.params.iter() {
                    write!(f, ", {param}")?;
                }
                f.write_str(")")
            }
            Some(MetadataNode::CompositeType(node)) => {
                write!(f, "di.composite_type(name = {}, line = {}", node.name, node.line)?;
                if node.flags.contains(DiFlags::FWD_DECL) {
                    f.write_str(", fwd_decl")?;
                } else {
                    write!(f, ", bits = {}, members = {}", node.bit_size, node.members.len())?;
                }
                f.write_str(")")
            }
            Some(MetadataNode::Member(node)) => {
                write!(
                    f,
                    "di.member(name = {}, ty = {}, bit_offset = {})",
                    node.name, node.ty, node.bit_offset
                )
            }
            Some(MetadataNode::GlobalVariable(node)) => {
                write!(
                    f,
                    "di.global_variable(name = {}, ty = {}, ir = {})",
                    node.name, node.ty, node.global
                )
            }
            Some(MetadataNode::LocalVariable(node)) => {
                write!(f, "di.local_variable(name = {}, ty = {}", node.name, node.ty)?;
                if let Some(arg_no) = node.arg_no {
                    write!(f, ", arg = {arg_no}")?;
                }
                f.write_str(")")
            }
        }
    }
}
