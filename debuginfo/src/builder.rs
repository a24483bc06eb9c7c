use alloc::{string::String, vec::Vec};

use log::{debug, trace};
use quillc_ir::{
    Block, Function, FunctionData, FxHashMap, GlobalVar, Inst, InstKind, Value,
    debug::{
        ArrayTypeNode, CompileUnitNode, CompositeTypeNode, DiExprOp, DiExpression, DiFlags,
        GlobalVariableNode, LexicalBlockNode, LocalVariableNode, Location, MemberNode,
        MetadataGraph, MetadataNode, NodeRef, PointerTypeNode, QualifiedTypeNode, Qualifier,
        SourceLanguage, SubprogramNode, SubroutineTypeNode, TypeEncoding,
    },
};
use quillc_ir_type::{StructType, TargetLayout, Type};

use crate::BuilderError;

/// The lifecycle of a [DebugInfoBuilder]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
enum State {
    /// No compile unit yet; only [DebugInfoBuilder::create_compile_unit] is legal
    #[default]
    Uninitialized,
    /// Metadata may be created, resolved and bound
    Building,
    /// The graph is frozen; only reads are legal
    Finished,
}

/// Builds the debug metadata graph for one compilation unit.
///
/// The builder owns the graph while it is under construction and is the only
/// way to mutate it. It tracks every forward declaration it has issued, and
/// refuses to finalize until all of them have been resolved to complete
/// definitions. Once [finish](Self::finish) succeeds the builder is frozen:
/// all further create/insert/resolve calls fail, and the resolved graph can be
/// moved into the module with [into_graph](Self::into_graph).
///
/// There is exactly one builder per compilation unit, threaded explicitly by
/// the front end; it is not a global, and it is not thread-safe.
#[derive(Debug, Default)]
pub struct DebugInfoBuilder {
    graph: MetadataGraph,
    state: State,
    /// Forward declarations issued but not yet resolved, in creation order
    unresolved: Vec<NodeRef>,
    /// The 1:1 binding between IR functions and their subprograms
    subprograms: FxHashMap<Function, NodeRef>,
}

impl DebugInfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compile unit node, once created
    pub fn compile_unit(&self) -> Option<NodeRef> {
        self.graph.compile_unit()
    }

    /// Read access to the graph under construction
    pub fn graph(&self) -> &MetadataGraph {
        &self.graph
    }

    /// Returns true once [finish](Self::finish) has succeeded
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// The forward declarations that have not been resolved yet
    pub fn unresolved(&self) -> &[NodeRef] {
        self.unresolved.as_slice()
    }

    /// Create the compile unit for this builder's graph.
    ///
    /// This must be the first operation performed; creating a second compile
    /// unit on the same graph is an error.
    pub fn create_compile_unit(
        &mut self,
        language: SourceLanguage,
        file_name: &str,
        directory: &str,
        producer: &str,
        optimized: bool,
        flags: &str,
    ) -> Result<NodeRef, BuilderError> {
        match self.state {
            State::Uninitialized => {}
            State::Building => return Err(BuilderError::CompileUnitAlreadySet),
            State::Finished => return Err(BuilderError::Finalized),
        }
        let file = self.graph.intern_file(directory, file_name);
        let unit = self.graph.insert(MetadataNode::CompileUnit(CompileUnitNode {
            language,
            file,
            producer: producer.into(),
            optimized,
            flags: flags.into(),
        }));
        self.state = State::Building;
        debug!("created compile unit {unit} for {directory}/{file_name}");
        Ok(unit)
    }

    /// Get or create the file node for `(directory, name)`
    pub fn create_file(&mut self, name: &str, directory: &str) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        Ok(self.graph.intern_file(directory, name))
    }

    /// Get or create a basic type node
    pub fn create_basic_type(
        &mut self,
        name: &str,
        bit_size: u64,
        encoding: TypeEncoding,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        let ty = self.graph.intern_basic_type(name, bit_size, encoding);
        trace!("basic type {ty}: {}", self.graph.display(ty));
        Ok(ty)
    }

    /// Create a pointer type node referring to `pointee`
    pub fn create_pointer_type(
        &mut self,
        pointee: NodeRef,
        bit_size: u64,
        bit_align: u32,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_type(pointee)?;
        Ok(self.graph.insert(MetadataNode::PointerType(PointerTypeNode {
            pointee,
            bit_size,
            bit_align,
        })))
    }

    /// Create a const/volatile qualified wrapper around `base`
    pub fn create_qualified_type(
        &mut self,
        qualifier: Qualifier,
        base: NodeRef,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_type(base)?;
        Ok(self
            .graph
            .insert(MetadataNode::QualifiedType(QualifiedTypeNode { qualifier, base })))
    }

    /// Create a fixed-length array type node
    pub fn create_array_type(
        &mut self,
        bit_size: u64,
        bit_align: u32,
        element: NodeRef,
        len: u64,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_type(element)?;
        Ok(self.graph.insert(MetadataNode::ArrayType(ArrayTypeNode {
            element,
            len,
            bit_size,
            bit_align,
        })))
    }

    /// Create a subroutine (function signature) type node.
    ///
    /// `result` is `None` for subroutines that return nothing.
    pub fn create_subroutine_type(
        &mut self,
        file: NodeRef,
        result: Option<NodeRef>,
        params: &[NodeRef],
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_file(file)?;
        if let Some(result) = result {
            self.expect_type(result)?;
        }
        for param in params {
            self.expect_type(*param)?;
        }
        Ok(self.graph.insert(MetadataNode::SubroutineType(SubroutineTypeNode {
            file,
            result,
            params: params.iter().copied().collect(),
        })))
    }

    /// Create a member descriptor for a composite type.
    ///
    /// `scope` is normally the composite the member belongs to; referencing a
    /// forward-declared composite is allowed, and is the usual way recursive
    /// types are built.
    #[allow(clippy::too_many_arguments)]
    pub fn create_member_type(
        &mut self,
        scope: NodeRef,
        name: &str,
        file: NodeRef,
        line: u32,
        bit_size: u64,
        bit_align: u32,
        bit_offset: u64,
        flags: DiFlags,
        ty: NodeRef,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_scope(scope)?;
        self.expect_file(file)?;
        self.expect_type(ty)?;
        Ok(self.graph.insert(MetadataNode::Member(MemberNode {
            scope,
            name: name.into(),
            file,
            line,
            bit_size,
            bit_align,
            bit_offset,
            flags,
            ty,
        })))
    }

    /// Create the complete definition of a struct type.
    ///
    /// The caller supplies the coordinates it believes describe the struct
    /// (`bit_size`, `bit_align`, and one member node per field); this method
    /// asserts all of them against what the target layout computes for
    /// `ir_ty`, and refuses to create a definition that disagrees. Layout is
    /// never computed here, only checked.
    #[allow(clippy::too_many_arguments)]
    pub fn create_struct_type(
        &mut self,
        scope: NodeRef,
        name: &str,
        file: NodeRef,
        line: u32,
        layout: &TargetLayout,
        ir_ty: &StructType,
        bit_size: u64,
        bit_align: u32,
        flags: DiFlags,
        members: &[NodeRef],
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_scope(scope)?;
        self.expect_file(file)?;
        if flags.contains(DiFlags::FWD_DECL) {
            return Err(BuilderError::ExplicitForwardDeclFlag);
        }
        if members.len() != ir_ty.len() {
            return Err(BuilderError::LayoutMismatch {
                name: name.into(),
                what: "member count",
                actual: members.len() as u64,
                expected: ir_ty.len() as u64,
            });
        }
        let struct_ty = Type::from(ir_ty.clone());
        let expected_size = layout.bit_size_of(&struct_ty) as u64;
        if bit_size != expected_size {
            return Err(BuilderError::LayoutMismatch {
                name: name.into(),
                what: "bit size",
                actual: bit_size,
                expected: expected_size,
            });
        }
        let expected_align = layout.abi_bit_alignment_of(&struct_ty) as u64;
        if bit_align as u64 != expected_align {
            return Err(BuilderError::LayoutMismatch {
                name: name.into(),
                what: "bit alignment",
                actual: bit_align as u64,
                expected: expected_align,
            });
        }
        for (i, member) in members.iter().enumerate() {
            let field_ty = &ir_ty.get(i).ty;
            let member_node = match self.graph.try_node(*member)? {
                MetadataNode::Member(node) => node,
                node => {
                    return Err(BuilderError::UnexpectedNodeKind {
                        node: *member,
                        expected: "member",
                        actual: node.kind_name(),
                    });
                }
            };
            let checks = [
                ("bit offset", member_node.bit_offset, layout.bit_offset_of_element(ir_ty, i) as u64),
                ("bit size", member_node.bit_size, layout.bit_size_of(field_ty) as u64),
                ("bit alignment", member_node.bit_align as u64, layout.abi_bit_alignment_of(field_ty) as u64),
            ];
            for (what, actual, expected) in checks {
                if actual != expected {
                    return Err(BuilderError::MemberLayoutMismatch {
                        name: name.into(),
                        member: member_node.name.clone(),
                        what,
                        actual,
                        expected,
                    });
                }
            }
        }
        let ty = self.graph.insert(MetadataNode::CompositeType(CompositeTypeNode {
            scope,
            name: name.into(),
            file,
            line,
            bit_size,
            bit_align,
            flags,
            members: members.iter().copied().collect(),
        }));
        trace!("struct type {ty}: {}", self.graph.display(ty));
        Ok(ty)
    }

    /// Create a forward-declared (temporary) struct type.
    ///
    /// The returned node has no members and may be referenced immediately by
    /// other nodes; it must be resolved to a complete definition with
    /// [replace_all_uses](Self::replace_all_uses) before
    /// [finish](Self::finish) can succeed.
    pub fn create_replaceable_composite_type(
        &mut self,
        scope: NodeRef,
        name: &str,
        file: NodeRef,
        line: u32,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_scope(scope)?;
        self.expect_file(file)?;
        let ty = self.graph.insert(MetadataNode::CompositeType(CompositeTypeNode {
            scope,
            name: name.into(),
            file,
            line,
            bit_size: 0,
            bit_align: 0,
            flags: DiFlags::FWD_DECL,
            members: Default::default(),
        }));
        self.unresolved.push(ty);
        debug!("forward declaration {ty}: struct '{name}'");
        Ok(ty)
    }

    /// Resolve the forward declaration `opaque` to the complete node
    /// `complete`, rewriting every reference to `opaque` held anywhere in the
    /// graph.
    ///
    /// `opaque` is invalidated by this call: any handle to it still held by
    /// the caller must be discarded, and dereferencing one afterwards fails.
    /// Resolving the same declaration twice is an error.
    pub fn replace_all_uses(
        &mut self,
        opaque: NodeRef,
        complete: NodeRef,
    ) -> Result<(), BuilderError> {
        self.ensure_building()?;
        match self.graph.try_node(opaque) {
            Err(err @ quillc_ir::debug::InvalidNodeError::Unknown(_)) => {
                return Err(BuilderError::InvalidNode(err));
            }
            Err(quillc_ir::debug::InvalidNodeError::Replaced(_)) => {
                return Err(BuilderError::AlreadyResolved(opaque));
            }
            Ok(node) if !node.is_temporary() => {
                return Err(BuilderError::NotAForwardDeclaration {
                    node: opaque,
                    kind: node.kind_name(),
                });
            }
            Ok(_) => {}
        }
        if opaque == complete {
            return Err(BuilderError::SelfResolution(opaque));
        }
        self.graph.try_node(complete)?;
        let rewritten = self.graph.replace_all_uses(opaque, complete);
        self.unresolved.retain(|id| *id != opaque);
        debug!("resolved {opaque} to {complete}, rewriting {rewritten} nodes");
        Ok(())
    }

    /// Create the subprogram descriptor for an IR function.
    ///
    /// Binds 1:1 to `function`; a second subprogram for the same IR function
    /// is an error. Definitions must carry a `scope_line` (the line of the
    /// opening brace of the body, which is not necessarily the declaration
    /// line); declaration-only subprograms carry none.
    #[allow(clippy::too_many_arguments)]
    pub fn create_function(
        &mut self,
        function: Function,
        scope: NodeRef,
        name: &str,
        linkage_name: Option<&str>,
        file: NodeRef,
        line: u32,
        ty: NodeRef,
        is_local_to_unit: bool,
        is_definition: bool,
        scope_line: Option<u32>,
        flags: DiFlags,
        optimized: bool,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_scope(scope)?;
        self.expect_file(file)?;
        match self.graph.try_node(ty)? {
            MetadataNode::SubroutineType(_) => {}
            node => {
                return Err(BuilderError::UnexpectedNodeKind {
                    node: ty,
                    expected: "subroutine type",
                    actual: node.kind_name(),
                });
            }
        }
        if let Some(subprogram) = self.subprograms.get(&function) {
            return Err(BuilderError::FunctionAlreadyBound {
                function,
                subprogram: *subprogram,
            });
        }
        if is_definition && scope_line.is_none() {
            return Err(BuilderError::MissingScopeLine { name: name.into() });
        }
        let subprogram = self.graph.insert(MetadataNode::Subprogram(SubprogramNode {
            scope,
            name: name.into(),
            linkage_name: linkage_name.map(Into::into),
            file,
            line,
            ty,
            is_local_to_unit,
            is_definition,
            scope_line: if is_definition { scope_line } else { None },
            flags,
            optimized,
            function,
        }));
        self.subprograms.insert(function, subprogram);
        debug!("subprogram {subprogram}: {}", self.graph.display(subprogram));
        Ok(subprogram)
    }

    /// Create a lexical block scope nested in `scope`, which must be a
    /// subprogram or another lexical block
    pub fn create_lexical_block(
        &mut self,
        scope: NodeRef,
        file: NodeRef,
        line: u32,
        column: u32,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_file(file)?;
        match self.graph.try_node(scope)? {
            MetadataNode::Subprogram(_) | MetadataNode::LexicalBlock(_) => {}
            node => {
                return Err(BuilderError::InvalidScope {
                    node: scope,
                    expected: "a subprogram or lexical block",
                    kind: node.kind_name(),
                });
            }
        }
        Ok(self.graph.insert(MetadataNode::LexicalBlock(LexicalBlockNode {
            scope,
            file,
            line,
            column,
        })))
    }

    /// Create the debug descriptor for an IR global variable
    #[allow(clippy::too_many_arguments)]
    pub fn create_global_variable(
        &mut self,
        global: GlobalVar,
        scope: NodeRef,
        name: &str,
        linkage_name: Option<&str>,
        file: NodeRef,
        line: u32,
        ty: NodeRef,
        is_local_to_unit: bool,
        external_storage: bool,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_scope(scope)?;
        self.expect_file(file)?;
        self.expect_type(ty)?;
        Ok(self.graph.insert(MetadataNode::GlobalVariable(GlobalVariableNode {
            scope,
            name: name.into(),
            linkage_name: linkage_name.map(Into::into),
            file,
            line,
            ty,
            is_local_to_unit,
            external_storage,
            global,
        })))
    }

    /// Create the descriptor of a block-local variable
    #[allow(clippy::too_many_arguments)]
    pub fn create_local_variable(
        &mut self,
        scope: NodeRef,
        name: &str,
        file: NodeRef,
        line: u32,
        ty: NodeRef,
        always_preserve: bool,
        flags: DiFlags,
    ) -> Result<NodeRef, BuilderError> {
        self.create_variable(scope, name, file, line, ty, always_preserve, flags, None)
    }

    /// Create the descriptor of a formal parameter.
    ///
    /// `arg_no` is 1-based: the first parameter is argument 1.
    #[allow(clippy::too_many_arguments)]
    pub fn create_argument(
        &mut self,
        scope: NodeRef,
        name: &str,
        file: NodeRef,
        line: u32,
        ty: NodeRef,
        always_preserve: bool,
        flags: DiFlags,
        arg_no: u32,
    ) -> Result<NodeRef, BuilderError> {
        if arg_no == 0 {
            return Err(BuilderError::InvalidArgumentIndex);
        }
        self.create_variable(scope, name, file, line, ty, always_preserve, flags, Some(arg_no))
    }

    #[allow(clippy::too_many_arguments)]
    fn create_variable(
        &mut self,
        scope: NodeRef,
        name: &str,
        file: NodeRef,
        line: u32,
        ty: NodeRef,
        always_preserve: bool,
        flags: DiFlags,
        arg_no: Option<u32>,
    ) -> Result<NodeRef, BuilderError> {
        self.ensure_building()?;
        self.expect_scope(scope)?;
        self.expect_file(file)?;
        self.expect_type(ty)?;
        let variable = self.graph.insert(MetadataNode::LocalVariable(LocalVariableNode {
            scope,
            name: name.into(),
            file,
            line,
            ty,
            arg_no,
            always_preserve,
            flags,
        }));
        trace!("variable {variable}: {}", self.graph.display(variable));
        Ok(variable)
    }

    /// Build a DWARF expression value
    pub fn create_expression<I: IntoIterator<Item = DiExprOp>>(&self, ops: I) -> DiExpression {
        DiExpression::with_ops(ops)
    }

    /// Emit a pseudo-instruction recording that `storage` is the address at
    /// which `variable` lives, at source position `loc`.
    ///
    /// Appends to the end of `block` and returns the pseudo-instruction's
    /// handle.
    pub fn insert_declare(
        &mut self,
        func: &mut FunctionData,
        block: Block,
        storage: Value,
        variable: NodeRef,
        expression: Option<DiExpression>,
        loc: Location,
    ) -> Result<Inst, BuilderError> {
        self.ensure_building()?;
        self.expect_variable(variable)?;
        let inst = func.append_inst(
            block,
            InstKind::DbgDeclare {
                storage,
                variable,
                expression,
            },
        );
        func.set_location(inst, loc);
        trace!("declare {} at {inst}", self.graph.display(variable));
        Ok(inst)
    }

    /// Emit a pseudo-instruction recording that `value` is the current value
    /// of `variable`, recoverable via `expression`, at source position `loc`.
    ///
    /// This is the binding to use when the variable is not backed by
    /// addressable storage, e.g. after it has been promoted to a register.
    pub fn insert_value(
        &mut self,
        func: &mut FunctionData,
        block: Block,
        value: Value,
        variable: NodeRef,
        expression: DiExpression,
        loc: Location,
    ) -> Result<Inst, BuilderError> {
        self.ensure_building()?;
        self.expect_variable(variable)?;
        let inst = func.append_inst(
            block,
            InstKind::DbgValue {
                value,
                variable,
                expression,
            },
        );
        func.set_location(inst, loc);
        trace!("value binding {} at {inst}", self.graph.display(variable));
        Ok(inst)
    }

    /// Attach `loc` to an already-emitted instruction, overwriting any
    /// previous location
    pub fn set_location(&self, func: &mut FunctionData, inst: Inst, loc: Location) {
        func.set_location(inst, loc);
    }

    /// Finalize the graph.
    ///
    /// Fails if any forward declaration remains unresolved, naming every
    /// offender; on that failure the builder stays open, so the caller can
    /// resolve the stragglers and call `finish` again. On success the builder
    /// is frozen and all further mutation fails.
    pub fn finish(&mut self) -> Result<(), BuilderError> {
        match self.state {
            State::Uninitialized => return Err(BuilderError::NoCompileUnit),
            State::Finished => return Err(BuilderError::Finalized),
            State::Building => {}
        }
        let temporaries: Vec<NodeRef> = self.graph.temporaries().collect();
        debug_assert_eq!(
            temporaries,
            self.unresolved,
            "the builder's working set disagrees with the graph's live temporaries"
        );
        if !temporaries.is_empty() {
            let mut names = String::new();
            for (i, id) in temporaries.iter().enumerate() {
                if i > 0 {
                    names.push_str(", ");
                }
                names.push_str(self.graph.node(*id).name().unwrap_or("<anonymous>"));
            }
            return Err(BuilderError::UnresolvedForwardDeclarations {
                names,
                refs: temporaries,
            });
        }
        self.state = State::Finished;
        debug!("finalized debug metadata graph with {} nodes", self.graph.num_nodes());
        Ok(())
    }

    /// Consume the builder, yielding the resolved graph for
    /// [Module::attach_debug_info](quillc_ir::Module::attach_debug_info).
    ///
    /// Panics unless [finish](Self::finish) has succeeded: a partially-built
    /// graph must never reach a consumer that expects a resolved one.
    pub fn into_graph(self) -> MetadataGraph {
        assert!(
            self.state == State::Finished,
            "cannot take the metadata graph before finish() has succeeded"
        );
        self.graph
    }

    fn ensure_building(&self) -> Result<(), BuilderError> {
        match self.state {
            State::Uninitialized => Err(BuilderError::NoCompileUnit),
            State::Building => Ok(()),
            State::Finished => Err(BuilderError::Finalized),
        }
    }

    fn expect_scope(&self, scope: NodeRef) -> Result<(), BuilderError> {
        let node = self.graph.try_node(scope)?;
        if node.is_scope() {
            Ok(())
        } else {
            Err(BuilderError::InvalidScope {
                node: scope,
                expected: "a scope node",
                kind: node.kind_name(),
            })
        }
    }

    fn expect_file(&self, file: NodeRef) -> Result<(), BuilderError> {
        match self.graph.try_node(file)? {
            MetadataNode::File(_) => Ok(()),
            node => Err(BuilderError::UnexpectedNodeKind {
                node: file,
                expected: "file",
                actual: node.kind_name(),
            }),
        }
    }

    fn expect_type(&self, ty: NodeRef) -> Result<(), BuilderError> {
        let node = self.graph.try_node(ty)?;
        if node.is_type() {
            Ok(())
        } else {
            Err(BuilderError::UnexpectedNodeKind {
                node: ty,
                expected: "type",
                actual: node.kind_name(),
            })
        }
    }

    fn expect_variable(&self, variable: NodeRef) -> Result<(), BuilderError> {
        match self.graph.try_node(variable)? {
            MetadataNode::LocalVariable(_) => Ok(()),
            node => Err(BuilderError::UnexpectedNodeKind {
                node: variable,
                expected: "local variable",
                actual: node.kind_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quillc_ir::debug::InvalidNodeError;
    use quillc_ir_type::FunctionType;

    use super::*;

    fn started() -> (DebugInfoBuilder, NodeRef, NodeRef) {
        let mut di = DebugInfoBuilder::new();
        let cu = di
            .create_compile_unit(SourceLanguage::C99, "test.c", "/src", "quillc", false, "")
            .unwrap();
        let file = di.create_file("test.c", "/src").unwrap();
        (di, cu, file)
    }

    fn empty_struct(di: &mut DebugInfoBuilder, cu: NodeRef, file: NodeRef) -> NodeRef {
        let layout = TargetLayout::new();
        let ir_ty = StructType::new([]);
        di.create_struct_type(cu, "empty", file, 1, &layout, &ir_ty, 0, 8, DiFlags::empty(), &[])
            .unwrap()
    }

    #[test]
    fn the_compile_unit_must_come_first() {
        let mut di = DebugInfoBuilder::new();
        assert_eq!(
            di.create_basic_type("int", 32, TypeEncoding::Signed),
            Err(BuilderError::NoCompileUnit)
        );
        assert_eq!(di.finish(), Err(BuilderError::NoCompileUnit));
    }

    #[test]
    fn the_compile_unit_is_created_exactly_once() {
        let (mut di, cu, _) = started();
        assert_eq!(di.compile_unit(), Some(cu));
        assert_eq!(
            di.create_compile_unit(SourceLanguage::C99, "other.c", "/src", "quillc", false, ""),
            Err(BuilderError::CompileUnitAlreadySet)
        );
    }

    #[test]
    fn a_finished_builder_rejects_everything() {
        let (mut di, cu, file) = started();
        di.finish().unwrap();
        assert!(di.is_finished());
        assert_eq!(
            di.create_basic_type("int", 32, TypeEncoding::Signed),
            Err(BuilderError::Finalized)
        );
        assert_eq!(
            di.create_replaceable_composite_type(cu, "foo", file, 1),
            Err(BuilderError::Finalized)
        );
        assert_eq!(di.finish(), Err(BuilderError::Finalized));
    }

    #[test]
    fn finish_names_unresolved_declarations_and_can_be_retried() {
        let (mut di, cu, file) = started();
        let bar = di.create_replaceable_composite_type(cu, "bar", file, 7).unwrap();
        match di.finish() {
            Err(BuilderError::UnresolvedForwardDeclarations { names, refs }) => {
                assert_eq!(names, "bar");
                assert_eq!(refs, alloc::vec![bar]);
            }
            other => panic!("expected unresolved-forward-declaration error, got {other:?}"),
        }
        // The graph is not frozen on this failure
        assert!(!di.is_finished());
        let complete = empty_struct(&mut di, cu, file);
        di.replace_all_uses(bar, complete).unwrap();
        di.finish().unwrap();
    }

    #[test]
    fn resolving_twice_is_an_error() {
        let (mut di, cu, file) = started();
        let fwd = di.create_replaceable_composite_type(cu, "foo", file, 1).unwrap();
        let complete = empty_struct(&mut di, cu, file);
        di.replace_all_uses(fwd, complete).unwrap();
        assert_eq!(
            di.replace_all_uses(fwd, complete),
            Err(BuilderError::AlreadyResolved(fwd))
        );
    }

    #[test]
    fn only_forward_declarations_can_be_resolved() {
        let (mut di, cu, file) = started();
        let int = di.create_basic_type("int", 32, TypeEncoding::Signed).unwrap();
        let complete = empty_struct(&mut di, cu, file);
        assert_eq!(
            di.replace_all_uses(int, complete),
            Err(BuilderError::NotAForwardDeclaration {
                node: int,
                kind: "basic type",
            })
        );
        let fwd = di.create_replaceable_composite_type(cu, "foo", file, 1).unwrap();
        assert_eq!(di.replace_all_uses(fwd, fwd), Err(BuilderError::SelfResolution(fwd)));
    }

    #[test]
    fn stale_handles_are_rejected_not_followed() {
        let (mut di, cu, file) = started();
        let fwd = di.create_replaceable_composite_type(cu, "foo", file, 1).unwrap();
        let complete = empty_struct(&mut di, cu, file);
        di.replace_all_uses(fwd, complete).unwrap();
        assert_eq!(
            di.create_pointer_type(fwd, 64, 64),
            Err(BuilderError::InvalidNode(InvalidNodeError::Replaced(fwd)))
        );
    }

    #[test]
    fn an_ir_function_gets_at_most_one_subprogram() {
        let (mut di, _, file) = started();
        let sig = di.create_subroutine_type(file, None, &[]).unwrap();
        let func = Function::from_u32(0);
        let subprogram = di
            .create_function(
                func,
                file,
                "f",
                None,
                file,
                3,
                sig,
                false,
                true,
                Some(4),
                DiFlags::empty(),
                false,
            )
            .unwrap();
        assert_eq!(
            di.create_function(
                func,
                file,
                "f",
                None,
                file,
                3,
                sig,
                false,
                true,
                Some(4),
                DiFlags::empty(),
                false,
            ),
            Err(BuilderError::FunctionAlreadyBound {
                function: func,
                subprogram,
            })
        );
    }

    #[test]
    fn definitions_require_a_scope_line() {
        let (mut di, _, file) = started();
        let sig = di.create_subroutine_type(file, None, &[]).unwrap();
        assert_eq!(
            di.create_function(
                Function::from_u32(0),
                file,
                "f",
                None,
                file,
                3,
                sig,
                false,
                true,
                None,
                DiFlags::empty(),
                false,
            ),
            Err(BuilderError::MissingScopeLine { name: "f".into() })
        );
        // Declarations carry no scope line even when one is passed
        let decl = di
            .create_function(
                Function::from_u32(1),
                file,
                "g",
                None,
                file,
                8,
                sig,
                false,
                false,
                Some(9),
                DiFlags::empty(),
                false,
            )
            .unwrap();
        match di.graph().node(decl) {
            MetadataNode::Subprogram(node) => assert_eq!(node.scope_line, None),
            node => panic!("unexpected node: {}", node.kind_name()),
        }
    }

    #[test]
    fn member_coordinates_are_checked_against_the_layout() {
        let (mut di, cu, file) = started();
        let layout = TargetLayout::new();
        let ir_ty = StructType::new([Type::I32, Type::F32]);
        let int = di.create_basic_type("int", 32, TypeEncoding::Signed).unwrap();
        let float = di.create_basic_type("float", 32, TypeEncoding::Float).unwrap();
        let a = di
            .create_member_type(cu, "a", file, 2, 32, 32, 0, DiFlags::empty(), int)
            .unwrap();
        // Wrong offset: b actually lives at bit 32
        let b = di
            .create_member_type(cu, "b", file, 3, 32, 32, 8, DiFlags::empty(), float)
            .unwrap();
        assert_eq!(
            di.create_struct_type(
                cu,
                "foo",
                file,
                1,
                &layout,
                &ir_ty,
                64,
                32,
                DiFlags::empty(),
                &[a, b],
            ),
            Err(BuilderError::MemberLayoutMismatch {
                name: "foo".into(),
                member: "b".into(),
                what: "bit offset",
                actual: 8,
                expected: 32,
            })
        );
        // Wrong member count
        assert_eq!(
            di.create_struct_type(
                cu,
                "foo",
                file,
                1,
                &layout,
                &ir_ty,
                64,
                32,
                DiFlags::empty(),
                &[a],
            ),
            Err(BuilderError::LayoutMismatch {
                name: "foo".into(),
                what: "member count",
                actual: 1,
                expected: 2,
            })
        );
    }

    #[test]
    fn lexical_blocks_nest_in_subprograms_only() {
        let (mut di, cu, file) = started();
        assert!(matches!(
            di.create_lexical_block(cu, file, 5, 1),
            Err(BuilderError::InvalidScope { .. })
        ));
        let sig = di.create_subroutine_type(file, None, &[]).unwrap();
        let subprogram = di
            .create_function(
                Function::from_u32(0),
                file,
                "f",
                None,
                file,
                3,
                sig,
                false,
                true,
                Some(4),
                DiFlags::empty(),
                false,
            )
            .unwrap();
        let outer = di.create_lexical_block(subprogram, file, 4, 1).unwrap();
        let inner = di.create_lexical_block(outer, file, 5, 5).unwrap();
        assert_eq!(di.graph().compile_unit_of(inner), cu);
    }

    #[test]
    fn arguments_are_one_based() {
        let (mut di, cu, file) = started();
        let int = di.create_basic_type("int", 32, TypeEncoding::Signed).unwrap();
        assert_eq!(
            di.create_argument(cu, "x", file, 2, int, false, DiFlags::empty(), 0),
            Err(BuilderError::InvalidArgumentIndex)
        );
        let arg = di
            .create_argument(cu, "x", file, 2, int, false, DiFlags::empty(), 1)
            .unwrap();
        match di.graph().node(arg) {
            MetadataNode::LocalVariable(node) => assert_eq!(node.arg_no, Some(1)),
            node => panic!("unexpected node: {}", node.kind_name()),
        }
    }

    #[test]
    fn declare_and_value_bindings_carry_their_locations() {
        let (mut di, cu, file) = started();
        let mut func = FunctionData::new("f", FunctionType::new([Type::I32], []));
        let block = func.create_block("entry");
        let slot = func.append_inst(block, InstKind::Alloca { ty: Type::I32 });
        let storage = func.inst_result(slot).unwrap();

        let int = di.create_basic_type("int", 32, TypeEncoding::Signed).unwrap();
        let var = di
            .create_local_variable(cu, "x", file, 4, int, false, DiFlags::empty())
            .unwrap();
        let loc = Location::new(file, 4, 9, cu);
        let declare = di.insert_declare(&mut func, block, storage, var, None, loc).unwrap();
        assert_eq!(func.inst(declare).location(), Some(loc));

        let value_loc = Location::new(file, 6, 3, cu);
        let param = func.param(0);
        let value = di
            .insert_value(&mut func, block, param, var, DiExpression::deref(), value_loc)
            .unwrap();
        assert_eq!(func.inst(value).location(), Some(value_loc));
        assert_eq!(func.block_insts(block), &[slot, declare, value]);
    }

    #[test]
    fn files_deduplicate_through_the_builder() {
        let (mut di, _, file) = started();
        let again = di.create_file("test.c", "/src").unwrap();
        let other = di.create_file("other.c", "/src").unwrap();
        assert_eq!(file, again);
        assert_ne!(file, other);
    }
}
