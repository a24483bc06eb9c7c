use compact_str::CompactString;
use cranelift_entity::entity_impl;
use smallvec::SmallVec;

use crate::{Function, GlobalVar};

/// A handle to a node in a [MetadataGraph](super::MetadataGraph).
///
/// Handles are cheap, copyable indices scoped to the graph that issued them.
/// They remain stable for the lifetime of the graph, with one exception: the
/// handle of a forward declaration is invalidated when the declaration is
/// replaced by its complete definition. The graph leaves a tombstone behind so
/// that stale handles fail loudly instead of silently reading the wrong node.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(u32);
entity_impl!(NodeRef, "md");

bitflags::bitflags! {
    /// DWARF-style flags carried by type, member and variable nodes
    #[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct DiFlags: u32 {
        const PRIVATE = 1;
        const PROTECTED = 1 << 1;
        const PUBLIC = 1 << 2;
        /// The node is a forward declaration whose definition is not yet known
        const FWD_DECL = 1 << 3;
        /// The subprogram has a prototype
        const PROTOTYPED = 1 << 4;
        /// The entity was introduced by the compiler rather than the programmer
        const ARTIFICIAL = 1 << 5;
        /// The variable is the object pointer of a method
        const OBJECT_POINTER = 1 << 6;
        /// The member is a static member of a composite type
        const STATIC_MEMBER = 1 << 7;
        /// The parameter is passed by lvalue reference
        const LVALUE_REFERENCE = 1 << 8;
    }
}

/// The source language recorded on a compile unit
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    C89,
    C99,
    Cpp,
    Quill,
}

/// DWARF-style value encodings for basic types
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TypeEncoding {
    Address,
    Boolean,
    Float,
    Signed,
    SignedChar,
    Unsigned,
    UnsignedChar,
}

/// Type qualifiers expressible as a qualified-type node
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Const,
    Volatile,
}

/// A source file, identified by directory and file name.
///
/// File nodes are deduplicated by value: creating the same (directory, name)
/// pair twice yields the same handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileNode {
    pub directory: CompactString,
    pub name: CompactString,
}

/// The root scope of all debug metadata for a compilation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnitNode {
    pub language: SourceLanguage,
    pub file: NodeRef,
    pub producer: CompactString,
    pub optimized: bool,
    /// The command-line flags the unit was compiled with, for reproduction
    pub flags: CompactString,
}

/// The debug descriptor of a function.
///
/// Bound 1:1 to an IR function. A subprogram may describe a declaration only
/// (e.g. an external function), in which case it has no scope line and no
/// location-bearing body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprogramNode {
    pub scope: NodeRef,
    pub name: CompactString,
    pub linkage_name: Option<CompactString>,
    pub file: NodeRef,
    pub line: u32,
    /// The subroutine type describing this function's signature
    pub ty: NodeRef,
    pub is_local_to_unit: bool,
    pub is_definition: bool,
    /// The line of the opening brace of the body, present only for definitions
    pub scope_line: Option<u32>,
    pub flags: DiFlags,
    pub optimized: bool,
    /// The IR function this subprogram describes
    pub function: Function,
}

/// A block scope nested within a subprogram or another lexical block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalBlockNode {
    pub scope: NodeRef,
    pub file: NodeRef,
    pub line: u32,
    pub column: u32,
}

/// A primitive type with a DWARF value encoding.
///
/// Basic type nodes are deduplicated by value, like [FileNode].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicTypeNode {
    pub name: CompactString,
    pub bit_size: u64,
    pub encoding: TypeEncoding,
}

/// A pointer to another type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerTypeNode {
    pub pointee: NodeRef,
    pub bit_size: u64,
    pub bit_align: u32,
}

/// A const/volatile qualified wrapper around another type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTypeNode {
    pub qualifier: Qualifier,
    pub base: NodeRef,
}

/// A fixed-length array of another type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayTypeNode {
    pub element: NodeRef,
    pub len: u64,
    pub bit_size: u64,
    pub bit_align: u32,
}

/// A function signature type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubroutineTypeNode {
    pub file: NodeRef,
    /// The return type, or `None` for subroutines that return nothing
    pub result: Option<NodeRef>,
    pub params: SmallVec<[NodeRef; 4]>,
}

/// A struct type.
///
/// This is the only node kind that may be *temporary*: a composite carrying
/// [DiFlags::FWD_DECL] is a forward declaration with no members, awaiting
/// replacement by its complete definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeTypeNode {
    pub scope: NodeRef,
    pub name: CompactString,
    pub file: NodeRef,
    pub line: u32,
    pub bit_size: u64,
    pub bit_align: u32,
    pub flags: DiFlags,
    pub members: SmallVec<[NodeRef; 4]>,
}

/// A member of a composite type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberNode {
    pub scope: NodeRef,
    pub name: CompactString,
    pub file: NodeRef,
    pub line: u32,
    pub bit_size: u64,
    pub bit_align: u32,
    pub bit_offset: u64,
    pub flags: DiFlags,
    pub ty: NodeRef,
}

/// The debug descriptor of a global variable, bound to an IR global
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariableNode {
    pub scope: NodeRef,
    pub name: CompactString,
    pub linkage_name: Option<CompactString>,
    pub file: NodeRef,
    pub line: u32,
    pub ty: NodeRef,
    pub is_local_to_unit: bool,
    /// True if the storage for this variable is defined elsewhere
    pub external_storage: bool,
    /// The IR global this descriptor describes
    pub global: GlobalVar,
}

/// The debug descriptor of a local variable or formal parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableNode {
    pub scope: NodeRef,
    pub name: CompactString,
    pub file: NodeRef,
    pub line: u32,
    pub ty: NodeRef,
    /// 1-based parameter index, or `None` for non-parameter locals
    pub arg_no: Option<u32>,
    /// Keep this variable's description through optimization
    pub always_preserve: bool,
    pub flags: DiFlags,
}

/// A typed node in the metadata graph.
///
/// This is a closed sum over every node kind the graph can hold; dispatch on
/// node kind is always a pattern match. The [Replaced](MetadataNode::Replaced)
/// variant is the tombstone left behind when a forward declaration is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataNode {
    File(FileNode),
    CompileUnit(CompileUnitNode),
    Subprogram(SubprogramNode),
    LexicalBlock(LexicalBlockNode),
    BasicType(BasicTypeNode),
    PointerType(PointerTypeNode),
    QualifiedType(QualifiedTypeNode),
    ArrayType(ArrayTypeNode),
    SubroutineType(SubroutineTypeNode),
    CompositeType(CompositeTypeNode),
    Member(MemberNode),
    GlobalVariable(GlobalVariableNode),
    LocalVariable(LocalVariableNode),
    Replaced { with: NodeRef },
}

impl MetadataNode {
    /// The name of this node's kind, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::CompileUnit(_) => "compile unit",
            Self::Subprogram(_) => "subprogram",
            Self::LexicalBlock(_) => "lexical block",
            Self::BasicType(_) => "basic type",
            Self::PointerType(_) => "pointer type",
            Self::QualifiedType(_) => "qualified type",
            Self::ArrayType(_) => "array type",
            Self::SubroutineType(_) => "subroutine type",
            Self::CompositeType(_) => "composite type",
            Self::Member(_) => "member",
            Self::GlobalVariable(_) => "global variable",
            Self::LocalVariable(_) => "local variable",
            Self::Replaced { .. } => "replaced node",
        }
    }

    /// The source-level name of the entity this node describes, if it has one
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::File(node) => Some(node.name.as_str()),
            Self::Subprogram(node) => Some(node.name.as_str()),
            Self::BasicType(node) => Some(node.name.as_str()),
            Self::CompositeType(node) => Some(node.name.as_str()),
            Self::Member(node) => Some(node.name.as_str()),
            Self::GlobalVariable(node) => Some(node.name.as_str()),
            Self::LocalVariable(node) => Some(node.name.as_str()),
            _ => None,
        }
    }

    /// Returns true if this node is a temporary, i.e. a forward declaration
    /// whose complete definition has not yet been provided
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::CompositeType(node) if node.flags.contains(DiFlags::FWD_DECL))
    }

    /// Returns true if this node may act as a scope for other nodes.
    ///
    /// Scopes are compile units, files, subprograms, lexical blocks, and
    /// composite types (a struct is the scope of its members).
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            Self::CompileUnit(_)
                | Self::File(_)
                | Self::Subprogram(_)
                | Self::LexicalBlock(_)
                | Self::CompositeType(_)
        )
    }

    /// Returns true if this node describes a type
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            Self::BasicType(_)
                | Self::PointerType(_)
                | Self::QualifiedType(_)
                | Self::ArrayType(_)
                | Self::SubroutineType(_)
                | Self::CompositeType(_)
        )
    }

    /// Rewrite every reference this node holds to `from` so that it refers to
    /// `to` instead.
    ///
    /// Returns true if at least one reference was rewritten.
    pub(super) fn replace_refs(&mut self, from: NodeRef, to: NodeRef) -> bool {
        let mut replaced = false;
        let mut rewrite = |slot: &mut NodeRef| {
            if *slot == from {
                *slot = to;
                replaced = true;
            }
        };
        match self {
            Self::File(_) | Self::BasicType(_) => {}
            Self::CompileUnit(node) => {
                rewrite(&mut node.file);
            }
            Self::Subprogram(node) => {
                rewrite(&mut node.scope);
                rewrite(&mut node.file);
                rewrite(&mut node.ty);
            }
            Self::LexicalBlock(node) => {
                rewrite(&mut node.scope);
                rewrite(&mut node.file);
            }
            Self::PointerType(node) => {
                rewrite(&mut node.pointee);
            }
            Self::QualifiedType(node) => {
                rewrite(&mut node.base);
            }
            Self::ArrayType(node) => {
                rewrite(&mut node.element);
            }
            Self::SubroutineType(node) => {
                rewrite(&mut node.file);
                if let Some(result) = node.result.as_mut() {
                    rewrite(result);
                }
                for param in node.params.iter_mut() {
                    rewrite(param);
                }
            }
            Self::CompositeType(node) => {
                rewrite(&mut node.scope);
                rewrite(&mut node.file);
                for member in node.members.iter_mut() {
                    rewrite(member);
                }
            }
            Self::Member(node) => {
                rewrite(&mut node.scope);
                rewrite(&mut node.file);
                rewrite(&mut node.ty);
            }
            Self::GlobalVariable(node) => {
                rewrite(&mut node.scope);
                rewrite(&mut node.file);
                rewrite(&mut node.ty);
            }
            Self::LocalVariable(node) => {
                rewrite(&mut node.scope);
                rewrite(&mut node.file);
                rewrite(&mut node.ty);
            }
            Self::Replaced { with } => {
                rewrite(with);
            }
        }
        replaced
    }
}