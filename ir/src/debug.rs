//! The debug metadata graph associated with a compilation unit.
//!
//! Debug metadata is represented as a graph of typed nodes (files, scopes,
//! types, variables) allocated out of a single arena owned by the
//! [Module](crate::Module). Nodes refer to each other by [NodeRef] handles
//! rather than by pointer, which is what makes self-referential and mutually
//! recursive type descriptions possible: a forward-declared (temporary) struct
//! node can be referenced freely, and later replaced graph-wide by its
//! complete definition without invalidating any handle except its own.

mod expression;
mod graph;
mod location;
mod node;

pub use self::{
    expression::{DiExprOp, DiExpression},
    graph::{InvalidNodeError, MetadataGraph, NodeDisplay},
    location::Location,
    node::{
        ArrayTypeNode, BasicTypeNode, CompileUnitNode, CompositeTypeNode, DiFlags, FileNode,
        GlobalVariableNode, LexicalBlockNode, LocalVariableNode, MemberNode, MetadataNode, NodeRef,
        PointerTypeNode, QualifiedTypeNode, Qualifier, SourceLanguage, SubprogramNode,
        SubroutineTypeNode, TypeEncoding,
    },
};
