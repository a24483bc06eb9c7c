#![no_std]

//! # Debug metadata construction
//!
//! This crate is the front end's interface for describing source-level
//! entities (files, scopes, types, variables) alongside the IR it emits, in a
//! DWARF-style metadata graph owned by the module being compiled.
//!
//! ## Forward declarations
//!
//! The central difficulty is that a front end often cannot produce a type's
//! complete definition up front: a struct may contain a pointer to itself, or
//! two types may refer to each other. [DebugInfoBuilder] handles this with
//! *replaceable* composite nodes: the front end declares an opaque struct,
//! references it freely while emitting members and variables, and later
//! resolves it to the complete definition with
//! [replace_all_uses](DebugInfoBuilder::replace_all_uses), which rewrites
//! every reference in the graph in a single pass. Handles held by other nodes
//! stay valid across resolution; only the handle of the forward declaration
//! itself is invalidated, and using it afterwards fails loudly.
//!
//! ## Finalization
//!
//! A graph is only well-formed once every forward declaration has been
//! resolved. [finish](DebugInfoBuilder::finish) enforces this: it fails,
//! naming the offenders, while any temporary remains, and freezes the builder
//! once it succeeds. The resolved graph is then moved into the module and can
//! be read concurrently, since no further mutation is possible.
//!
//! ## Locations and variable bindings
//!
//! Instructions carry optional `(file, line, column, scope)` locations,
//! attached through the builder or directly on the function body; setting a
//! location twice keeps the second. Source variables are bound to the
//! generated code by two pseudo-instructions:
//! [insert_declare](DebugInfoBuilder::insert_declare) for variables with
//! addressable storage, and [insert_value](DebugInfoBuilder::insert_value)
//! for values without it, carrying a DWARF expression that recovers the
//! logical value.
//!
//! ```ignore
//! let mut di = DebugInfoBuilder::new();
//! let cu = di.create_compile_unit(SourceLanguage::C99, "test.c", "/src", "quillc", false, "")?;
//! let file = di.create_file("test.c", "/src")?;
//!
//! // Declare `struct foo` before its layout is known...
//! let fwd = di.create_replaceable_composite_type(cu, "foo", file, 1)?;
//! let ptr = di.create_pointer_type(fwd, 64, 64)?;
//!
//! // ...and resolve it once the members can be described.
//! let complete = di.create_struct_type(cu, "foo", file, 1, &layout, &foo_ty, 96, 32,
//!     DiFlags::empty(), &members)?;
//! di.replace_all_uses(fwd, complete)?;
//! di.finish()?;
//! module.attach_debug_info(di.into_graph());
//! ```

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

mod builder;
mod error;

pub use self::{builder::DebugInfoBuilder, error::BuilderError};
