use super::NodeRef;

/// A source position attached to an instruction or variable binding.
///
/// Locations are immutable value objects: two locations with the same fields
/// are the same location. The referenced file and scope must belong to the
/// metadata graph of the module that owns the instruction carrying this
/// location; no validation is performed that line/column fall within the
/// bounds of the actual source file, which is the front end's responsibility.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: NodeRef,
    pub line: u32,
    pub column: u32,
    pub scope: NodeRef,
}

impl Location {
    pub const fn new(file: NodeRef, line: u32, column: u32, scope: NodeRef) -> Self {
        Self {
            file,
            line,
            column,
            scope,
        }
    }
}
