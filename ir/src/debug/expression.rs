use alloc::vec::Vec;
use core::fmt;

/// A DWARF expression operation used to recover a source-level value from the
/// IR value a variable descriptor is bound to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DiExprOp {
    /// DW_OP_deref - Dereference the address at top of stack
    Deref,
    /// DW_OP_plus_uconst - Add unsigned constant to top of stack
    PlusUConst(u64),
    /// DW_OP_constu - Unsigned constant value
    ConstU(u64),
    /// DW_OP_stack_value - The value on the stack is the value of the variable
    StackValue,
}

/// A DWARF expression describing how to compute a variable's logical value.
///
/// The operations encode the *inverse* of whatever transformation was applied
/// to the bound value. For example, when a by-value parameter is actually
/// passed by pointer, a single `Deref` recovers the source-level value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DiExpression {
    operations: Vec<DiExprOp>,
}

impl DiExpression {
    pub const fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    pub fn with_ops<I: IntoIterator<Item = DiExprOp>>(operations: I) -> Self {
        Self {
            operations: operations.into_iter().collect(),
        }
    }

    /// The expression consisting of a single dereference
    pub fn deref() -> Self {
        Self::with_ops([DiExprOp::Deref])
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[DiExprOp] {
        self.operations.as_slice()
    }
}

impl fmt::Display for DiExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("di.expression(")?;
        for (i, op) in self.operations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match op {
                DiExprOp::Deref => f.write_str("DW_OP_deref")?,
                DiExprOp::PlusUConst(val) => write!(f, "DW_OP_plus_uconst {val}")?,
                DiExprOp::ConstU(val) => write!(f, "DW_OP_constu {val}")?,
                DiExprOp::StackValue => f.write_str("DW_OP_stack_value")?,
            }
        }
        f.write_str(")")
    }
}
