use cranelift_entity::entity_impl;

/// A handle to a function in a [Module](crate::Module)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Function(u32);
entity_impl!(Function, "fn");

/// A handle to a global variable in a [Module](crate::Module)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalVar(u32);
entity_impl!(GlobalVar, "gv");

/// A handle to a basic block in a [FunctionData](crate::FunctionData)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// A handle to an instruction in a [FunctionData](crate::FunctionData)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// A handle to an SSA value in a [FunctionData](crate::FunctionData)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Value(u32);
entity_impl!(Value, "v");
