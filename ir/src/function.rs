use alloc::vec::Vec;

use compact_str::CompactString;
use cranelift_entity::PrimaryMap;
use quillc_ir_type::{FunctionType, Type};
use smallvec::SmallVec;

use crate::{
    Block, Function, Inst, Value,
    debug::{DiExpression, Location, NodeRef},
};

/// The body of a function: its basic blocks, instructions and SSA values.
///
/// The instruction set here is intentionally narrow. Code generation proper is
/// the concern of other layers; what this representation must support is
/// carrying a source [Location] on every instruction, and hosting the debug
/// pseudo-instructions that bind values and storage slots to source-level
/// variable descriptors.
#[derive(Debug)]
pub struct FunctionData {
    pub name: CompactString,
    pub signature: FunctionType,
    blocks: PrimaryMap<Block, BlockData>,
    insts: PrimaryMap<Inst, InstData>,
    values: PrimaryMap<Value, ValueData>,
    params: SmallVec<[Value; 4]>,
}

/// A basic block: a named, ordered sequence of instructions
#[derive(Debug, Default)]
pub struct BlockData {
    pub name: CompactString,
    insts: Vec<Inst>,
}

/// An SSA value, defined either by a function parameter or an instruction
#[derive(Debug)]
pub struct ValueData {
    pub ty: Type,
    pub def: ValueDef,
}

/// Where an SSA value comes from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueDef {
    /// The `n`th parameter of the function
    Param(u32),
    /// The result of an instruction
    Result(Inst),
}

/// An instruction together with its optional source location
#[derive(Debug)]
pub struct InstData {
    pub kind: InstKind,
    loc: Option<Location>,
    result: Option<Value>,
}

impl InstData {
    /// The source location attached to this instruction, if any.
    ///
    /// An instruction without a location is simply unknown to the debugger;
    /// that is legal, it just reduces fidelity.
    pub fn location(&self) -> Option<Location> {
        self.loc
    }
}

/// The operations of the Quill IR that participate in debug info construction
#[derive(Debug)]
pub enum InstKind {
    /// Reserve a stack slot for a value of the given type
    Alloca { ty: Type },
    /// Load a value of type `ty` from `addr`
    Load { addr: Value, ty: Type },
    /// Store `value` to `addr`
    Store { addr: Value, value: Value },
    /// Reinterpret `value` at type `ty`
    BitCast { value: Value, ty: Type },
    /// Copy `len` bytes from `src` to `dst`
    MemCpy { dst: Value, src: Value, len: u64, align: u32 },
    /// Call `callee` with `args`
    Call {
        callee: Function,
        args: SmallVec<[Value; 4]>,
        result_ty: Option<Type>,
    },
    /// Return from the function
    Ret { value: Option<Value> },
    /// Pseudo-instruction: `storage` is the address at which the variable
    /// described by `variable` lives
    DbgDeclare {
        storage: Value,
        variable: NodeRef,
        expression: Option<DiExpression>,
    },
    /// Pseudo-instruction: `value` is the current value of the variable
    /// described by `variable`, recoverable via `expression`
    DbgValue {
        value: Value,
        variable: NodeRef,
        expression: DiExpression,
    },
}

impl InstKind {
    /// The type of the value this instruction produces, if it produces one
    fn result_ty(&self) -> Option<Type> {
        match self {
            Self::Alloca { ty } => {
                Some(Type::from(quillc_ir_type::PointerType::new(ty.clone())))
            }
            Self::Load { ty, .. } | Self::BitCast { ty, .. } => Some(ty.clone()),
            Self::Call { result_ty, .. } => result_ty.clone(),
            Self::Store { .. }
            | Self::MemCpy { .. }
            | Self::Ret { .. }
            | Self::DbgDeclare { .. }
            | Self::DbgValue { .. } => None,
        }
    }
}

impl FunctionData {
    /// Create an empty function body with one SSA value per parameter of
    /// `signature`
    pub fn new(name: impl Into<CompactString>, signature: FunctionType) -> Self {
        let mut values = PrimaryMap::new();
        let params = signature
            .params()
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                values.push(ValueData {
                    ty: ty.clone(),
                    def: ValueDef::Param(i as u32),
                })
            })
            .collect();
        Self {
            name: name.into(),
            signature,
            blocks: PrimaryMap::new(),
            insts: PrimaryMap::new(),
            values,
            params,
        }
    }

    /// The SSA value of the `n`th function parameter
    pub fn param(&self, n: usize) -> Value {
        self.params[n]
    }

    /// Append a new, empty basic block
    pub fn create_block(&mut self, name: impl Into<CompactString>) -> Block {
        self.blocks.push(BlockData {
            name: name.into(),
            insts: Vec::new(),
        })
    }

    /// Append `kind` to the end of `block`, without a source location.
    ///
    /// If the instruction produces a result, a fresh [Value] is allocated for
    /// it, retrievable via [inst_result](Self::inst_result).
    pub fn append_inst(&mut self, block: Block, kind: InstKind) -> Inst {
        let result_ty = kind.result_ty();
        let inst = self.insts.push(InstData {
            kind,
            loc: None,
            result: None,
        });
        if let Some(ty) = result_ty {
            let result = self.values.push(ValueData {
                ty,
                def: ValueDef::Result(inst),
            });
            self.insts[inst].result = Some(result);
        }
        self.blocks[block].insts.push(inst);
        inst
    }

    /// Attach `loc` to `inst`, overwriting any location previously attached.
    ///
    /// Setting a location is idempotent: the last write wins, there is no
    /// accumulation.
    pub fn set_location(&mut self, inst: Inst, loc: Location) {
        self.insts[inst].loc = Some(loc);
    }

    /// The instructions of `block`, in order
    pub fn block_insts(&self, block: Block) -> &[Inst] {
        self.blocks[block].insts.as_slice()
    }

    pub fn inst(&self, inst: Inst) -> &InstData {
        &self.insts[inst]
    }

    /// The result value of `inst`, if it produces one
    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.insts[inst].result
    }

    pub fn value(&self, value: Value) -> &ValueData {
        &self.values[value]
    }

    /// Iterate over the blocks of this function in creation order
    pub fn blocks(&self) -> impl Iterator<Item = (Block, &BlockData)> + '_ {
        self.blocks.iter()
    }
}

/// A global variable definition
#[derive(Debug)]
pub struct GlobalVarData {
    pub name: CompactString,
    pub ty: Type,
    /// The alignment of the global's storage, in bytes
    pub align: u32,
}

impl GlobalVarData {
    pub fn new(name: impl Into<CompactString>, ty: Type, align: u32) -> Self {
        Self {
            name: name.into(),
            ty,
            align,
        }
    }
}
