#![no_std]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod debug;
mod entities;
mod function;
mod module;

pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, rustc_hash::FxBuildHasher>;
pub type FxHashSet<K> = hashbrown::HashSet<K, rustc_hash::FxBuildHasher>;

pub use self::{
    entities::{Block, Function, GlobalVar, Inst, Value},
    function::{BlockData, FunctionData, GlobalVarData, InstData, InstKind, ValueData, ValueDef},
    module::Module,
};
