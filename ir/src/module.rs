use compact_str::CompactString;
use cranelift_entity::PrimaryMap;
use quillc_ir_type::FunctionType;

use crate::{
    Function, FunctionData, GlobalVar, GlobalVarData, debug::MetadataGraph,
};

/// A compilation unit: the functions and globals produced for one unit of
/// input, together with (at most) one debug metadata graph describing them.
///
/// The metadata graph is attached once, after it has been finalized by the
/// debug-info builder. A module never shares its graph with another module,
/// and the graph lives exactly as long as the module does.
#[derive(Debug, Default)]
pub struct Module {
    pub name: CompactString,
    functions: PrimaryMap<Function, FunctionData>,
    globals: PrimaryMap<GlobalVar, GlobalVarData>,
    debug_info: Option<MetadataGraph>,
}

impl Module {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a new function with an empty body
    pub fn create_function(
        &mut self,
        name: impl Into<CompactString>,
        signature: FunctionType,
    ) -> Function {
        let name = name.into();
        self.functions.push(FunctionData::new(name, signature))
    }

    pub fn function(&self, func: Function) -> &FunctionData {
        &self.functions[func]
    }

    pub fn function_mut(&mut self, func: Function) -> &mut FunctionData {
        &mut self.functions[func]
    }

    /// Iterate over the functions of this module in creation order
    pub fn functions(&self) -> impl Iterator<Item = (Function, &FunctionData)> + '_ {
        self.functions.iter()
    }

    /// Create a new global variable
    pub fn create_global(&mut self, data: GlobalVarData) -> GlobalVar {
        self.globals.push(data)
    }

    pub fn global(&self, global: GlobalVar) -> &GlobalVarData {
        &self.globals[global]
    }

    /// Install the finalized debug metadata graph for this module.
    ///
    /// Panics if a graph was already attached; a module has exactly one
    /// compilation unit's worth of debug info.
    pub fn attach_debug_info(&mut self, graph: MetadataGraph) {
        assert!(
            self.debug_info.is_none(),
            "module {} already has debug info attached",
            self.name
        );
        self.debug_info = Some(graph);
    }

    /// The debug metadata graph, once attached
    pub fn debug_info(&self) -> Option<&MetadataGraph> {
        self.debug_info.as_ref()
    }
}
