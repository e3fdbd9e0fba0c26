//! The module: the top-level container a pass operates on.
//!
//! Grounded on `cranelift-codegen::ir::function::Function`'s ownership
//! style (an arena plus `create_*` methods returning a handle), scaled up
//! one level: here the arena holds whole functions and globals, not just
//! instructions. The function list additionally needs an *order* — the
//! sentinel-adjacency invariant depends on "the next entry in the
//! module's function list" — so `Module` keeps a `PrimaryMap<Func, ..>`
//! arena (handles stay stable forever) next to a plain `Vec<Func>` giving
//! emission order (which sentinel/converter/constructor insertion
//! mutates). This is the same two-part "arena + separate order" split
//! `Layout` uses for blocks/instructions within one function (see
//! `layout.rs`), just one level up.

use crate::constant::ConstantPool;
use crate::entities::{Const, Func, GlobalValue};
use crate::function::Function;
use crate::globals::GlobalVarData;
use crate::target::{Architecture, DataLayout};
use stabilizer_entity::PrimaryMap;

/// One entry of the global constructor table.
#[derive(Clone, Debug)]
pub struct CtorEntry {
    /// Run priority; lower runs first. The synthesized constructor takes
    /// priority 65535, the conventional "run last" value.
    pub priority: u16,
    /// The constructor function, if any (a null entry is possible in the
    /// underlying table format but never constructed by this crate).
    pub func: Option<Func>,
    /// An opaque per-entry data pointer, passed through unexamined.
    pub data: Option<Const>,
}

/// A compilation module: the unit the two passes transform in place.
pub struct Module {
    /// Target triple string, as the front end would supply it (e.g.
    /// `"x86_64-unknown-linux-gnu"`).
    pub target_triple: String,

    /// Pointer-width data layout.
    pub data_layout: DataLayout,

    /// Global variables.
    pub globals: PrimaryMap<GlobalValue, GlobalVarData>,

    /// The constant pool, holding recursive constant expressions.
    pub constants: ConstantPool,

    /// The global constructor table.
    pub global_ctors: Vec<CtorEntry>,
    /// The former constructor table global's name, if the module had one
    /// on input; the synthesized table takes over this name.
    pub global_ctors_name: Option<String>,

    functions: PrimaryMap<Func, Function>,
    order: Vec<Func>,
}

impl Module {
    /// Create an empty module targeting `target_triple`.
    pub fn new(target_triple: impl Into<String>, data_layout: DataLayout) -> Self {
        Self {
            target_triple: target_triple.into(),
            data_layout,
            globals: PrimaryMap::new(),
            constants: ConstantPool::new(),
            global_ctors: Vec::new(),
            global_ctors_name: None,
            functions: PrimaryMap::new(),
            order: Vec::new(),
        }
    }

    /// Classify this module's target.
    pub fn architecture(&self) -> Architecture {
        Architecture::classify(&self.target_triple)
    }

    /// Declare a global variable, returning its handle.
    pub fn declare_global(&mut self, data: GlobalVarData) -> GlobalValue {
        self.globals.push(data)
    }

    /// Append `function` to the end of the module's function list.
    pub fn declare_function(&mut self, function: Function) -> Func {
        let f = self.functions.push(function);
        self.order.push(f);
        f
    }

    /// Insert `function` immediately after `after` in the module's
    /// function list — how a sentinel lands right after the function it
    /// delimits. Panics if `after` is not currently in the function list.
    pub fn insert_function_after(&mut self, after: Func, function: Function) -> Func {
        let f = self.functions.push(function);
        let pos = self
            .order
            .iter()
            .position(|&g| g == after)
            .expect("`after` must already be in the module's function list");
        self.order.insert(pos + 1, f);
        f
    }

    /// Borrow a function.
    pub fn function(&self, f: Func) -> &Function {
        &self.functions[f]
    }

    /// Mutably borrow a function.
    pub fn function_mut(&mut self, f: Func) -> &mut Function {
        &mut self.functions[f]
    }

    /// Find a function by name, if declared.
    pub fn find_function(&self, name: &str) -> Option<Func> {
        self.functions
            .iter()
            .find(|(_, data)| data.name == name)
            .map(|(f, _)| f)
    }

    /// Functions in emission order — "the next entry in the module's
    /// function list" that sentinel adjacency is defined against.
    pub fn functions_in_order(&self) -> impl Iterator<Item = Func> + '_ {
        self.order.iter().copied()
    }

    /// A snapshot of every function currently in the module, to be taken
    /// once before a pass begins rewriting, so that functions synthesized
    /// *during* a pass (sentinels, converters, the constructor) never
    /// themselves become randomization targets.
    pub fn snapshot_functions(&self) -> Vec<Func> {
        self.order.clone()
    }

    /// Number of functions declared so far.
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Remove `f` from the module's emission order, e.g. when deleting a
    /// lowered intrinsic. The function's arena entry and handle remain
    /// valid — only `functions_in_order`/`snapshot_functions` stop
    /// reporting it — since a `Const::FuncAddr` interned before deletion
    /// must not be invalidated. A no-op if `f` is not currently ordered.
    pub fn remove_from_order(&mut self, f: Func) {
        self.order.retain(|&g| g != f);
    }
}
