use indexmap::IndexMap;

use golite_common::generators::{RegisterGenerator, VirtualRegister};
use golite_common::typings::Type;
use golite_common::{bug_report, idx, Idx, IndexVec};


idx!(ScopeIdx);

pub const GLOBAL_SCOPE_NAME: &str = "global";

#[derive(Debug, Clone, PartialEq)]
pub struct VarEntry {
    pub ty: Type,
    /// Literal value recorded by semantic analysis, if any.
    pub value: Option<String>,
    /// Stable IR identity of the variable, allocated once when the entry is created.
    pub register: VirtualRegister,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncEntry {
    pub return_type: Type,
    pub scope: ScopeIdx,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructEntry {
    pub scope: ScopeIdx,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Var(VarEntry),
    Func(FuncEntry),
    Struct(StructEntry),
}

impl Entry {
    pub fn ty(&self) -> Option<&Type> {
        match self {
            Entry::Var(var) => Some(&var.ty),
            Entry::Func(_) | Entry::Struct(_) => None,
        }
    }

    pub fn register(&self) -> Option<VirtualRegister> {
        match self {
            Entry::Var(var) => Some(var.register),
            Entry::Func(_) | Entry::Struct(_) => None,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Entry::Var(var) => var.value.as_deref(),
            Entry::Func(_) | Entry::Struct(_) => None,
        }
    }

    pub fn return_type(&self) -> Option<&Type> {
        match self {
            Entry::Func(func) => Some(&func.return_type),
            Entry::Var(_) | Entry::Struct(_) => None,
        }
    }

    pub fn scope(&self) -> Option<ScopeIdx> {
        match self {
            Entry::Func(func) => Some(func.scope),
            Entry::Struct(structure) => Some(structure.scope),
            Entry::Var(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    New,
    Delete,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "new" => Some(Builtin::New),
            "delete" => Some(Builtin::Delete),
            _ => None,
        }
    }
}

/// What a call site's callee name resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Callee<'a> {
    User(&'a FuncEntry),
    Builtin(Builtin),
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeIdx>,
    entries: IndexMap<String, Entry>,
    pub param_names: Vec<String>,
    pub param_types: Vec<Type>,
}

impl Scope {
    fn new(parent: Option<ScopeIdx>, name: String) -> Self {
        Self { name, parent, entries: IndexMap::new(), param_names: Vec::new(), param_types: Vec::new() }
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The scope forest of one program. Scopes live in an arena and a parent is
/// always created before its children, so every chain ends at the global scope.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: IndexVec<ScopeIdx, Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        scopes.push(Scope::new(None, GLOBAL_SCOPE_NAME.to_string()));
        Self { scopes }
    }

    pub fn global(&self) -> ScopeIdx {
        ScopeIdx::first()
    }

    pub fn new_scope(&mut self, parent: Option<ScopeIdx>, name: &str) -> ScopeIdx {
        if let Some(parent) = parent {
            if self.scopes.get(parent).is_none() {
                bug_report!("Parent scope {:?} of `{}` does not exist", parent, name);
            }
        }

        self.scopes.push(Scope::new(parent, name.to_string()))
    }

    pub fn scope(&self, scope: ScopeIdx) -> &Scope {
        self.scopes.get_or_panic(scope)
    }

    pub fn insert(&mut self, scope: ScopeIdx, name: &str, entry: Entry) -> Option<Entry> {
        let previous = self.scopes[scope].entries.insert(name.to_string(), entry);
        if previous.is_some() {
            tracing::warn!("`{}` redeclared in scope `{}`, replacing the previous entry", name, self.scopes[scope].name);
        }

        previous
    }

    /// Looks `name` up in `scope` only.
    pub fn contains(&self, scope: ScopeIdx, name: &str) -> Option<&Entry> {
        self.scope(scope).entries.get(name)
    }

    /// Looks `name` up along the scope chain, innermost first.
    pub fn power_contains(&self, scope: ScopeIdx, name: &str) -> Option<&Entry> {
        self.resolve(scope, name).map(|(_, entry)| entry)
    }

    fn resolve(&self, scope: ScopeIdx, name: &str) -> Option<(ScopeIdx, &Entry)> {
        let mut current = Some(scope);
        while let Some(scope_idx) = current {
            let scope = self.scope(scope_idx);
            if let Some(entry) = scope.entries.get(name) {
                return Some((scope_idx, entry));
            }
            current = scope.parent;
        }

        None
    }

    /// True when the nearest binding of `name` seen from `scope` lives in the
    /// global scope, i.e. the variable is memory-resident.
    pub fn check_global_variable(&self, scope: ScopeIdx, name: &str) -> bool {
        match self.resolve(scope, name) {
            Some((scope_idx, Entry::Var(_))) => scope_idx == self.global(),
            _ => false,
        }
    }

    /// Resolves a call target. The regular scope chain wins; built-ins are
    /// only searched once the chain is exhausted.
    pub fn resolve_callee(&self, scope: ScopeIdx, name: &str) -> Option<Callee<'_>> {
        match self.power_contains(scope, name) {
            Some(Entry::Func(func)) => Some(Callee::User(func)),
            _ => Builtin::from_name(name).map(Callee::Builtin),
        }
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FuncEntry> {
        match self.contains(self.global(), name) {
            Some(Entry::Func(func)) => Some(func),
            _ => None,
        }
    }

    pub fn lookup_struct(&self, name: &str) -> Option<&StructEntry> {
        match self.contains(self.global(), name) {
            Some(Entry::Struct(structure)) => Some(structure),
            _ => None,
        }
    }

    /// Return type of the function owning `scope`, found through the scope's name.
    pub fn enclosing_return_type(&self, scope: ScopeIdx) -> Option<&Type> {
        let scope = self.scope(scope);
        let parent = scope.parent?;
        self.contains(parent, &scope.name)?.return_type()
    }

    /// Parameter variables of a function scope, in declaration order.
    pub fn parameters(&self, function_scope: ScopeIdx) -> Vec<&VarEntry> {
        let scope = self.scope(function_scope);
        scope.param_names.iter()
            .map(|name| match scope.entries.get(name) {
                Some(Entry::Var(var)) => var,
                _ => bug_report!("Parameter `{}` of `{}` is not a variable", name, scope.name),
            })
            .collect()
    }

    pub fn field_count(&self, struct_name: &str) -> Option<usize> {
        self.lookup_struct(struct_name).map(|structure| self.scope(structure.scope).len())
    }

    /// Index of `field` within `struct_name` and the field's entry. The index
    /// is the field's word offset.
    pub fn field(&self, struct_name: &str, field: &str) -> Option<(usize, &Entry)> {
        let structure = self.lookup_struct(struct_name)?;
        self.scope(structure.scope).entries.get_full(field).map(|(index, _, entry)| (index, entry))
    }

    pub fn set_value(&mut self, scope: ScopeIdx, name: &str, value: &str) {
        match self.scopes[scope].entries.get_mut(name) {
            Some(Entry::Var(var)) => var.value = Some(value.to_string()),
            _ => bug_report!("Cannot record a value for non-variable `{}`", name),
        }
    }

    pub fn declare_variable(
        &mut self,
        scope: ScopeIdx,
        name: &str,
        ty: Type,
        registers: &mut RegisterGenerator,
    ) -> VirtualRegister {
        let register = registers.next_register();
        tracing::trace!("Declaring `{}`: {} in scope {:?} as {}", name, ty, scope, register);
        self.insert(scope, name, Entry::Var(VarEntry { ty, value: None, register }));

        register
    }

    pub fn declare_parameter(
        &mut self,
        function_scope: ScopeIdx,
        name: &str,
        ty: Type,
        registers: &mut RegisterGenerator,
    ) -> VirtualRegister {
        let register = self.declare_variable(function_scope, name, ty.clone(), registers);
        let scope = &mut self.scopes[function_scope];
        scope.param_names.push(name.to_string());
        scope.param_types.push(ty);

        register
    }

    /// Creates the function's child scope under the global scope.
    pub fn declare_function(&mut self, name: &str, return_type: Type) -> ScopeIdx {
        let global = self.global();
        let scope = self.new_scope(Some(global), name);
        self.insert(global, name, Entry::Func(FuncEntry { return_type, scope }));

        scope
    }

    pub fn declare_struct(
        &mut self,
        name: &str,
        fields: &[(&str, Type)],
        registers: &mut RegisterGenerator,
    ) -> ScopeIdx {
        let global = self.global();
        let scope = self.new_scope(Some(global), name);
        self.insert(global, name, Entry::Struct(StructEntry { scope }));

        for (field, ty) in fields {
            self.declare_variable(scope, field, ty.clone(), registers);
        }

        scope
    }
}
