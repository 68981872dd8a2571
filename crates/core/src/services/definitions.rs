use std::collections::{BTreeMap, BTreeSet};

use crate::model::{BinaryModule, ModuleVersion, TypeHandle};

/// Shape of a loaded type: enough to answer "does this member exist".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeShape {
    /// Qualified name of the base type, if any.
    pub base: Option<String>,
    pub fields: BTreeMap<String, bool>,
    pub methods: BTreeMap<String, bool>,
}

impl TypeShape {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Whether a method exists; returns its `is_static` flag.
    pub fn method(&self, name: &str) -> Option<bool> {
        self.methods.get(name).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModuleDefinitions {
    pub version: ModuleVersion,
    pub types: BTreeMap<String, TypeShape>,
}

/// Index of modules already loaded into the host.
///
/// Lives for the whole loader session: modules loaded by earlier calls must
/// stay resolvable for later mods. Ambient modules are known by name only.
#[derive(Debug, Clone, Default)]
pub struct DefinitionIndex {
    modules: BTreeMap<String, ModuleDefinitions>,
    ambient: BTreeSet<String>,
}

impl DefinitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a module's type definitions under its name.
    pub fn add(&mut self, module: &BinaryModule) {
        let mut types = BTreeMap::new();
        for ty in module.types() {
            let shape = TypeShape {
                base: ty.base.map(|handle| module.type_name(handle)),
                fields: ty.fields.iter().map(|f| (f.name.clone(), f.is_static)).collect(),
                methods: ty.methods.iter().map(|m| (m.name.clone(), m.is_static)).collect(),
            };
            types.insert(ty.full_name(), shape);
        }
        self.modules.insert(module.name.clone(), ModuleDefinitions { version: module.version, types });
    }

    /// Drop a module's definitions; returns whether it was indexed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.modules.remove(name).is_some()
    }

    /// Register a module known to be loaded without indexing its definitions.
    pub fn add_ambient(&mut self, name: impl Into<String>) {
        self.ambient.insert(name.into());
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.contains_key(name) || self.ambient.contains(name)
    }

    pub fn has_definitions(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Every loaded module name, sorted.
    pub fn loaded_names(&self) -> BTreeSet<String> {
        self.modules.keys().chain(self.ambient.iter()).cloned().collect()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len() + self.ambient.len()
    }

    /// Version of an indexed module.
    pub fn version_of(&self, name: &str) -> Option<ModuleVersion> {
        self.modules.get(name).map(|m| m.version)
    }

    pub fn resolve_type(&self, module: &str, full_name: &str) -> Option<&TypeShape> {
        self.modules.get(module)?.types.get(full_name)
    }

    /// Find a type by name in any indexed module, preferring `hint`.
    fn find_type(&self, hint: &str, full_name: &str) -> Option<&TypeShape> {
        self.resolve_type(hint, full_name)
            .or_else(|| self.modules.values().find_map(|m| m.types.get(full_name)))
    }

    /// Walk `type_name` and its base types looking for a member.
    fn walk<T>(
        &self,
        module: &str,
        type_name: &str,
        mut probe: impl FnMut(&TypeShape) -> Option<T>,
    ) -> Option<T> {
        let mut current = self.resolve_type(module, type_name);
        let mut seen = BTreeSet::new();
        while let Some(shape) = current {
            if let Some(found) = probe(shape) {
                return Some(found);
            }
            let base = shape.base.as_deref()?;
            if !seen.insert(base.to_string()) {
                return None;
            }
            current = self.find_type(module, base);
        }
        None
    }

    /// Whether the type (or a base type) defines a field with this name.
    pub fn find_field(&self, module: &str, type_name: &str, field: &str) -> bool {
        self.walk(module, type_name, |shape| shape.has_field(field).then_some(())).is_some()
    }

    /// Look up a method on the type or its bases; returns its `is_static` flag.
    pub fn find_method(&self, module: &str, type_name: &str, method: &str) -> Option<bool> {
        self.walk(module, type_name, |shape| shape.method(method))
    }
}

/// Resolve the owning module name and qualified name of a type used by `module`.
pub fn type_location(module: &BinaryModule, handle: TypeHandle) -> (String, String) {
    (module.type_scope_name(handle).to_string(), module.type_name(handle))
}
