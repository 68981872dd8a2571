use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{BinaryModule, TypeHandle, TypeRefId, SYSTEM_PREFIX};
use crate::services::platform::PlatformTargetMap;

/// Outcome of swapping a module's platform references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeRewrite {
    /// Names of the assembly references that were removed.
    pub removed: Vec<String>,
    pub platform_changed: bool,
    /// Qualified names of the type references whose scope changed.
    pub rescoped: Vec<String>,
}

/// Replace references to removed platform modules with the replacement modules.
///
/// Nothing changes unless the module references at least one removed name.
/// Type references (including custom-attribute type arguments) whose name is
/// in the replacement index are rescoped; `System.` names are left alone.
pub fn rewrite_type_scopes(module: &mut BinaryModule, map: &PlatformTargetMap) -> ScopeRewrite {
    let mut result = ScopeRewrite::default();

    let stale: Vec<_> = module
        .assembly_references()
        .filter(|(_, r)| map.is_removed(&r.name))
        .map(|(id, r)| (id, r.name.clone()))
        .collect();
    if stale.is_empty() {
        return result;
    }
    for (id, name) in stale {
        module.remove_assembly_ref(id);
        result.removed.push(name);
    }
    result.platform_changed = true;

    for target in map.targets() {
        module.add_assembly_ref(target.clone());
    }

    let mut ordered: Vec<(String, TypeRefId)> =
        module.type_refs().map(|(id, t)| (t.full_name(), id)).collect();
    ordered.sort();
    let mut seen = BTreeSet::new();
    let from_attributes = module.attribute_type_arguments().into_iter().filter_map(|h| match h {
        TypeHandle::Ref(id) => Some(id),
        TypeHandle::Def(_) => None,
    });
    let candidates: Vec<TypeRefId> = ordered.into_iter().map(|(_, id)| id).chain(from_attributes).collect();

    for id in candidates {
        if !seen.insert(id) {
            continue;
        }
        if change_type_scope(module, map, id) {
            result.rescoped.push(module.type_ref(id).full_name());
        }
    }

    tracing::debug!(
        module = %module.name,
        removed = result.removed.len(),
        rescoped = result.rescoped.len(),
        "rewrote platform references"
    );
    result
}

fn change_type_scope(module: &mut BinaryModule, map: &PlatformTargetMap, id: TypeRefId) -> bool {
    let full_name = module.type_ref(id).full_name();
    if full_name.starts_with(SYSTEM_PREFIX) {
        return false;
    }
    let Some(owner) = map.owner_of(&full_name) else {
        return false;
    };
    let Some(scope) = module.find_assembly_ref(owner) else {
        return false;
    };
    let ty = module.type_ref_mut(id);
    if ty.scope == scope {
        return false;
    }
    ty.scope = scope;
    true
}
