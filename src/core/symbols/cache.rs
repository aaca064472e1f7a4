use std::collections::HashSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::descriptor::{MethodDescriptor, ModuleIdentity, ModuleRecord, TypeDescriptor};
use super::SymbolSource;

/// Process-wide lookup from type names to descriptors.
///
/// Loads may race: the first insert of a name wins and later ones are no-ops,
/// so readers never observe a descriptor being replaced.
#[derive(Debug, Default)]
pub struct SymbolCache {
    modules: DashMap<ModuleIdentity, ()>,
    types: DashMap<String, Arc<TypeDescriptor>>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module's types, then every module it references that is not
    /// cached yet. References the source cannot produce are skipped.
    pub fn load(&self, source: &dyn SymbolSource, module: ModuleRecord) {
        match self.modules.entry(module.identity.clone()) {
            Entry::Occupied(_) => return,
            Entry::Vacant(vacant) => {
                vacant.insert(());
            }
        }

        let count = module.types.len();
        for descriptor in module.types {
            self.register(descriptor);
        }
        debug!(module = %module.identity.name, types = count, "Loaded module into symbol cache");

        for reference in &module.references {
            if self.modules.contains_key(reference) {
                continue;
            }

            match source.load_module(reference) {
                Ok(record) => self.load(source, record),
                Err(e) => debug!(module = %reference.name, error = %e, "Skipping unloadable module reference"),
            }
        }
    }

    /// Fetches a module from the source and loads it; `false` if the source failed.
    pub fn load_by_identity(&self, source: &dyn SymbolSource, identity: &ModuleIdentity) -> bool {
        if self.modules.contains_key(identity) {
            return true;
        }

        match source.load_module(identity) {
            Ok(record) => {
                self.load(source, record);
                true
            }
            Err(e) => {
                debug!(module = %identity.name, error = %e, "Module could not be loaded");
                false
            }
        }
    }

    fn register(&self, descriptor: TypeDescriptor) {
        let alias = descriptor.dotted_alias();
        let descriptor = Arc::new(descriptor);

        self.types
            .entry(descriptor.full_name.clone())
            .or_insert_with(|| Arc::clone(&descriptor));

        if let Some(alias) = alias {
            self.types.entry(alias).or_insert(descriptor);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        if name.is_empty() {
            return None;
        }
        self.types.get(name).map(|entry| Arc::clone(entry.value()))
    }

    #[cfg(test)]
    pub fn contains_module(&self, name: &str) -> bool {
        self.modules.contains_key(&ModuleIdentity::named(name))
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of lookup keys, nested-type aliases included
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn declaring_type(&self, descriptor: &TypeDescriptor) -> Option<Arc<TypeDescriptor>> {
        descriptor
            .declaring_type
            .as_deref()
            .and_then(|name| self.lookup(name))
    }

    /// The type followed by its cached base types, most derived first
    fn hierarchy(&self, descriptor: &Arc<TypeDescriptor>) -> Vec<Arc<TypeDescriptor>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(Arc::clone(descriptor));

        while let Some(ty) = current {
            if !seen.insert(ty.full_name.clone()) {
                break;
            }
            current = ty.base_type.as_deref().and_then(|name| self.lookup(name));
            chain.push(ty);
        }

        chain
    }

    /// Whether the type or any cached base type is an awaiter helper
    pub fn implements_async_completion(&self, descriptor: &Arc<TypeDescriptor>) -> bool {
        self.hierarchy(descriptor)
            .iter()
            .any(|ty| ty.implements_async_completion)
    }

    /// Methods called `name` on the type and its base types that satisfy `predicate`.
    /// A base method hidden by a derived one with the same signature is left out.
    pub fn find_methods<F>(&self, descriptor: &Arc<TypeDescriptor>, name: &str, predicate: F) -> Vec<MethodDescriptor>
    where
        F: Fn(&MethodDescriptor) -> bool,
    {
        let mut found: Vec<MethodDescriptor> = Vec::new();

        for ty in self.hierarchy(descriptor) {
            let declared_here = found.len();
            for method in ty.methods.iter().filter(|m| m.is_named(name) && predicate(m)) {
                if found[..declared_here].iter().any(|f| f.same_signature(method)) {
                    continue;
                }
                found.push(method.clone());
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::symbols::{ManifestSymbolSource, ModuleManifest};
    use std::thread;

    fn manifest(json: &str) -> ModuleManifest {
        serde_json::from_str(json).unwrap()
    }

    fn source() -> ManifestSymbolSource {
        ManifestSymbolSource::from_manifests(vec![
            manifest(r#"{
                "module": {"name": "MyApp", "version": "1.0.0.0"},
                "references": [{"name": "MyApp.Core"}, {"name": "Missing.Dependency"}],
                "types": [
                    {"name": "MyApp.Worker", "base_type": "MyApp.Core.WorkerBase",
                     "methods": [{"name": "Run", "parameters": []}]},
                    {"name": "MyApp.Worker+<RunAsync>d__3", "compiler_generated": true}
                ]
            }"#),
            manifest(r#"{
                "module": {"name": "MyApp.Core"},
                "references": [{"name": "MyApp"}],
                "types": [
                    {"name": "MyApp.Core.WorkerBase",
                     "methods": [
                        {"name": "Run", "parameters": []},
                        {"name": "Stop", "parameters": []}
                     ]},
                    {"name": "MyApp.Worker", "methods": []}
                ]
            }"#),
        ])
    }

    #[test]
    fn test_load_walks_references_and_skips_failures() {
        let source = source();
        let cache = SymbolCache::new();

        assert!(cache.load_by_identity(&source, &ModuleIdentity::named("MyApp")));
        assert!(cache.contains_module("MyApp"));
        assert!(cache.contains_module("MyApp.Core"));
        assert!(!cache.contains_module("Missing.Dependency"));
        assert_eq!(cache.module_count(), 2);

        assert!(cache.lookup("MyApp.Core.WorkerBase").is_some());
        assert!(cache.lookup("System.String").is_none());
        assert!(cache.lookup("").is_none());
    }

    #[test]
    fn test_first_insert_wins() {
        let source = source();
        let cache = SymbolCache::new();
        cache.load_by_identity(&source, &ModuleIdentity::named("MyApp"));

        let worker = cache.lookup("MyApp.Worker").unwrap();
        assert_eq!(worker.module.name, "MyApp");
        assert_eq!(worker.methods.len(), 1);
    }

    #[test]
    fn test_nested_types_registered_under_both_spellings() {
        let source = source();
        let cache = SymbolCache::new();
        cache.load_by_identity(&source, &ModuleIdentity::named("MyApp"));

        let natural = cache.lookup("MyApp.Worker+<RunAsync>d__3").unwrap();
        let dotted = cache.lookup("MyApp.Worker.<RunAsync>d__3").unwrap();
        assert!(Arc::ptr_eq(&natural, &dotted));
        assert_eq!(cache.declaring_type(&natural).unwrap().full_name, "MyApp.Worker");
    }

    #[test]
    fn test_find_methods_flattens_hierarchy_and_hides_overridden() {
        let source = source();
        let cache = SymbolCache::new();
        cache.load_by_identity(&source, &ModuleIdentity::named("MyApp"));
        let worker = cache.lookup("MyApp.Worker").unwrap();

        assert_eq!(cache.find_methods(&worker, "Run", |_| true).len(), 1);
        assert_eq!(cache.find_methods(&worker, "Stop", |_| true).len(), 1);
        assert!(cache.find_methods(&worker, "Start", |_| true).is_empty());
    }

    #[test]
    fn test_unknown_module_is_not_fatal() {
        let cache = SymbolCache::new();
        assert!(!cache.load_by_identity(&source(), &ModuleIdentity::named("Nope")));
        assert_eq!(cache.module_count(), 0);
    }

    #[test]
    fn test_concurrent_loads_are_idempotent() {
        let source = Arc::new(source());
        let cache = Arc::new(SymbolCache::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let source = Arc::clone(&source);
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache.load_by_identity(source.as_ref(), &ModuleIdentity::named("MyApp"));
                    cache.lookup("MyApp.Core.WorkerBase").is_some()
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.module_count(), 2);
        assert!(cache.lookup("MyApp.Worker.<RunAsync>d__3").is_some());
    }
}
