//! JSON module manifests as a symbol source.
//!
//! A manifest describes one module the way a metadata dump tool would:
//!
//! ```json
//! {
//!   "module": { "name": "MyApp", "version": "1.0.0.0" },
//!   "references": [ { "name": "MyApp.Core" } ],
//!   "types": [
//!     { "name": "MyApp.Worker",
//!       "methods": [
//!         { "name": "RunAsync",
//!           "parameters": [ { "type": "System.String", "name": "jobId" } ],
//!           "state_machine": { "kind": "async", "type": "MyApp.Worker+<RunAsync>d__3" } } ] },
//!     { "name": "MyApp.Worker+<RunAsync>d__3", "compiler_generated": true }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::descriptor::{MethodDescriptor, ModuleIdentity, ModuleRecord, TypeDescriptor};
use super::type_name::TypeName;
use super::SymbolSource;
use crate::error::{StackmarkError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub module: ModuleIdentity,

    #[serde(default)]
    pub references: Vec<ModuleIdentity>,

    #[serde(default)]
    pub types: Vec<TypeManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeManifest {
    pub name: TypeName,

    #[serde(default)]
    pub generic_parameters: Vec<String>,

    #[serde(default)]
    pub compiler_generated: bool,

    #[serde(default)]
    pub async_completion: bool,

    #[serde(default)]
    pub base_type: Option<String>,

    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl ModuleManifest {
    pub fn into_record(self) -> ModuleRecord {
        let module = self.module;
        let types = self
            .types
            .into_iter()
            .map(|entry| TypeDescriptor {
                generic_parameters: entry.generic_parameters,
                is_compiler_generated: entry.compiler_generated,
                implements_async_completion: entry.async_completion,
                base_type: entry.base_type,
                methods: entry.methods,
                ..TypeDescriptor::new(entry.name, module.clone())
            })
            .collect();

        ModuleRecord {
            identity: module,
            references: self.references,
            types,
        }
    }
}

/// Serves modules from manifests indexed by module name
#[derive(Debug, Default)]
pub struct ManifestSymbolSource {
    manifests: HashMap<String, ModuleManifest>,
}

impl ManifestSymbolSource {
    pub fn from_manifests(manifests: impl IntoIterator<Item = ModuleManifest>) -> Self {
        let mut source = Self::default();
        for manifest in manifests {
            source.insert(manifest);
        }
        source
    }

    /// Scan directories recursively for `*.json` manifests. Missing directories are skipped.
    pub fn from_dirs(dirs: &[PathBuf]) -> Result<Self> {
        let mut manifests = Vec::new();

        for dir in dirs {
            if !dir.is_dir() {
                warn!("Symbol manifest directory {} does not exist, skipping", dir.display());
                continue;
            }

            for entry in WalkDir::new(dir).follow_links(true) {
                let entry = entry.map_err(|e| StackmarkError::Manifest {
                    path: dir.display().to_string(),
                    message: e.to_string(),
                })?;
                let path = entry.path();

                if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
                    manifests.push(Self::read_manifest(path)?);
                }
            }
        }

        let source = Self::from_manifests(manifests);
        debug!("Indexed {} module manifests", source.manifests.len());
        Ok(source)
    }

    fn read_manifest(path: &Path) -> Result<ModuleManifest> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| StackmarkError::Manifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn insert(&mut self, manifest: ModuleManifest) {
        let name = manifest.module.name.clone();
        if self.manifests.contains_key(&name) {
            warn!("Duplicate manifest for module {}, keeping the first one", name);
            return;
        }
        self.manifests.insert(name, manifest);
    }

    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.manifests.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

impl SymbolSource for ManifestSymbolSource {
    fn load_module(&self, identity: &ModuleIdentity) -> Result<ModuleRecord> {
        self.manifests
            .get(&identity.name)
            .cloned()
            .map(ModuleManifest::into_record)
            .ok_or_else(|| StackmarkError::ModuleNotFound(identity.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use crate::core::symbols::StateMachineKind;

    const WORKER: &str = r#"{
        "module": {"name": "MyApp"},
        "types": [
            {"name": "MyApp.Worker",
             "methods": [{
                "name": "RunAsync",
                "parameters": [{"type": "System.String", "name": "jobId"}],
                "state_machine": {"kind": "async", "type": "MyApp.Worker+<RunAsync>d__3"}
             }]},
            {"name": "MyApp.Worker+<RunAsync>d__3", "compiler_generated": true},
            {"name": "MyApp.Repository`1", "generic_parameters": ["T"]}
        ]
    }"#;

    #[test]
    fn test_from_dirs_indexes_nested_manifests() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app/MyApp.json").write_str(WORKER).unwrap();
        temp.child("lib/Core.json")
            .write_str(r#"{"module": {"name": "MyApp.Core"}}"#)
            .unwrap();
        temp.child("notes.txt").write_str("not a manifest").unwrap();

        let source = ManifestSymbolSource::from_dirs(&[temp.path().to_path_buf()]).unwrap();
        assert_eq!(source.module_names(), vec!["MyApp", "MyApp.Core"]);
    }

    #[test]
    fn test_missing_dir_is_skipped() {
        let source =
            ManifestSymbolSource::from_dirs(&[PathBuf::from("/no/such/symbols/dir")]).unwrap();
        assert!(source.is_empty());
    }

    #[test]
    fn test_invalid_manifest_reports_path() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("broken.json").write_str("{\"module\": 12}").unwrap();

        let err = ManifestSymbolSource::from_dirs(&[temp.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, StackmarkError::Manifest { ref path, .. } if path.ends_with("broken.json")));
    }

    #[test]
    fn test_into_record() {
        let manifest: ModuleManifest = serde_json::from_str(WORKER).unwrap();
        let record = manifest.into_record();

        assert_eq!(record.identity.name, "MyApp");
        assert_eq!(record.types.len(), 3);

        let machine = &record.types[1];
        assert!(machine.is_nested);
        assert!(machine.is_compiler_generated);
        assert_eq!(machine.declaring_type.as_deref(), Some("MyApp.Worker"));

        let run = &record.types[0].methods[0];
        assert_eq!(run.state_machine_kind(), Some(StateMachineKind::Async));

        assert_eq!(record.types[2].generic_parameters, vec!["T".to_string()]);
    }

    #[test]
    fn test_load_unknown_module() {
        let source = ManifestSymbolSource::default();
        let err = source.load_module(&ModuleIdentity::named("Ghost")).unwrap_err();
        assert!(matches!(err, StackmarkError::ModuleNotFound(name) if name == "Ghost"));
    }
}
