//! Symbol resolution: descriptors for types and methods, the shared cache that
//! indexes them, and the sources that produce them.

mod cache;
mod descriptor;
mod format;
mod manifest;
mod type_name;

pub use cache::SymbolCache;
pub use descriptor::{MethodDescriptor, ModuleIdentity, ModuleRecord, StateMachineKind, TypeDescriptor};
pub use manifest::ManifestSymbolSource;
#[cfg(test)]
pub use manifest::ModuleManifest;

use crate::error::Result;

/// Host-specific provider of module metadata.
///
/// The cache only ever reads through this trait; it never executes or loads code.
pub trait SymbolSource: Send + Sync {
    /// Produce the declared types and references of a module
    fn load_module(&self, identity: &ModuleIdentity) -> Result<ModuleRecord>;
}
