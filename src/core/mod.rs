// Trace text grammar
mod patterns;
mod grammar;
mod suffix;
mod chain;

// Symbol resolution
mod symbols;
mod resolver;

// Output
mod markup;
mod renderer;

mod job;
mod engine;

pub use grammar::{FrameGrammar, StackFrame};
pub use suffix::{FileLocation, SuffixGrammar};
pub use symbols::{ManifestSymbolSource, ModuleIdentity, SymbolCache, SymbolSource, TypeDescriptor};
pub use resolver::FrameResolver;
pub use markup::PageRenderer;
pub use renderer::{RenderOptions, Renderer};
pub use job::JobRecord;

// Export the main engine
pub use engine::{Engine, RenderRequest};
