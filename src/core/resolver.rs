use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use super::grammar::{base_member_name, decode_compiler_generated_name, StackFrame};
use super::symbols::{MethodDescriptor, StateMachineKind, SymbolCache, TypeDescriptor};

/// A frame ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFrame {
    pub frame: StackFrame,

    /// Set when the frame was collapsed from a compiler-generated state machine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_machine: Option<StateMachineKind>,
}

impl ResolvedFrame {
    pub fn unresolved(frame: StackFrame) -> Self {
        Self {
            frame,
            state_machine: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Scheduler plumbing; not rendered
    Hidden,
    Frame(ResolvedFrame),
}

/// Rewrites parsed frames into canonical names using the symbol cache.
/// Anything it cannot pin down uniquely keeps its original text.
pub struct FrameResolver<'a> {
    cache: &'a SymbolCache,
}

impl<'a> FrameResolver<'a> {
    pub fn new(cache: &'a SymbolCache) -> Self {
        Self { cache }
    }

    pub fn resolve(&self, mut frame: StackFrame) -> Resolution {
        let Some(mut ty) = self.cache.lookup(&frame.type_name) else {
            trace!(type_name = %frame.type_name, "Type not in symbol cache");
            return Resolution::Frame(ResolvedFrame::unresolved(frame));
        };

        if self.cache.implements_async_completion(&ty) {
            trace!(type_name = %ty.full_name, "Hiding awaiter frame");
            return Resolution::Hidden;
        }

        let mut state_machine = None;
        let mut candidates = None;

        if ty.is_nested && ty.is_compiler_generated {
            if let Some((declaring, matches)) = self.state_machine_owner(&ty) {
                if let [method] = matches.as_slice() {
                    state_machine = method.state_machine_kind();
                    ty = declaring;
                }
                candidates = Some(matches);
            }
        }

        let methods = candidates.unwrap_or_else(|| {
            let name = base_member_name(&frame.method_name);
            self.cache
                .find_methods(&ty, name, |method| method.matches_parameters(&frame.parameters))
        });

        // the type itself is resolved uniquely by now, whatever the method search found
        frame.type_name = ty.formatted_name(true);

        let [method] = methods.as_slice() else {
            trace!(
                type_name = %ty.full_name,
                method = %frame.method_name,
                candidates = methods.len(),
                "Method not resolved uniquely"
            );
            return Resolution::Frame(ResolvedFrame { frame, state_machine });
        };

        frame.method_name = method.formatted_name();
        if state_machine.is_some() {
            frame.parameters = method.formatted_parameters();
        } else {
            for (parsed, formatted) in frame.parameters.iter_mut().zip(method.formatted_parameters()) {
                parsed.type_name = formatted.type_name;
            }
        }

        Resolution::Frame(ResolvedFrame { frame, state_machine })
    }

    /// For a `<Name>d__N` type, the declaring type and its `Name` methods whose
    /// state machine is this very type.
    fn state_machine_owner(
        &self,
        ty: &Arc<TypeDescriptor>,
    ) -> Option<(Arc<TypeDescriptor>, Vec<MethodDescriptor>)> {
        let original = decode_compiler_generated_name(ty.simple_name())?;
        let declaring = self.cache.declaring_type(ty)?;

        let matches = self.cache.find_methods(&declaring, original, |method| {
            method
                .state_machine
                .as_ref()
                .is_some_and(|machine| machine.type_name == ty.full_name)
        });

        Some((declaring, matches))
    }
}
