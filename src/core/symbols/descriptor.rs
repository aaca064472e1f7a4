use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::format::{format_method_name, format_type_name};
use super::type_name::TypeName;
use crate::core::grammar::{base_member_name, Parameter};

/// Identity of a module (assembly). Only the simple name takes part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleIdentity {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_token: Option<String>,
}

impl ModuleIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            culture: None,
            public_key_token: None,
        }
    }
}

impl PartialEq for ModuleIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ModuleIdentity {}

impl Hash for ModuleIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Kind of compiler-generated state machine behind a method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMachineKind {
    Async,
    Iterator,
}

impl StateMachineKind {
    /// Keyword shown as a badge in front of the collapsed frame
    pub fn keyword(self) -> &'static str {
        match self {
            StateMachineKind::Async => "await",
            StateMachineKind::Iterator => "yield",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachine {
    pub kind: StateMachineKind,

    /// Full name of the generated type implementing it, e.g. `MyApp.Worker+<RunAsync>d__3`
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    #[serde(rename = "type")]
    pub type_name: TypeName,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,

    /// Generic parameter names of a generic method definition
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_arguments: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_machine: Option<StateMachine>,
}

impl MethodDescriptor {
    pub fn state_machine_kind(&self) -> Option<StateMachineKind> {
        self.state_machine.as_ref().map(|machine| machine.kind)
    }

    /// Whether `name` (as spelled in a trace) refers to this method
    pub fn is_named(&self, name: &str) -> bool {
        base_member_name(&self.name) == base_member_name(name)
    }

    /// Whether the parsed parameters spell this method's signature, either with
    /// short type names or with full names.
    pub fn matches_parameters(&self, parsed: &[Parameter]) -> bool {
        self.parameters.len() == parsed.len()
            && self.parameters.iter().zip(parsed).all(|(declared, parsed)| {
                declared.type_name.name() == parsed.type_name
                    || declared.type_name.full_name() == parsed.type_name
            })
    }

    /// Same name and parameter types; an override hides its base declaration
    pub fn same_signature(&self, other: &MethodDescriptor) -> bool {
        self.name == other.name
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.type_name == b.type_name)
    }

    pub fn formatted_name(&self) -> String {
        format_method_name(&self.name, &self.generic_arguments)
    }

    /// Parameters formatted for display, without namespaces
    pub fn formatted_parameters(&self) -> Vec<Parameter> {
        self.parameters
            .iter()
            .map(|p| Parameter::new(format_type_name(&p.type_name, false), p.name.clone()))
            .collect()
    }
}

/// Everything the resolver needs to know about one type
#[derive(Debug, Clone, Serialize)]
pub struct TypeDescriptor {
    /// Runtime full name, e.g. `MyApp.Outer+Inner`1`
    pub full_name: String,

    pub name: TypeName,

    pub is_nested: bool,

    /// Full name of the enclosing type; resolved through the cache
    pub declaring_type: Option<String>,

    pub generic_parameters: Vec<String>,

    pub is_compiler_generated: bool,

    /// Awaiter/continuation helper types (`INotifyCompletion` implementors)
    pub implements_async_completion: bool,

    pub base_type: Option<String>,

    pub methods: Vec<MethodDescriptor>,

    pub module: ModuleIdentity,
}

impl TypeDescriptor {
    pub fn new(name: TypeName, module: ModuleIdentity) -> Self {
        Self {
            full_name: name.definition_name(),
            is_nested: name.is_nested(),
            declaring_type: name.declaring_name(),
            name,
            generic_parameters: Vec::new(),
            is_compiler_generated: false,
            implements_async_completion: false,
            base_type: None,
            methods: Vec::new(),
            module,
        }
    }

    /// The type's own name without namespace or declaring types
    pub fn simple_name(&self) -> &str {
        self.name.innermost()
    }

    /// The dotted spelling stack traces use for nested types
    pub fn dotted_alias(&self) -> Option<String> {
        self.is_nested.then(|| self.name.dotted_name())
    }

    /// Display name with generic parameters spelled out: `MyApp.Outer.Inner<T>`
    pub fn formatted_name(&self, with_namespace: bool) -> String {
        let mut name = self.name.clone();
        if name.generic_arguments.is_empty() {
            name.generic_arguments = self
                .generic_parameters
                .iter()
                .map(|parameter| TypeName::simple(parameter.as_str()))
                .collect();
        }
        format_type_name(&name, with_namespace)
    }
}

/// A module's declared types and the modules it references
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub identity: ModuleIdentity,
    pub references: Vec<ModuleIdentity>,
    pub types: Vec<TypeDescriptor>,
}
