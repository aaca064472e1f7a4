//! Structured form of the runtime's reflection type names.
//!
//! Accepts the spellings metadata tools emit for a type:
//! `Ns.Outer+Inner`1[System.String]`, assembly-qualified arguments
//! (`List`1[[System.String, System.Private.CoreLib]]`), arrays (`Int32[]`,
//! `Int32[,]`), by-ref (`Int32&`) and pointers (`Byte*`).

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{StackmarkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeModifier {
    /// Array of the given rank
    Array(usize),
    ByRef,
    Pointer,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    /// Namespace of the outermost declaring type
    pub namespace: Option<String>,

    /// Type names from the outermost declaring type down, arity markers included
    pub nesting: Vec<String>,

    /// Generic arguments for all nesting levels, outermost first
    pub generic_arguments: Vec<TypeName>,

    pub modifiers: Vec<TypeModifier>,
}

impl TypeName {
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            input,
            chars: input.char_indices().peekable(),
        };

        let name = parser.type_name()?;
        parser.skip_whitespace();
        if let Some((at, _)) = parser.chars.peek() {
            return Err(StackmarkError::TypeName(format!(
                "unexpected trailing text at {at} in {input:?}"
            )));
        }

        Ok(name)
    }

    /// A bare, non-nested name such as a generic parameter (`T`).
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            nesting: vec![name.into()],
            generic_arguments: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    pub fn is_nested(&self) -> bool {
        self.nesting.len() > 1
    }

    /// The innermost type's own name, arity marker included: `Inner`1`
    pub fn innermost(&self) -> &str {
        self.nesting.last().map(String::as_str).unwrap_or_default()
    }

    /// Namespace plus nesting joined the runtime way: `Ns.Outer+Inner`1`
    pub fn definition_name(&self) -> String {
        let mut name = String::new();
        if let Some(namespace) = &self.namespace {
            name.push_str(namespace);
            name.push('.');
        }
        name.push_str(&self.nesting.join("+"));
        name
    }

    /// Same as [`Self::definition_name`] with dots for nesting, the way traces spell it
    pub fn dotted_name(&self) -> String {
        self.definition_name().replace('+', ".")
    }

    /// Definition name of the enclosing type, for nested types
    pub fn declaring_name(&self) -> Option<String> {
        if !self.is_nested() {
            return None;
        }

        let declaring = TypeName {
            namespace: self.namespace.clone(),
            nesting: self.nesting[..self.nesting.len() - 1].to_vec(),
            generic_arguments: Vec::new(),
            modifiers: Vec::new(),
        };
        Some(declaring.definition_name())
    }

    /// The runtime's short name: innermost name plus modifiers (`List`1`, `Int32[]`)
    pub fn name(&self) -> String {
        let mut name = self.innermost().to_string();
        push_modifiers(&mut name, &self.modifiers);
        name
    }

    /// The runtime's full name with generic arguments in `[A,B]` form
    pub fn full_name(&self) -> String {
        let mut name = self.definition_name();
        if !self.generic_arguments.is_empty() {
            name.push('[');
            let arguments: Vec<String> =
                self.generic_arguments.iter().map(TypeName::full_name).collect();
            name.push_str(&arguments.join(","));
            name.push(']');
        }
        push_modifiers(&mut name, &self.modifiers);
        name
    }
}

/// Splits `Name`2` into `("Name", 2)`.
pub fn split_arity(segment: &str) -> (&str, usize) {
    match segment.rsplit_once('`') {
        Some((base, digits)) if !base.is_empty() => match digits.parse() {
            Ok(arity) => (base, arity),
            Err(_) => (segment, 0),
        },
        _ => (segment, 0),
    }
}

pub(crate) fn push_modifiers(name: &mut String, modifiers: &[TypeModifier]) {
    for modifier in modifiers {
        match modifier {
            TypeModifier::Array(rank) => {
                name.push('[');
                name.push_str(&",".repeat(rank.saturating_sub(1)));
                name.push(']');
            }
            TypeModifier::ByRef => name.push('&'),
            TypeModifier::Pointer => name.push('*'),
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl Serialize for TypeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TypeName::parse(&text).map_err(serde::de::Error::custom)
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> StackmarkError {
        StackmarkError::TypeName(format!("{message} in {:?}", self.input))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.chars.next();
        }
    }

    fn identifier(&mut self) -> Result<&'a str> {
        let start = match self.chars.peek() {
            Some(&(at, _)) => at,
            None => return Err(self.error("expected identifier")),
        };

        let mut end = start;
        while let Some(&(at, c)) = self.chars.peek() {
            if matches!(c, '.' | '+' | '[' | ']' | ',' | '&' | '*') || c.is_whitespace() {
                break;
            }
            end = at + c.len_utf8();
            self.chars.next();
        }

        if end == start {
            return Err(self.error("expected identifier"));
        }
        let input = self.input;
        Ok(&input[start..end])
    }

    fn type_name(&mut self) -> Result<TypeName> {
        self.skip_whitespace();

        let mut dotted = vec![self.identifier()?];
        while self.eat('.') {
            dotted.push(self.identifier()?);
        }

        let outermost = dotted.pop().unwrap_or_default().to_string();
        let namespace = (!dotted.is_empty()).then(|| dotted.join("."));

        let mut nesting = vec![outermost];
        while self.eat('+') {
            nesting.push(self.identifier()?.to_string());
        }

        let mut name = TypeName {
            namespace,
            nesting,
            generic_arguments: Vec::new(),
            modifiers: Vec::new(),
        };

        loop {
            match self.peek() {
                Some('[') => {
                    self.chars.next();
                    match self.peek() {
                        Some(']') | Some(',') | Some('*') => {
                            name.modifiers.push(TypeModifier::Array(self.array_rank()?));
                        }
                        _ if name.generic_arguments.is_empty() && name.modifiers.is_empty() => {
                            name.generic_arguments = self.generic_arguments()?;
                        }
                        _ => return Err(self.error("unexpected '['")),
                    }
                }
                Some('&') => {
                    self.chars.next();
                    name.modifiers.push(TypeModifier::ByRef);
                }
                Some('*') => {
                    self.chars.next();
                    name.modifiers.push(TypeModifier::Pointer);
                }
                _ => break,
            }
        }

        Ok(name)
    }

    /// After the opening '[': `]`, `,]`, `*]` and so on.
    fn array_rank(&mut self) -> Result<usize> {
        let mut rank = 1;
        loop {
            match self.chars.next() {
                Some((_, ']')) => return Ok(rank),
                Some((_, ',')) => rank += 1,
                Some((_, '*')) => {}
                _ => return Err(self.error("unterminated array brackets")),
            }
        }
    }

    /// After the opening '[': `A,B]` or `[A, asm],[B, asm]]`.
    fn generic_arguments(&mut self) -> Result<Vec<TypeName>> {
        let mut arguments = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat('[') {
                arguments.push(self.type_name()?);
                self.skip_assembly_qualification()?;
            } else {
                arguments.push(self.type_name()?);
            }

            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, ']')) => return Ok(arguments),
                _ => return Err(self.error("unterminated generic argument list")),
            }
        }
    }

    /// Skips `, Assembly, Version=..., PublicKeyToken=...]`, consuming the closing bracket.
    fn skip_assembly_qualification(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.chars.next() {
                Some((_, '[')) => depth += 1,
                Some((_, ']')) if depth == 0 => return Ok(()),
                Some((_, ']')) => depth -= 1,
                Some(_) => {}
                None => return Err(self.error("unterminated assembly-qualified argument")),
            }
        }
    }
}
