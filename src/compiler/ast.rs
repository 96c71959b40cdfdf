//! Minimal GraphQL query AST and printer.
//!
//! Only what the bridge emits: one anonymous `query` operation made of nested
//! field selections with arguments. String values are escaped on output;
//! field names, argument names and enum values are emitted verbatim.

use std::fmt::Write as _;

/// An argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Quoted string literal.
    String(String),
    /// Integer literal.
    Int(i64),
    /// Bare enum value, e.g. `DESC`.
    Enum(String),
    /// Input object literal, e.g. `{ field: STARGAZERS, direction: DESC }`.
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Whether printing this value would produce something meaningless.
    fn is_blank(&self) -> bool {
        match self {
            Value::Enum(v) => v.is_empty(),
            Value::Object(entries) => entries.iter().all(|(k, v)| k.is_empty() || v.is_blank()),
            Value::String(_) | Value::Int(_) => false,
        }
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Value::String(s) => write_string_literal(out, s),
            Value::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Enum(e) => out.push_str(e),
            Value::Object(entries) => {
                out.push_str("{ ");
                let mut first = true;
                for (key, value) in entries {
                    if key.is_empty() || value.is_blank() {
                        continue;
                    }
                    if !first {
                        out.push_str(", ");
                    }
                    first = false;
                    out.push_str(key);
                    out.push_str(": ");
                    value.write_to(out);
                }
                out.push_str(" }");
            }
        }
    }
}

/// `name: value` inside a field's parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A field selection, optionally with arguments and a nested selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub arguments: Vec<Argument>,
    pub children: Vec<Selection>,
}

impl Selection {
    /// A leaf field.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Selection>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_child(mut self, child: Selection) -> Self {
        self.children.push(child);
        self
    }
}

/// An anonymous `query { ... }` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDocument {
    pub selections: Vec<Selection>,
}

impl QueryDocument {
    pub fn new(selections: Vec<Selection>) -> Self {
        Self { selections }
    }

    /// Print with two-space indentation and a trailing newline.
    ///
    /// Selections with an empty name are replaced by their children, and
    /// arguments with an empty name or blank value are dropped, so unresolved
    /// mappings shrink the query instead of corrupting it.
    pub fn render(&self) -> String {
        let mut out = String::from("query {\n");
        for selection in flatten(&self.selections) {
            write_selection(&mut out, &selection, 1);
        }
        out.push_str("}\n");
        out
    }
}

fn flatten(selections: &[Selection]) -> Vec<Selection> {
    let mut out = Vec::with_capacity(selections.len());
    for selection in selections {
        if selection.name.is_empty() {
            out.extend(flatten(&selection.children));
        } else {
            out.push(Selection {
                name: selection.name.clone(),
                arguments: selection
                    .arguments
                    .iter()
                    .filter(|a| !a.name.is_empty() && !a.value.is_blank())
                    .cloned()
                    .collect(),
                children: flatten(&selection.children),
            });
        }
    }
    out
}

fn write_selection(out: &mut String, selection: &Selection, depth: usize) {
    indent(out, depth);
    out.push_str(&selection.name);
    if !selection.arguments.is_empty() {
        out.push('(');
        for (i, argument) in selection.arguments.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&argument.name);
            out.push_str(": ");
            argument.value.write_to(out);
        }
        out.push(')');
    }
    if selection.children.is_empty() {
        out.push('\n');
        return;
    }
    out.push_str(" {\n");
    for child in &selection.children {
        write_selection(out, child, depth + 1);
    }
    indent(out, depth);
    out.push_str("}\n");
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

/// GraphQL `StringValue` escaping.
fn write_string_literal(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
