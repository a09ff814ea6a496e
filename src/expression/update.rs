use super::{
    path::{split_segment, steps, Step},
    Placeholders,
};
use crate::errors::ExpressionError;
use aws_sdk_dynamodb::types::AttributeValue;
use itertools::Itertools;
use std::{collections::HashMap, fmt::Display, str::FromStr};

const CLAUSE_KEYWORDS: [&str; 4] = ["SET", "ADD", "REMOVE", "DELETE"];

/// The kind of an in-place mutation. `FromStr` accepts the wire names used by
/// externally supplied payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Set,
    ListAppend,
    AddNumber,
    Remove,
    DeleteFromSet,
}

impl DirectiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::ListAppend => "LIST_APPEND",
            Self::AddNumber => "ADD",
            Self::Remove => "REMOVE",
            Self::DeleteFromSet => "DELETE",
        }
    }

    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::Remove)
    }

    fn clause(&self) -> Clause {
        match self {
            Self::Set | Self::ListAppend => Clause::Set,
            Self::AddNumber => Clause::Add,
            Self::Remove => Clause::Remove,
            Self::DeleteFromSet => Clause::Delete,
        }
    }
}

impl Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectiveKind {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SET" => Ok(Self::Set),
            "LIST_APPEND" => Ok(Self::ListAppend),
            "ADD" => Ok(Self::AddNumber),
            "REMOVE" => Ok(Self::Remove),
            "DELETE" => Ok(Self::DeleteFromSet),
            other => Err(ExpressionError::InvalidDirective(format!(
                "unknown directive kind '{other}'"
            ))),
        }
    }
}

/// One mutation of an existing item
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `path = :X`, or `path = if_not_exists(path, :X)` when `overwrite` is false
    Set {
        path: String,
        value: AttributeValue,
        overwrite: bool,
    },
    /// `path = list_append(path, :X)`
    ListAppend { path: String, value: AttributeValue },
    /// `ADD path :X`
    AddNumber { path: String, value: AttributeValue },
    /// `REMOVE path`
    Remove { path: String },
    /// `DELETE path :X`
    DeleteFromSet { path: String, value: AttributeValue },
}

impl Directive {
    pub fn set(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::Set {
            path: path.into(),
            value,
            overwrite: true,
        }
    }

    pub fn set_if_missing(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::Set {
            path: path.into(),
            value,
            overwrite: false,
        }
    }

    pub fn list_append(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::ListAppend {
            path: path.into(),
            value,
        }
    }

    pub fn add(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::AddNumber {
            path: path.into(),
            value,
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::Remove { path: path.into() }
    }

    pub fn delete_from_set(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::DeleteFromSet {
            path: path.into(),
            value,
        }
    }

    /// Build and validate a directive from its parts
    pub fn new(
        kind: DirectiveKind,
        path: impl Into<String>,
        value: Option<AttributeValue>,
        overwrite: bool,
    ) -> Result<Self, ExpressionError> {
        let path = path.into();

        let directive = match (kind, value) {
            (DirectiveKind::Remove, None) => Self::Remove { path },
            (DirectiveKind::Remove, Some(_)) => {
                return Err(ExpressionError::InvalidDirective(format!(
                    "REMOVE on '{path}' does not take a value"
                )))
            }
            (kind, None) => {
                return Err(ExpressionError::InvalidDirective(format!(
                    "{kind} on '{path}' requires a value"
                )))
            }
            (DirectiveKind::Set, Some(value)) => Self::Set {
                path,
                value,
                overwrite,
            },
            (DirectiveKind::ListAppend, Some(value)) => Self::ListAppend { path, value },
            (DirectiveKind::AddNumber, Some(value)) => Self::AddNumber { path, value },
            (DirectiveKind::DeleteFromSet, Some(value)) => Self::DeleteFromSet { path, value },
        };

        directive.validate()?;
        Ok(directive)
    }

    /// Read a directive from an externally supplied payload of the shape
    /// `{"utype": "SET", "path": "title", "value": "x", "overwrite": true}`.
    pub fn from_json(payload: &serde_json::Value) -> Result<Self, ExpressionError> {
        let invalid = |message: &str| ExpressionError::InvalidDirective(message.to_string());

        let kind: DirectiveKind = payload
            .get("utype")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| invalid("missing 'utype'"))?
            .parse()?;

        let path = payload
            .get("path")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| invalid("missing 'path'"))?;

        let overwrite = payload
            .get("overwrite")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        let value = match payload.get("value") {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => {
                let value: AttributeValue = serde_dynamo::to_attribute_value(value)
                    .map_err(|e| ExpressionError::InvalidDirective(e.to_string()))?;

                Some(match kind {
                    DirectiveKind::DeleteFromSet => list_to_set(value),
                    _ => value,
                })
            }
        };

        Self::new(kind, path, value, overwrite)
    }

    pub fn kind(&self) -> DirectiveKind {
        match self {
            Self::Set { .. } => DirectiveKind::Set,
            Self::ListAppend { .. } => DirectiveKind::ListAppend,
            Self::AddNumber { .. } => DirectiveKind::AddNumber,
            Self::Remove { .. } => DirectiveKind::Remove,
            Self::DeleteFromSet { .. } => DirectiveKind::DeleteFromSet,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. }
            | Self::ListAppend { path, .. }
            | Self::AddNumber { path, .. }
            | Self::Remove { path }
            | Self::DeleteFromSet { path, .. } => path,
        }
    }

    pub fn value(&self) -> Option<&AttributeValue> {
        match self {
            Self::Set { value, .. }
            | Self::ListAppend { value, .. }
            | Self::AddNumber { value, .. }
            | Self::DeleteFromSet { value, .. } => Some(value),
            Self::Remove { .. } => None,
        }
    }

    /// Check the path is a well formed document path and the value type suits the
    /// directive kind. Sets must not be empty.
    pub fn validate(&self) -> Result<(), ExpressionError> {
        let path = self.path();
        let kind = self.kind();

        if !is_valid_path(path) {
            return Err(ExpressionError::InvalidDirective(format!(
                "'{path}' is not a valid attribute path"
            )));
        }

        if self.value().is_some_and(is_empty_set) {
            return Err(ExpressionError::InvalidDirective(format!(
                "{kind} on '{path}' has an empty set"
            )));
        }

        let value_ok = match self {
            Self::AddNumber { value, .. } => value.is_n(),
            Self::ListAppend { value, .. } => value.is_l(),
            Self::DeleteFromSet { value, .. } => value.is_ss() || value.is_ns() || value.is_bs(),
            Self::Set { .. } | Self::Remove { .. } => true,
        };

        if value_ok {
            Ok(())
        } else {
            Err(ExpressionError::InvalidDirective(format!(
                "{kind} on '{path}' has a value of the wrong type"
            )))
        }
    }

    fn render(&self, placeholders: &mut Placeholders) -> String {
        let path = placeholders.path(self.path());
        let value = self.value().map(|value| placeholders.value(value.clone()));

        match (self, value) {
            (Self::Set { overwrite: true, .. }, Some(value)) => format!("{path} = {value}"),
            (Self::Set { .. }, Some(value)) => {
                format!("{path} = if_not_exists({path}, {value})")
            }
            (Self::ListAppend { .. }, Some(value)) => {
                format!("{path} = list_append({path}, {value})")
            }
            (_, Some(value)) => format!("{path} {value}"),
            (_, None) => path,
        }
    }
}

/// A rendered update expression with the names and values its placeholders are bound to
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    /// Render `directives` into one expression. Sub-clauses are grouped under
    /// `SET`, `ADD`, `REMOVE` and `DELETE` (in that order, empty groups omitted) and keep
    /// their relative order inside each group. Every value-bearing directive takes the
    /// next placeholder token in input order, and every attribute name is aliased.
    pub fn build<'d>(
        directives: impl IntoIterator<Item = &'d Directive>,
    ) -> Result<Self, ExpressionError> {
        let mut placeholders = Placeholders::new();
        let mut groups: [Vec<String>; 4] = Default::default();

        for directive in directives {
            directive.validate()?;
            let rendered = directive.render(&mut placeholders);
            groups[directive.kind().clause() as usize].push(rendered);
        }

        if groups.iter().all(Vec::is_empty) {
            return Err(ExpressionError::InvalidDirective(
                "an update needs at least one directive".to_string(),
            ));
        }

        let expression = CLAUSE_KEYWORDS
            .iter()
            .zip(groups.iter())
            .filter(|(_, clauses)| !clauses.is_empty())
            .map(|(keyword, clauses)| format!("{keyword} {}", clauses.join(", ")))
            .join(" ");

        let (names, values) = placeholders.into_parts();

        Ok(Self {
            expression,
            names: names.unwrap_or_default(),
            values: values.unwrap_or_default(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    pub fn values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    /// Parse the rendered expression back into directives, resolving every placeholder
    /// through the name and value tables. Directives come back in clause order.
    pub fn directives(&self) -> Result<Vec<Directive>, ExpressionError> {
        let mut sections: Vec<(Clause, Vec<&str>)> = Vec::new();

        for word in self.expression.split_whitespace() {
            match Clause::from_keyword(word) {
                Some(clause) if sections.iter().any(|(seen, _)| *seen == clause) => {
                    return Err(parse_error(format!("clause {word} appears twice")));
                }
                Some(clause) => sections.push((clause, Vec::new())),
                None => sections
                    .last_mut()
                    .ok_or_else(|| parse_error(format!("expected a clause keyword, got '{word}'")))?
                    .1
                    .push(word),
            }
        }

        let mut directives = Vec::new();

        for (clause, words) in sections {
            let text = words.join(" ");
            if text.is_empty() {
                return Err(parse_error("empty clause".to_string()));
            }

            for part in split_top_level(&text) {
                directives.push(self.parse_clause(clause, part.trim())?);
            }
        }

        Ok(directives)
    }

    fn parse_clause(&self, clause: Clause, text: &str) -> Result<Directive, ExpressionError> {
        match clause {
            Clause::Set => {
                let (path, rhs) = text
                    .split_once(" = ")
                    .ok_or_else(|| parse_error(format!("expected 'path = value' in '{text}'")))?;

                let name = self.dereference(path)?;

                if let Some(token) = function_argument(rhs, "if_not_exists", path)? {
                    Ok(Directive::set_if_missing(name, self.resolve(token)?))
                } else if let Some(token) = function_argument(rhs, "list_append", path)? {
                    Ok(Directive::list_append(name, self.resolve(token)?))
                } else {
                    Ok(Directive::set(name, self.resolve(rhs)?))
                }
            }
            Clause::Add | Clause::Delete => {
                let (path, token) = text
                    .split_whitespace()
                    .collect_tuple()
                    .ok_or_else(|| parse_error(format!("expected 'path :value' in '{text}'")))?;
                let name = self.dereference(path)?;
                let value = self.resolve(token)?;

                Ok(if clause == Clause::Add {
                    Directive::add(name, value)
                } else {
                    Directive::delete_from_set(name, value)
                })
            }
            Clause::Remove => {
                if text.contains(char::is_whitespace) {
                    return Err(parse_error(format!("expected a single path in '{text}'")));
                }
                Ok(Directive::remove(self.dereference(text)?))
            }
        }
    }

    /// Replace every `#X` alias in a rendered path with the attribute name it stands for
    fn dereference(&self, path: &str) -> Result<String, ExpressionError> {
        let segments = path
            .split('.')
            .map(|segment| {
                let (alias, indexes) = split_segment(segment);
                if !alias.starts_with('#') {
                    return Err(parse_error(format!("'{alias}' is not a name placeholder")));
                }

                self.names
                    .get(alias)
                    .map(|name| format!("{name}{indexes}"))
                    .ok_or_else(|| ExpressionError::MissingPlaceholder(alias.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(segments.join("."))
    }

    fn resolve(&self, token: &str) -> Result<AttributeValue, ExpressionError> {
        let token = token.trim();
        if !token.starts_with(':') {
            return Err(parse_error(format!("'{token}' is not a value placeholder")));
        }

        self.values
            .get(token)
            .cloned()
            .ok_or_else(|| ExpressionError::MissingPlaceholder(token.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Set = 0,
    Add = 1,
    Remove = 2,
    Delete = 3,
}

impl Clause {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "SET" => Some(Self::Set),
            "ADD" => Some(Self::Add),
            "REMOVE" => Some(Self::Remove),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

fn parse_error(message: String) -> ExpressionError {
    ExpressionError::Parse(message)
}

/// Attribute names are aliased, so any word is allowed, but names are limited to
/// alphanumerics, `_` and `-`.
fn is_valid_path(path: &str) -> bool {
    steps(path).is_some_and(|steps| {
        steps.iter().all(|step| match step {
            Step::Attribute(name) => name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-')),
            Step::Index(_) => true,
        })
    })
}

pub(crate) fn is_empty_set(value: &AttributeValue) -> bool {
    match value {
        AttributeValue::Ss(set) => set.is_empty(),
        AttributeValue::Ns(set) => set.is_empty(),
        AttributeValue::Bs(set) => set.is_empty(),
        _ => false,
    }
}

/// Split on commas outside parentheses
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// For `name(path, :X)` return `:X`; `None` when `rhs` is not a call to `name`
fn function_argument<'a>(
    rhs: &'a str,
    name: &str,
    path: &str,
) -> Result<Option<&'a str>, ExpressionError> {
    let Some(arguments) = rhs
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return Ok(None);
    };

    let (target, token) = arguments
        .split_once(',')
        .ok_or_else(|| parse_error(format!("{name} takes two arguments")))?;

    if target.trim() != path {
        return Err(parse_error(format!(
            "{name} must reference '{path}', found '{}'",
            target.trim()
        )));
    }

    Ok(Some(token.trim()))
}

fn list_to_set(value: AttributeValue) -> AttributeValue {
    let AttributeValue::L(list) = value else {
        return value;
    };

    if list.iter().all(AttributeValue::is_s) {
        AttributeValue::Ss(
            list.into_iter()
                .filter_map(|v| v.as_s().ok().cloned())
                .collect(),
        )
    } else if list.iter().all(AttributeValue::is_n) {
        AttributeValue::Ns(
            list.into_iter()
                .filter_map(|v| v.as_n().ok().cloned())
                .collect(),
        )
    } else {
        AttributeValue::L(list)
    }
}
