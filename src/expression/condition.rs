use super::{
    path::{steps, Step},
    Placeholders,
};
use crate::item::Item;
use aws_sdk_dynamodb::types::AttributeValue;
use std::{cmp::Ordering, collections::HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn operator(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// A predicate over item attributes, used for conditional writes and filter expressions.
///
/// Conditions render into expression text through a request's [`Placeholders`], so attribute
/// names are always aliased and values always bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        path: String,
        op: Comparison,
        value: AttributeValue,
    },
    Between {
        path: String,
        low: AttributeValue,
        high: AttributeValue,
    },
    BeginsWith {
        path: String,
        prefix: AttributeValue,
    },
    Contains {
        path: String,
        operand: AttributeValue,
    },
    Exists(String),
    NotExists(String),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(path: impl Into<String>, op: Comparison, value: AttributeValue) -> Self {
        Self::Compare {
            path: path.into(),
            op,
            value,
        }
    }

    pub fn eq(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(path, Comparison::Eq, value)
    }

    pub fn ne(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(path, Comparison::Ne, value)
    }

    pub fn lt(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(path, Comparison::Lt, value)
    }

    pub fn le(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(path, Comparison::Le, value)
    }

    pub fn gt(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(path, Comparison::Gt, value)
    }

    pub fn ge(path: impl Into<String>, value: AttributeValue) -> Self {
        Self::compare(path, Comparison::Ge, value)
    }

    pub fn between(path: impl Into<String>, low: AttributeValue, high: AttributeValue) -> Self {
        Self::Between {
            path: path.into(),
            low,
            high,
        }
    }

    pub fn begins_with(path: impl Into<String>, prefix: AttributeValue) -> Self {
        Self::BeginsWith {
            path: path.into(),
            prefix,
        }
    }

    pub fn contains(path: impl Into<String>, operand: AttributeValue) -> Self {
        Self::Contains {
            path: path.into(),
            operand,
        }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Self::Exists(path.into())
    }

    pub fn not_exists(path: impl Into<String>) -> Self {
        Self::NotExists(path.into())
    }

    pub fn and(self, other: Condition) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Render to expression text, binding names and values in `placeholders`
    pub fn render(&self, placeholders: &mut Placeholders) -> String {
        match self {
            Self::Compare { path, op, value } => {
                let path = placeholders.path(path);
                let value = placeholders.value(value.clone());
                format!("{path} {} {value}", op.operator())
            }
            Self::Between { path, low, high } => {
                let path = placeholders.path(path);
                let low = placeholders.value(low.clone());
                let high = placeholders.value(high.clone());
                format!("{path} BETWEEN {low} AND {high}")
            }
            Self::BeginsWith { path, prefix } => {
                let path = placeholders.path(path);
                let prefix = placeholders.value(prefix.clone());
                format!("begins_with({path}, {prefix})")
            }
            Self::Contains { path, operand } => {
                let path = placeholders.path(path);
                let operand = placeholders.value(operand.clone());
                format!("contains({path}, {operand})")
            }
            Self::Exists(path) => format!("attribute_exists({})", placeholders.path(path)),
            Self::NotExists(path) => format!("attribute_not_exists({})", placeholders.path(path)),
            Self::And(left, right) => {
                let left = left.render_operand(placeholders, "AND");
                let right = right.render_operand(placeholders, "AND");
                format!("{left} AND {right}")
            }
            Self::Or(left, right) => {
                let left = left.render_operand(placeholders, "OR");
                let right = right.render_operand(placeholders, "OR");
                format!("{left} OR {right}")
            }
            Self::Not(inner) => format!("NOT {}", inner.render_operand(placeholders, "NOT")),
        }
    }

    /// Parenthesize compound operands unless they repeat the parent's operator
    fn render_operand(&self, placeholders: &mut Placeholders, parent: &str) -> String {
        let rendered = self.render(placeholders);
        match (self, parent) {
            (Self::And(..), "AND") | (Self::Or(..), "OR") => rendered,
            (Self::And(..) | Self::Or(..) | Self::Not(..), _) => format!("({rendered})"),
            _ => rendered,
        }
    }

    /// Evaluate against an item. A missing attribute makes every comparison false.
    pub fn evaluate(&self, item: &Item) -> bool {
        let attributes = item.attributes();

        match self {
            Self::Compare { path, op, value } => match resolve(attributes, path) {
                None => false,
                Some(actual) => match compare(actual, value) {
                    Some(ordering) => op.holds(ordering),
                    None => *op == Comparison::Ne,
                },
            },
            Self::Between { path, low, high } => resolve(attributes, path).is_some_and(|actual| {
                matches!(compare(actual, low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(actual, high), Some(Ordering::Less | Ordering::Equal))
            }),
            Self::BeginsWith { path, prefix } => {
                match (resolve(attributes, path), prefix) {
                    (Some(AttributeValue::S(actual)), AttributeValue::S(prefix)) => {
                        actual.starts_with(prefix.as_str())
                    }
                    (Some(AttributeValue::B(actual)), AttributeValue::B(prefix)) => {
                        actual.as_ref().starts_with(prefix.as_ref())
                    }
                    _ => false,
                }
            }
            Self::Contains { path, operand } => match (resolve(attributes, path), operand) {
                (Some(AttributeValue::S(actual)), AttributeValue::S(needle)) => {
                    actual.contains(needle.as_str())
                }
                (Some(AttributeValue::Ss(set)), AttributeValue::S(needle)) => set.contains(needle),
                (Some(AttributeValue::Ns(set)), AttributeValue::N(needle)) => set
                    .iter()
                    .any(|member| compare_numbers(member, needle) == Some(Ordering::Equal)),
                (Some(AttributeValue::L(list)), needle) => list.contains(needle),
                _ => false,
            },
            Self::Exists(path) => resolve(attributes, path).is_some(),
            Self::NotExists(path) => resolve(attributes, path).is_none(),
            Self::And(left, right) => left.evaluate(item) && right.evaluate(item),
            Self::Or(left, right) => left.evaluate(item) || right.evaluate(item),
            Self::Not(inner) => !inner.evaluate(item),
        }
    }
}

impl std::ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Self::Output {
        Condition::Not(Box::new(self))
    }
}

/// A condition on the sort key inside a query's partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyCondition {
    Eq(String),
    Lt(String),
    Le(String),
    Gt(String),
    Ge(String),
    Between(String, String),
    BeginsWith(String),
}

impl SortKeyCondition {
    pub fn eq(value: impl Into<String>) -> Self {
        Self::Eq(value.into())
    }

    pub fn lt(value: impl Into<String>) -> Self {
        Self::Lt(value.into())
    }

    pub fn le(value: impl Into<String>) -> Self {
        Self::Le(value.into())
    }

    pub fn gt(value: impl Into<String>) -> Self {
        Self::Gt(value.into())
    }

    pub fn ge(value: impl Into<String>) -> Self {
        Self::Ge(value.into())
    }

    pub fn between(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self::Between(low.into(), high.into())
    }

    pub fn begins_with(prefix: impl Into<String>) -> Self {
        Self::BeginsWith(prefix.into())
    }

    /// The same predicate as a [`Condition`] on the attribute `sort_key`
    pub fn to_condition(&self, sort_key: &str) -> Condition {
        let s = |value: &String| AttributeValue::S(value.clone());

        match self {
            Self::Eq(value) => Condition::eq(sort_key, s(value)),
            Self::Lt(value) => Condition::lt(sort_key, s(value)),
            Self::Le(value) => Condition::le(sort_key, s(value)),
            Self::Gt(value) => Condition::gt(sort_key, s(value)),
            Self::Ge(value) => Condition::ge(sort_key, s(value)),
            Self::Between(low, high) => Condition::between(sort_key, s(low), s(high)),
            Self::BeginsWith(prefix) => Condition::begins_with(sort_key, s(prefix)),
        }
    }

    pub fn matches(&self, sort_key: &str) -> bool {
        match self {
            Self::Eq(value) => sort_key == value,
            Self::Lt(value) => sort_key < value.as_str(),
            Self::Le(value) => sort_key <= value.as_str(),
            Self::Gt(value) => sort_key > value.as_str(),
            Self::Ge(value) => sort_key >= value.as_str(),
            Self::Between(low, high) => low.as_str() <= sort_key && sort_key <= high.as_str(),
            Self::BeginsWith(prefix) => sort_key.starts_with(prefix.as_str()),
        }
    }
}

/// Follow a document path through nested maps and lists
pub(crate) fn resolve<'a>(
    attributes: &'a HashMap<String, AttributeValue>,
    path: &str,
) -> Option<&'a AttributeValue> {
    let steps = steps(path)?;
    let (Step::Attribute(name), rest) = steps.split_first()? else {
        return None;
    };

    rest.iter()
        .try_fold(attributes.get(*name)?, |current, step| match step {
            Step::Attribute(name) => current.as_m().ok()?.get(*name),
            Step::Index(index) => current.as_l().ok()?.get(*index),
        })
}

/// Order two values of the same scalar type; `None` when they are not comparable
fn compare(left: &AttributeValue, right: &AttributeValue) -> Option<Ordering> {
    match (left, right) {
        (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.cmp(b)),
        (AttributeValue::N(a), AttributeValue::N(b)) => compare_numbers(a, b),
        (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.as_ref().cmp(b.as_ref())),
        (AttributeValue::Bool(a), AttributeValue::Bool(b)) if a == b => Some(Ordering::Equal),
        (AttributeValue::Bool(_), AttributeValue::Bool(_)) => None,
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

pub(crate) fn compare_numbers(a: &str, b: &str) -> Option<Ordering> {
    let a: f64 = a.parse().ok()?;
    let b: f64 = b.parse().ok()?;
    a.partial_cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> AttributeValue {
        AttributeValue::S(value.to_string())
    }

    fn n(value: &str) -> AttributeValue {
        AttributeValue::N(value.to_string())
    }

    fn video() -> Item {
        [
            ("pk", s("user#1")),
            ("sk", s("vid#2024")),
            ("title", s("Rust in production")),
            ("views", n("10")),
            ("tags", AttributeValue::Ss(vec!["rust".into(), "db".into()])),
            (
                "meta",
                AttributeValue::M(HashMap::from([("lang".to_string(), s("en"))])),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn renders_guard_for_new_items() {
        let mut placeholders = Placeholders::new();
        let guard = Condition::not_exists("pk").and(Condition::not_exists("sk"));

        assert_eq!(
            guard.render(&mut placeholders),
            "attribute_not_exists(#A) AND attribute_not_exists(#B)"
        );
        assert_eq!(placeholders.names().get("#B").map(String::as_str), Some("sk"));
        assert!(placeholders.values().is_empty());
    }

    #[test]
    fn renders_nested_logic_with_parentheses() {
        let mut placeholders = Placeholders::new();
        let condition = Condition::gt("views", n("5"))
            .and(Condition::eq("lang", s("en")).or(Condition::exists("draft")))
            .and(!Condition::contains("tags", s("spam")));

        assert_eq!(
            condition.render(&mut placeholders),
            "#A > :A AND (#B = :B OR attribute_exists(#C)) AND (NOT contains(#D, :C))"
        );
        assert_eq!(placeholders.values().len(), 3);
    }

    #[test]
    fn renders_between_and_prefix() {
        let mut placeholders = Placeholders::new();

        assert_eq!(
            Condition::between("views", n("1"), n("9")).render(&mut placeholders),
            "#A BETWEEN :A AND :B"
        );
        assert_eq!(
            Condition::begins_with("meta.lang", s("e")).render(&mut placeholders),
            "begins_with(#B.#C, :C)"
        );
    }

    #[test]
    fn evaluates_against_items() {
        let item = video();

        assert!(Condition::eq("title", s("Rust in production")).evaluate(&item));
        assert!(Condition::gt("views", n("9.5")).evaluate(&item));
        assert!(!Condition::lt("views", n("10")).evaluate(&item));
        assert!(Condition::between("views", n("10"), n("20")).evaluate(&item));
        assert!(Condition::begins_with("sk", s("vid#")).evaluate(&item));
        assert!(Condition::contains("title", s("production")).evaluate(&item));
        assert!(Condition::contains("tags", s("rust")).evaluate(&item));
        assert!(Condition::eq("meta.lang", s("en")).evaluate(&item));
        assert!(Condition::exists("meta.lang").evaluate(&item));
        assert!(Condition::not_exists("draft").evaluate(&item));
        assert!(!Condition::eq("views", s("10")).evaluate(&item));
        assert!(Condition::ne("views", s("10")).evaluate(&item));
        assert!(!Condition::ne("missing", s("x")).evaluate(&item));
        assert!((!Condition::exists("draft")).evaluate(&item));
        assert!(Condition::exists("draft")
            .or(Condition::exists("title"))
            .evaluate(&item));
    }

    #[test]
    fn list_indexes_address_elements() {
        let item = video().with(
            "comments",
            AttributeValue::L(vec![
                s("first"),
                AttributeValue::M(HashMap::from([("author".to_string(), s("ann"))])),
            ]),
        );

        assert!(Condition::eq("comments[0]", s("first")).evaluate(&item));
        assert!(Condition::eq("comments[1].author", s("ann")).evaluate(&item));
        assert!(Condition::not_exists("comments[2]").evaluate(&item));
        assert!(Condition::not_exists("tags[0]").evaluate(&item));

        let mut placeholders = Placeholders::new();
        assert_eq!(
            Condition::eq("comments[1].author", s("ann")).render(&mut placeholders),
            "#A[1].#B = :A"
        );
        assert_eq!(placeholders.names().get("#A").map(String::as_str), Some("comments"));
    }

    #[test]
    fn guard_fails_for_existing_item() {
        let guard = Condition::not_exists("pk").and(Condition::not_exists("sk"));

        assert!(!guard.evaluate(&video()));
        assert!(guard.evaluate(&Item::default()));
    }

    #[test]
    fn sort_key_conditions_match_and_convert() {
        let sk = "vid#2024:01:02";

        assert!(SortKeyCondition::begins_with("vid#").matches(sk));
        assert!(!SortKeyCondition::begins_with("pst#").matches(sk));
        assert!(SortKeyCondition::between("vid#2024:01:01", "vid#2024:12:31").matches(sk));
        assert!(SortKeyCondition::lt("vid#2025").matches(sk));
        assert!(SortKeyCondition::ge(sk).matches(sk));
        assert!(!SortKeyCondition::gt(sk).matches(sk));

        assert_eq!(
            SortKeyCondition::begins_with("vid#").to_condition("sk"),
            Condition::begins_with("sk", s("vid#"))
        );
    }
}
