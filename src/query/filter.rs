//! Filter compilation
//!
//! Turns `(field, operator, value)` clauses into bool-query fragments and
//! accumulates them into a [`BoolQuery`].
//!
//! | operator | fragment | target |
//! |---|---|---|
//! | `is` | `match_phrase` (`wildcard` on wildcard fields) | filter |
//! | `is_not` | `match_phrase` | must_not |
//! | `is_one_of` | bool should of `match_phrase`, msm 1 | filter |
//! | `is_not_one_of` | bool should of `match_phrase`, msm 1 | must_not |
//! | `is_between` | `range {gte, lt}` | filter |
//! | `is_not_between` | `range {gte, lt}` | must_not |
//! | `exists` | `exists` | filter |
//! | `does_not_exist` | `exists` | must_not |

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::query::error::{QueryError, QueryResult};
use crate::query::request::BoolQuery;

/// One caller filter clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value,
        }
    }
}

/// Supported filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Is,
    IsNot,
    IsOneOf,
    IsNotOneOf,
    IsBetween,
    IsNotBetween,
    Exists,
    DoesNotExist,
}

/// Clause list a fragment is appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Filter,
    MustNot,
}

impl FilterOperator {
    /// Parse an operator name
    pub fn parse(s: &str) -> QueryResult<Self> {
        match s {
            "is" => Ok(Self::Is),
            "is_not" => Ok(Self::IsNot),
            "is_one_of" => Ok(Self::IsOneOf),
            "is_not_one_of" => Ok(Self::IsNotOneOf),
            "is_between" => Ok(Self::IsBetween),
            "is_not_between" => Ok(Self::IsNotBetween),
            "exists" => Ok(Self::Exists),
            "does_not_exist" | "does_not_exists" => Ok(Self::DoesNotExist),
            other => Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }

    pub fn target(self) -> Target {
        match self {
            Self::Is | Self::IsOneOf | Self::IsBetween | Self::Exists => Target::Filter,
            Self::IsNot | Self::IsNotOneOf | Self::IsNotBetween | Self::DoesNotExist => {
                Target::MustNot
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "is_not",
            Self::IsOneOf => "is_one_of",
            Self::IsNotOneOf => "is_not_one_of",
            Self::IsBetween => "is_between",
            Self::IsNotBetween => "is_not_between",
            Self::Exists => "exists",
            Self::DoesNotExist => "does_not_exist",
        }
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which data sources a composite dashboard query spans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMembership {
    #[serde(default)]
    pub agents: bool,
    #[serde(default)]
    pub devices: bool,
}

impl SourceMembership {
    /// Indices of the `should` branches a fragment belongs to
    fn branches(self) -> &'static [usize] {
        if self.agents && self.devices {
            &[0, 1]
        } else {
            &[0]
        }
    }
}

/// Where compiled fragments are accumulated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Accumulation {
    /// Top-level `filter` / `must_not`
    #[default]
    Direct,
    /// One or two `should` branches, per active source
    Composite(SourceMembership),
}

/// A compiled fragment and the clause list it goes to
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub target: Target,
    pub body: Value,
}

/// Compiles filter clauses into bool-query fragments
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler<'a> {
    wildcard_fields: &'a [String],
    accumulation: Accumulation,
    ignore_field: Option<&'a str>,
}

impl<'a> FilterCompiler<'a> {
    /// `is` on any of `wildcard_fields` compiles to a prefix wildcard
    pub fn new(wildcard_fields: &'a [String]) -> Self {
        Self {
            wildcard_fields,
            accumulation: Accumulation::Direct,
            ignore_field: None,
        }
    }

    pub fn accumulation(mut self, accumulation: Accumulation) -> Self {
        self.accumulation = accumulation;
        self
    }

    /// Skip every clause on `field`
    pub fn ignoring(mut self, field: Option<&'a str>) -> Self {
        self.ignore_field = field;
        self
    }

    /// Compile a single clause
    pub fn fragment(&self, clause: &FilterClause) -> QueryResult<Fragment> {
        let op = FilterOperator::parse(&clause.operator)?;
        let field = clause.field.as_str();

        let body = match op {
            FilterOperator::Is if self.is_wildcard_field(field) => {
                let prefix = scalar_text(&clause.value)
                    .ok_or_else(|| QueryError::invalid_value(field, op.as_str(), "expected a scalar"))?;
                json!({"wildcard": {field: {"value": format!("{}*", prefix)}}})
            }
            FilterOperator::Is | FilterOperator::IsNot => {
                if clause.value.is_array() || clause.value.is_object() {
                    return Err(QueryError::invalid_value(field, op.as_str(), "expected a scalar"));
                }
                json!({"match_phrase": {field: clause.value}})
            }
            FilterOperator::IsOneOf | FilterOperator::IsNotOneOf => {
                let values = clause
                    .value
                    .as_array()
                    .ok_or_else(|| QueryError::invalid_value(field, op.as_str(), "expected a list"))?;
                let should: Vec<Value> = values
                    .iter()
                    .map(|v| json!({"match_phrase": {field: v}}))
                    .collect();
                json!({"bool": {"should": should, "minimum_should_match": 1}})
            }
            FilterOperator::IsBetween | FilterOperator::IsNotBetween => match clause.value.as_array() {
                Some(pair) if pair.len() == 2 => {
                    json!({"range": {field: {"gte": pair[0], "lt": pair[1]}}})
                }
                _ => {
                    return Err(QueryError::invalid_value(
                        field,
                        op.as_str(),
                        "expected [low, high]",
                    ))
                }
            },
            FilterOperator::Exists | FilterOperator::DoesNotExist => {
                json!({"exists": {"field": field}})
            }
        };

        Ok(Fragment {
            target: op.target(),
            body,
        })
    }

    /// Compile every clause and append the fragments to `query`.
    ///
    /// Nothing is appended unless all clauses compile.
    pub fn apply(&self, clauses: &[FilterClause], query: &mut BoolQuery) -> QueryResult<()> {
        let fragments = clauses
            .iter()
            .filter(|clause| Some(clause.field.as_str()) != self.ignore_field)
            .map(|clause| self.fragment(clause))
            .collect::<QueryResult<Vec<_>>>()?;

        for fragment in fragments {
            match self.accumulation {
                Accumulation::Direct => push(query, fragment),
                Accumulation::Composite(membership) => {
                    for &index in membership.branches() {
                        push(query.should_branch(index), fragment.clone());
                    }
                    query.minimum_should_match = Some(1);
                }
            }
        }

        Ok(())
    }

    fn is_wildcard_field(&self, field: &str) -> bool {
        self.wildcard_fields.iter().any(|f| f == field)
    }
}

fn push(query: &mut BoolQuery, fragment: Fragment) {
    match fragment.target {
        Target::Filter => query.filter.push(fragment.body),
        Target::MustNot => query.must_not.push(fragment.body),
    }
}

/// Text form of a scalar JSON value
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
