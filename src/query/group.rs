//! Filter groups
//!
//! A filter group is a list of clauses joined by `ALL` or `ANY`. Each group
//! compiles into one bool fragment plus a query-string label; the label doubles
//! as the bucket key when groups drive a `filters` aggregation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::query::error::{QueryError, QueryResult};
use crate::query::filter::{scalar_text, FilterClause};

/// Clauses joined by a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default = "default_condition")]
    pub condition: String,
}

fn default_condition() -> String {
    "ALL".to_string()
}

/// How the clauses of a group are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCondition {
    All,
    Any,
}

impl GroupCondition {
    pub fn parse(s: &str) -> QueryResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "ANY" => Ok(Self::Any),
            _ => Err(QueryError::UnsupportedCondition(s.to_string())),
        }
    }

    fn joiner(self) -> &'static str {
        match self {
            Self::All => " AND ",
            Self::Any => " OR ",
        }
    }
}

/// Operators understood inside filter groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupOperator {
    Is,
    IsNot,
    IsOneOf,
    IsNotOneOf,
    Exists,
    DoesNotExist,
    Regex,
}

impl GroupOperator {
    /// Case-insensitive; underscores and spaces are interchangeable
    fn parse(s: &str) -> QueryResult<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', " ");
        match normalized.as_str() {
            "is" => Ok(Self::Is),
            "is not" => Ok(Self::IsNot),
            "is one of" => Ok(Self::IsOneOf),
            "is not one of" => Ok(Self::IsNotOneOf),
            "exists" => Ok(Self::Exists),
            "does not exist" | "does not exists" => Ok(Self::DoesNotExist),
            "regex" => Ok(Self::Regex),
            _ => Err(QueryError::UnsupportedOperator(s.to_string())),
        }
    }
}

/// A compiled group
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledGroup {
    pub fragment: Value,
    pub label: String,
}

/// Compile one group into a bool fragment and its label
pub fn compile_group(group: &FilterGroup) -> QueryResult<CompiledGroup> {
    let condition = GroupCondition::parse(&group.condition)?;

    let mut clauses = Vec::with_capacity(group.filters.len());
    let mut labels = Vec::with_capacity(group.filters.len());
    for clause in &group.filters {
        let (fragment, label) = compile_clause(clause)?;
        clauses.push(fragment);
        labels.push(label);
    }

    let fragment = match condition {
        GroupCondition::All => json!({"bool": {"must": clauses}}),
        GroupCondition::Any => json!({"bool": {"should": clauses, "minimum_should_match": 1}}),
    };

    Ok(CompiledGroup {
        fragment,
        label: labels.join(condition.joiner()),
    })
}

/// Compile a list of groups, failing on the first bad one
pub fn build_filter_groups(groups: &[FilterGroup]) -> QueryResult<Vec<CompiledGroup>> {
    groups.iter().map(compile_group).collect()
}

fn compile_clause(clause: &FilterClause) -> QueryResult<(Value, String)> {
    let field = clause.field.as_str();
    let op = GroupOperator::parse(&clause.operator)?;
    let scalar = || {
        scalar_text(&clause.value)
            .ok_or_else(|| QueryError::invalid_value(field, &clause.operator, "expected a scalar"))
    };

    Ok(match op {
        GroupOperator::Is => (
            json!({"match_phrase": {field: clause.value}}),
            format!("{}:{}", field, quote(&scalar()?)),
        ),
        GroupOperator::IsNot => (
            json!({"bool": {"must_not": {"match_phrase": {field: clause.value}}}}),
            format!("NOT {}:{}", field, quote(&scalar()?)),
        ),
        GroupOperator::IsOneOf | GroupOperator::IsNotOneOf => {
            let values = clause
                .value
                .as_array()
                .ok_or_else(|| QueryError::invalid_value(field, &clause.operator, "expected a list"))?;
            let terms = values
                .iter()
                .map(|v| {
                    scalar_text(v).map(|s| quote(&s)).ok_or_else(|| {
                        QueryError::invalid_value(field, &clause.operator, "expected scalar items")
                    })
                })
                .collect::<QueryResult<Vec<_>>>()?;
            let qs = format!("{}:({})", field, terms.join(" OR "));
            let query_string = json!({"query_string": {"query": qs}});

            if op == GroupOperator::IsOneOf {
                (query_string, qs)
            } else {
                (
                    json!({"bool": {"must_not": query_string}}),
                    format!("NOT ({})", qs),
                )
            }
        }
        GroupOperator::Exists => (
            json!({"exists": {"field": field}}),
            format!("_exists_:{}", field),
        ),
        GroupOperator::DoesNotExist => (
            json!({"bool": {"must_not": {"exists": {"field": field}}}}),
            format!("NOT _exists_:{}", field),
        ),
        GroupOperator::Regex => {
            let pattern = scalar()?;
            (
                json!({"regexp": {field: pattern}}),
                format!("{}:/{}/", field, pattern),
            )
        }
    })
}

/// Quote query-string terms containing whitespace or quotes
fn quote(term: &str) -> String {
    if term.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", term.replace('"', "\\\""))
    } else {
        term.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(condition: &str, filters: Vec<FilterClause>) -> FilterGroup {
        FilterGroup {
            filters,
            condition: condition.to_string(),
        }
    }

    #[test]
    fn test_all_group() {
        let compiled = compile_group(&group(
            "ALL",
            vec![
                FilterClause::new("status", "is one of", json!(["open", "closed"])),
                FilterClause::new("user", "exists", Value::Null),
            ],
        ))
        .unwrap();

        assert_eq!(compiled.label, "status:(open OR closed) AND _exists_:user");
        assert_eq!(
            compiled.fragment,
            json!({"bool": {"must": [
                {"query_string": {"query": "status:(open OR closed)"}},
                {"exists": {"field": "user"}}
            ]}})
        );
    }

    #[test]
    fn test_any_group() {
        let compiled = compile_group(&group(
            "any",
            vec![
                FilterClause::new("host", "regex", json!("web-[0-9]+")),
                FilterClause::new("error", "does_not_exist", Value::Null),
            ],
        ))
        .unwrap();

        assert_eq!(compiled.label, "host:/web-[0-9]+/ OR NOT _exists_:error");
        assert_eq!(compiled.fragment["bool"]["minimum_should_match"], 1);
        assert_eq!(
            compiled.fragment["bool"]["should"][0],
            json!({"regexp": {"host": "web-[0-9]+"}})
        );
        assert_eq!(
            compiled.fragment["bool"]["should"][1],
            json!({"bool": {"must_not": {"exists": {"field": "error"}}}})
        );
    }

    #[test]
    fn test_is_not_one_of_wraps_must_not() {
        let compiled = compile_group(&group(
            "ALL",
            vec![FilterClause::new("level", "is not one of", json!(["debug", 3]))],
        ))
        .unwrap();

        assert_eq!(compiled.label, "NOT (level:(debug OR 3))");
        assert_eq!(
            compiled.fragment["bool"]["must"][0],
            json!({"bool": {"must_not": {"query_string": {"query": "level:(debug OR 3)"}}}})
        );
    }

    #[test]
    fn test_is_and_is_not_labels_quote_whitespace() {
        let compiled = compile_group(&group(
            "ALL",
            vec![
                FilterClause::new("city", "is", json!("New York")),
                FilterClause::new("country", "is_not", json!("PK")),
            ],
        ))
        .unwrap();
        assert_eq!(compiled.label, "city:\"New York\" AND NOT country:PK");
    }

    #[test]
    fn test_default_condition_is_all() {
        let group: FilterGroup =
            serde_json::from_value(json!({"filters": [{"field": "a", "operator": "exists"}]}))
                .unwrap();
        assert_eq!(group.condition, "ALL");
        assert!(compile_group(&group).is_ok());
    }

    #[test]
    fn test_unsupported_condition() {
        let err = compile_group(&group("SOME", vec![])).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedCondition(c) if c == "SOME"));
    }

    #[test]
    fn test_unsupported_group_operator() {
        let err = build_filter_groups(&[group(
            "ALL",
            vec![FilterClause::new("a", "greater than", json!(1))],
        )])
        .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperator(_)));
    }
}
