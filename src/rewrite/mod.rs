//! Query-text rewriting: positional-to-named conversion and array-parameter
//! expansion.
//!
//! The underlying protocol only knows named parameters, so `?` placeholders
//! are converted to synthesized `@p<index>` names, and an array value such as
//!
//! ```sql
//! WHERE foo IN (@foo)
//! ```
//!
//! is unrolled into
//!
//! ```sql
//! WHERE foo IN (@foo0, @foo1)
//! ```
//!
//! with one synthesized parameter per element. Substitution goes through a
//! placeholder scanner that matches whole tokens only and skips string
//! literals, quoted identifiers and comments, so `@foo` never corrupts an
//! unrelated `@foobar`.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::query::{ParamValues, Parameter, Query};
use crate::types::SqlValue;

pub(crate) mod scanner;

use scanner::TokenKind;

/// Rewrite a query's text and parameters in place.
///
/// No-op when the query has no parameters. Afterwards the query's values are
/// always in named mode, with every array value expanded; rewriting an
/// already-rewritten query changes nothing.
pub fn rewrite(query: &mut Query) {
    let Some(values) = query.take_values() else {
        return;
    };
    if values.is_empty() {
        query.set_values(values);
        return;
    }

    let named = match values {
        ParamValues::Positional(params) => rewrite_positional(query, params),
        ParamValues::Named(params) => rewrite_named(query, params),
    };
    query.set_values(ParamValues::Named(named));
}

/// Expand arrays in named mode. Scalars keep their names and need no text
/// change; an array's placeholder is replaced everywhere it occurs.
fn rewrite_named(query: &mut Query, params: Vec<(String, Parameter)>) -> Vec<(String, Parameter)> {
    let mut expansions: HashMap<String, String> = HashMap::new();
    let mut out = Vec::with_capacity(params.len());

    for (name, param) in params {
        let (ty, value) = param.into_parts();
        match value {
            SqlValue::Array(items) => {
                let mut placeholders = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    let synthesized = format!("{name}{i}");
                    placeholders.push(format!("@{synthesized}"));
                    out.push((synthesized, Parameter::from_parts(ty, item)));
                }
                expansions.insert(name, placeholders.join(", "));
            }
            value => out.push((name, Parameter::from_parts(ty, value))),
        }
    }

    let new_text = match scanner::replace_placeholders(&query.text, |token| match &token.kind {
        TokenKind::Named(name) => expansions.get(name).cloned(),
        TokenKind::Positional => None,
    }) {
        Cow::Owned(text) => Some(text),
        Cow::Borrowed(_) => None,
    };
    if let Some(text) = new_text {
        query.text = text;
    }

    out
}

/// Convert positional mode to named mode: the k-th `?` token takes the k-th
/// parameter under a synthesized `p<index>` name; arrays expand into a
/// comma-joined list in place of their single token. Surplus parameters are
/// still recorded, surplus tokens are left untouched.
fn rewrite_positional(query: &mut Query, params: Vec<Parameter>) -> Vec<(String, Parameter)> {
    let mut replacements = Vec::with_capacity(params.len());
    let mut out = Vec::with_capacity(params.len());

    for (idx, param) in params.into_iter().enumerate() {
        let (ty, value) = param.into_parts();
        match value {
            SqlValue::Array(items) => {
                let mut placeholders = Vec::with_capacity(items.len());
                for (j, item) in items.into_iter().enumerate() {
                    let synthesized = format!("p{idx}{j}");
                    placeholders.push(format!("@{synthesized}"));
                    out.push((synthesized, Parameter::from_parts(ty, item)));
                }
                replacements.push(placeholders.join(", "));
            }
            value => {
                let synthesized = format!("p{idx}");
                replacements.push(format!("@{synthesized}"));
                out.push((synthesized, Parameter::from_parts(ty, value)));
            }
        }
    }

    let mut next = 0usize;
    let new_text = match scanner::replace_placeholders(&query.text, |token| {
        if token.kind == TokenKind::Positional {
            let replacement = replacements.get(next).cloned();
            next += 1;
            replacement
        } else {
            None
        }
    }) {
        Cow::Owned(text) => Some(text),
        Cow::Borrowed(_) => None,
    };
    if let Some(text) = new_text {
        query.text = text;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WireType;

    fn named_entries(query: &Query) -> &[(String, Parameter)] {
        match query.values() {
            Some(ParamValues::Named(entries)) => entries,
            other => panic!("expected named values, got {other:?}"),
        }
    }

    #[test]
    fn no_parameters_is_a_no_op() {
        let mut query = Query::new("SELECT 1");
        rewrite(&mut query);
        assert_eq!(query.text, "SELECT 1");
        assert!(query.values().is_none());
    }

    #[test]
    fn named_scalars_are_left_alone() {
        let mut query = Query::new("SELECT @test AS test")
            .with_values(ParamValues::named([("test", SqlValue::Int(1))]));
        rewrite(&mut query);
        assert_eq!(query.text, "SELECT @test AS test");
        let entries = named_entries(&query);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "test");
        assert_eq!(entries[0].1.value(), &SqlValue::Int(1));
    }

    #[test]
    fn named_arrays_expand_in_declared_order() {
        let mut query = Query::new("SELECT * FROM t WHERE foo IN (@foo)").with_values(
            ParamValues::named([(
                "foo",
                SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Int(2)]),
            )]),
        );
        rewrite(&mut query);
        assert_eq!(query.text, "SELECT * FROM t WHERE foo IN (@foo0, @foo1)");
        let entries = named_entries(&query);
        assert_eq!(entries[0].0, "foo0");
        assert_eq!(entries[0].1.value(), &SqlValue::Int(1));
        assert_eq!(entries[1].0, "foo1");
        assert_eq!(entries[1].1.value(), &SqlValue::Int(2));
    }

    #[test]
    fn array_expansion_hits_every_occurrence() {
        let mut query = Query::new("WHERE a IN (@x) OR b IN (@x)").with_values(
            ParamValues::named([("x", SqlValue::Array(vec![SqlValue::Int(7)]))]),
        );
        rewrite(&mut query);
        assert_eq!(query.text, "WHERE a IN (@x0) OR b IN (@x0)");
    }

    #[test]
    fn expansion_spares_longer_names_sharing_a_prefix() {
        let mut query = Query::new("SELECT @foo, @foobar").with_values(ParamValues::named([
            (
                "foo",
                SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Int(2)]),
            ),
            ("foobar", SqlValue::Int(3)),
        ]));
        rewrite(&mut query);
        assert_eq!(query.text, "SELECT @foo0, @foo1, @foobar");
    }

    #[test]
    fn positional_scalars_become_named() {
        let mut query = Query::new("SELECT ? AS test")
            .with_values(ParamValues::positional([SqlValue::Int(1)]));
        rewrite(&mut query);
        assert_eq!(query.text, "SELECT @p0 AS test");
        let entries = named_entries(&query);
        assert_eq!(entries[0].0, "p0");
        assert_eq!(entries[0].1.value(), &SqlValue::Int(1));
    }

    #[test]
    fn positional_arrays_expand_their_token() {
        let mut query = Query::new("WHERE a = ? AND b IN (?)").with_values(
            ParamValues::positional([
                SqlValue::Text("x".into()),
                SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Int(2)]),
            ]),
        );
        rewrite(&mut query);
        assert_eq!(query.text, "WHERE a = @p0 AND b IN (@p10, @p11)");
        let entries = named_entries(&query);
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["p0", "p10", "p11"]);
    }

    #[test]
    fn placeholders_inside_literals_survive() {
        let mut query = Query::new("SELECT '?' AS q, ? AS p")
            .with_values(ParamValues::positional([SqlValue::Int(1)]));
        rewrite(&mut query);
        assert_eq!(query.text, "SELECT '?' AS q, @p0 AS p");
    }

    #[test]
    fn explicit_types_survive_expansion() {
        let mut query = Query::new("WHERE foo IN (@foo)").with_values(ParamValues::named_params([(
            "foo",
            Parameter::explicit(
                WireType::NVarChar,
                SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Int(2)]),
            ),
        )]));
        rewrite(&mut query);
        for (_, param) in named_entries(&query) {
            assert_eq!(param.wire_type(), WireType::NVarChar);
        }
    }

    #[test]
    fn expanded_values_round_trip_in_order() {
        let original = vec![SqlValue::Int(4), SqlValue::Int(5), SqlValue::Int(6)];
        let mut query = Query::new("WHERE x IN (@x)").with_values(ParamValues::named([(
            "x",
            SqlValue::Array(original.clone()),
        )]));
        rewrite(&mut query);
        let bound: Vec<_> = named_entries(&query)
            .iter()
            .map(|(_, p)| p.value().clone())
            .collect();
        assert_eq!(bound, original);
    }

    #[test]
    fn rewriting_twice_changes_nothing() {
        let mut query = Query::new("WHERE a = ? AND b IN (?)").with_values(
            ParamValues::positional([
                SqlValue::Int(1),
                SqlValue::Array(vec![SqlValue::Int(2), SqlValue::Int(3)]),
            ]),
        );
        rewrite(&mut query);
        let text = query.text.clone();
        let values = query.values().cloned();
        rewrite(&mut query);
        assert_eq!(query.text, text);
        assert_eq!(query.values().cloned(), values);
    }

    #[test]
    fn surplus_parameters_are_still_recorded() {
        let mut query = Query::new("SELECT ?")
            .with_values(ParamValues::positional([SqlValue::Int(1), SqlValue::Int(2)]));
        rewrite(&mut query);
        assert_eq!(query.text, "SELECT @p0");
        assert_eq!(named_entries(&query).len(), 2);
    }
}
