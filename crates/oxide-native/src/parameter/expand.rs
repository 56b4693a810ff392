//! Rewriting multi-valued placeholders into placeholder lists.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::binding::{BindValue, ParameterBindings};
use super::ParameterOccurrence;

/// Knobs that decide how many slots a list parameter expands to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpansionOptions {
    /// Round list sizes above two up to the next power of two.
    pub padding: bool,
    /// Dialect limit on `IN` list size; zero means unlimited.
    pub in_expression_limit: u32,
}

/// Number of placeholder slots for a list of `bind_value_count` values.
///
/// Padding never exceeds a non-zero `in_expression_limit`, but a list that
/// is already longer than the limit keeps its length.
#[must_use]
pub fn determine_bind_value_max_count(
    padding: bool,
    in_expression_limit: u32,
    bind_value_count: usize,
) -> usize {
    if !padding || bind_value_count <= 2 {
        return bind_value_count;
    }
    let limit = usize::try_from(in_expression_limit).unwrap_or(usize::MAX);
    let mut padded = bind_value_count.next_power_of_two();
    if limit > 0 && padded > limit {
        padded = limit;
    }
    padded.max(bind_value_count)
}

/// Replaces each placeholder bound to a list with a run of placeholders.
///
/// A one-element list whose placeholder is already parenthesized is left
/// alone. An empty list becomes `null`, or `(null)` outside parentheses.
/// Lists longer than the dialect limit are expanded anyway with a warning.
#[must_use]
pub fn expand_parameter_lists<'a>(
    sql: &'a str,
    occurrences: &[ParameterOccurrence],
    bindings: &ParameterBindings,
    options: ExpansionOptions,
) -> Cow<'a, str> {
    let mut expanded: Option<String> = None;
    // Growth of the rewritten string relative to `sql` so far.
    let mut offset: isize = 0;

    for occurrence in occurrences {
        let Some(BindValue::Multi(values)) = bindings.get(&occurrence.key) else {
            continue;
        };
        let count = values.len();
        let max_count =
            determine_bind_value_max_count(options.padding, options.in_expression_limit, count);

        let limit = usize::try_from(options.in_expression_limit).unwrap_or(usize::MAX);
        if limit > 0 && count > limit {
            warn!(
                parameter = %occurrence.key,
                limit,
                count,
                "Too many expressions in IN list; the database may reject the statement"
            );
        }

        let Some(position) = occurrence.source_position else {
            continue;
        };

        let enclosed = is_enclosed_in_parens(sql, position);
        if count == 1 && enclosed {
            continue;
        }

        let replacement = placeholder_list(max_count, enclosed);
        let target = expanded.get_or_insert_with(|| {
            let mut s = String::with_capacity(sql.len() + 20);
            s.push_str(sql);
            s
        });
        let start = position.saturating_add_signed(offset);
        target.replace_range(start..=start, &replacement);
        offset += isize::try_from(replacement.len()).unwrap_or(isize::MAX) - 1;
    }

    expanded.map_or(Cow::Borrowed(sql), Cow::Owned)
}

/// A side with nothing but whitespace counts as enclosed.
fn is_enclosed_in_parens(sql: &str, position: usize) -> bool {
    let before = sql[..position].chars().rev().find(|c| !c.is_whitespace());
    let after = sql[position + 1..].chars().find(|c| !c.is_whitespace());
    before.is_none_or(|c| c == '(') && after.is_none_or(|c| c == ')')
}

fn placeholder_list(count: usize, enclosed: bool) -> String {
    if count == 0 {
        return if enclosed { "null" } else { "(null)" }.to_string();
    }
    let list = vec!["?"; count].join(",");
    if enclosed {
        list
    } else {
        format!("({list})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::parameter::{recognize, ParameterKey};

    fn expand(sql: &str, values: &[i64], options: ExpansionOptions) -> String {
        let p = recognize(sql).unwrap();
        let mut bindings = ParameterBindings::new(p.parameters().clone());
        for key in p.parameters() {
            bindings.bind_list(key.clone(), values.iter().copied()).unwrap();
        }
        expand_parameter_lists(p.adjusted_sql(), p.occurrences(), &bindings, options).into_owned()
    }

    const NO_PADDING: ExpansionOptions = ExpansionOptions {
        padding: false,
        in_expression_limit: 0,
    };

    const PADDING: ExpansionOptions = ExpansionOptions {
        padding: true,
        in_expression_limit: 0,
    };

    #[test]
    fn test_max_count() {
        assert_eq!(determine_bind_value_max_count(false, 0, 3), 3);
        assert_eq!(determine_bind_value_max_count(true, 0, 2), 2);
        assert_eq!(determine_bind_value_max_count(true, 0, 3), 4);
        assert_eq!(determine_bind_value_max_count(true, 0, 5), 8);
        assert_eq!(determine_bind_value_max_count(true, 0, 8), 8);
        assert_eq!(determine_bind_value_max_count(true, 6, 5), 6);
        // already over the limit: no padding, no truncation
        assert_eq!(determine_bind_value_max_count(true, 4, 7), 7);
    }

    #[test]
    fn test_expansion_without_padding() {
        assert_eq!(
            expand("select * from t where x in (?)", &[1, 2, 3], NO_PADDING),
            "select * from t where x in (?,?,?)"
        );
    }

    #[test]
    fn test_expansion_with_padding() {
        assert_eq!(
            expand("select * from t where x in (?)", &[1, 2, 3], PADDING),
            "select * from t where x in (?,?,?,?)"
        );
    }

    #[test]
    fn test_single_value_in_parens_is_untouched() {
        let sql = "select * from t where x in ( ? )";
        let p = recognize(sql).unwrap();
        let mut bindings = ParameterBindings::new(p.parameters().clone());
        bindings.bind_list(1_u32, [7_i64]).unwrap();
        let out = expand_parameter_lists(p.adjusted_sql(), p.occurrences(), &bindings, PADDING);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, sql);
    }

    #[test]
    fn test_empty_list_becomes_null() {
        assert_eq!(
            expand("select * from t where x = ?", &[], NO_PADDING),
            "select * from t where x = (null)"
        );
        assert_eq!(
            expand("select * from t where x in (?)", &[], NO_PADDING),
            "select * from t where x in (null)"
        );
    }

    #[test]
    fn test_unparenthesized_list_gets_parens() {
        assert_eq!(
            expand("select * from t where x in ?", &[1, 2], NO_PADDING),
            "select * from t where x in (?,?)"
        );
        assert_eq!(
            expand("select * from t where x = ?", &[1], NO_PADDING),
            "select * from t where x = (?)"
        );
    }

    #[test]
    fn test_offsets_accumulate_across_occurrences() {
        assert_eq!(
            expand(
                "select * from t where a in (:v) and b in (:v) and c = 1",
                &[1, 2, 3],
                NO_PADDING
            ),
            "select * from t where a in (?,?,?) and b in (?,?,?) and c = 1"
        );
        assert_eq!(
            expand("select * from t where a in (:v) or b in (:v)", &[], NO_PADDING),
            "select * from t where a in (null) or b in (null)"
        );
    }

    #[test]
    fn test_single_values_are_not_expanded() {
        let p = recognize("select * from t where a = :a and b in (:b)").unwrap();
        let mut bindings = ParameterBindings::new(p.parameters().clone());
        bindings.bind("a", 1_i64).unwrap();
        bindings.bind_list("b", [1_i64, 2]).unwrap();
        let out = expand_parameter_lists(p.adjusted_sql(), p.occurrences(), &bindings, NO_PADDING);
        assert_eq!(out, "select * from t where a = ? and b in (?,?)");
    }

    #[test]
    fn test_sentinel_position_is_skipped() {
        let occurrences = vec![ParameterOccurrence {
            key: ParameterKey::Named("v".to_string()),
            source_position: None,
        }];
        let mut declared = std::collections::BTreeSet::new();
        declared.insert(ParameterKey::Named("v".to_string()));
        let mut bindings = ParameterBindings::new(declared);
        bindings.bind_list("v", [1_i64, 2]).unwrap();
        let out = expand_parameter_lists("select ?", &occurrences, &bindings, NO_PADDING);
        assert_eq!(out, "select ?");
    }

    #[test]
    fn test_sentinel_position_binds_one_value() {
        let occurrences = vec![ParameterOccurrence {
            key: ParameterKey::Named("v".to_string()),
            source_position: None,
        }];
        let mut declared = std::collections::BTreeSet::new();
        declared.insert(ParameterKey::Named("v".to_string()));

        let mut bindings = ParameterBindings::new(declared.clone());
        bindings.bind_list("v", [1_i64, 2, 3]).unwrap();
        assert!(matches!(
            bindings.flatten(&occurrences, NO_PADDING),
            Err(QueryError::ListNotExpandable(name)) if name == ":v"
        ));

        let mut bindings = ParameterBindings::new(declared);
        bindings.bind_list("v", [7_i64]).unwrap();
        let sql = "select * from t where x in (?)";
        assert_eq!(
            expand_parameter_lists(sql, &occurrences, &bindings, NO_PADDING),
            sql
        );
        assert_eq!(
            bindings.flatten(&occurrences, NO_PADDING).unwrap(),
            vec![oxide_dialect::SqlValue::Int(7)]
        );
    }

    #[test]
    fn test_statement_edges_count_as_parentheses() {
        assert!(is_enclosed_in_parens("?", 0));
        assert!(is_enclosed_in_parens("  ? ", 2));
        assert!(is_enclosed_in_parens("in (?", 4));
        assert!(!is_enclosed_in_parens("x = ?", 4));
        assert_eq!(expand("?", &[1, 2], NO_PADDING), "?,?");
        assert_eq!(expand("?", &[], NO_PADDING), "null");
        assert_eq!(
            expand("select * from t where x = ?", &[1, 2], NO_PADDING),
            "select * from t where x = (?,?)"
        );
    }
}
