//! Key-template expansion.
//!
//! Key patterns are template strings with `{FieldName}` macros that expand
//! against an entity's attribute map, e.g. `"USER#{ID}"`. Static portions
//! survive verbatim. All functions here are pure and deterministic.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use monotable_core::storage::{Item, KeyPatterns, Result, StoreError};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

static MACRO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^}]+)\}").expect("macro pattern is valid"));

/// Expands every key pattern against the entity's attribute map.
///
/// Macros referencing string attributes substitute the raw string, numbers
/// their decimal text, booleans `true`/`false`. Null, binary, set, list, and
/// map attributes, as well as unknown names, substitute the empty string;
/// callers treat empty key segments as errors where a key is required.
pub fn expand(patterns: &KeyPatterns, item: &Item) -> HashMap<String, String> {
    patterns
        .iter()
        .map(|(logical, template)| {
            let expanded = MACRO_PATTERN.replace_all(template, |caps: &regex::Captures<'_>| {
                attribute_text(item.get(&caps[1]))
            });
            (logical.clone(), expanded.into_owned())
        })
        .collect()
}

/// Expands every key pattern by substituting the same scalar for every macro
/// occurrence, regardless of name. Used by point lookups that received only
/// an identifier rather than a whole entity.
pub fn expand_scalar(patterns: &KeyPatterns, key: &str) -> HashMap<String, String> {
    patterns
        .iter()
        .map(|(logical, template)| {
            let expanded = MACRO_PATTERN.replace_all(template, NoExpand(key));
            (logical.clone(), expanded.into_owned())
        })
        .collect()
}

/// Builds the primary key item from an expanded pattern table.
///
/// Requires non-empty `PK` and `SK`. The single-object shorthand (`PK == SK`)
/// needs no special casing here: both attributes are set to the shared value
/// either way.
pub fn primary_key(expanded: &HashMap<String, String>) -> Result<Item> {
    let pk = expanded.get("PK").filter(|v| !v.is_empty());
    let sk = expanded.get("SK").filter(|v| !v.is_empty());
    match (pk, sk) {
        (Some(pk), Some(sk)) => {
            let mut key = Item::new();
            key.insert("PK".to_string(), AttributeValue::S(pk.clone()));
            key.insert("SK".to_string(), AttributeValue::S(sk.clone()));
            Ok(key)
        }
        _ => Err(StoreError::KeyExpansion(
            "expanded key patterns are missing a non-empty PK or SK".to_string(),
        )),
    }
}

fn attribute_text(value: Option<&AttributeValue>) -> String {
    match value {
        Some(AttributeValue::S(s)) => s.clone(),
        Some(AttributeValue::N(n)) => n.clone(),
        Some(AttributeValue::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
