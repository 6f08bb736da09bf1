//! Per-keyword constraint comparators
//!
//! Every comparator looks at one OpenAPI keyword on a matched pair of schema
//! nodes and returns a description when the new node accepts strictly fewer
//! values than the old one. Loosened or unchanged constraints return `None`.
//! A keyword added where none existed counts as narrowing, a removed keyword
//! never does.

use serde_json::Value;

use crate::schema::{AdditionalProperties, SchemaProperty};

/// Compares one keyword of an old and a new schema node
pub type Comparator = fn(&SchemaProperty, &SchemaProperty) -> Option<String>;

/// All comparators, keyed by the keyword they inspect
pub const COMPARATORS: &[(&str, Comparator)] = &[
    ("type", compare_type),
    ("enum", compare_enum),
    ("required", compare_required),
    ("minimum", compare_minimum),
    ("maximum", compare_maximum),
    ("minLength", compare_min_length),
    ("maxLength", compare_max_length),
    ("minItems", compare_min_items),
    ("maxItems", compare_max_items),
    ("minProperties", compare_min_properties),
    ("maxProperties", compare_max_properties),
    ("pattern", compare_pattern),
    ("nullable", compare_nullable),
    ("additionalProperties", compare_additional_properties),
];

/// Run every comparator against one pair of nodes, in table order
pub fn narrowed(old: &SchemaProperty, new: &SchemaProperty) -> Vec<String> {
    COMPARATORS
        .iter()
        .filter_map(|(_, compare)| compare(old, new))
        .collect()
}

/// Look up a comparator by keyword
pub fn comparator(keyword: &str) -> Option<Comparator> {
    COMPARATORS
        .iter()
        .find(|(name, _)| *name == keyword)
        .map(|(_, compare)| *compare)
}

pub fn compare_type(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    match (&old.type_, &new.type_) {
        (_, Some(_)) if new.x_int_or_string => None,
        (None, Some(t)) => Some(format!("type restricted to {}", t)),
        (Some(old_t), Some(new_t)) if !old_t.is_compatible_with(new_t) => {
            Some(format!("type changed from {} to {}", old_t, new_t))
        }
        _ => None,
    }
}

pub fn compare_enum(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    match (&old.enum_values, &new.enum_values) {
        (None, Some(values)) => Some(format!("enum added ({})", render_values(values))),
        (Some(old_values), Some(new_values)) => {
            let removed: Vec<String> = old_values
                .iter()
                .filter(|old_v| !new_values.iter().any(|new_v| same_value(old_v, new_v)))
                .map(Value::to_string)
                .collect();

            if removed.is_empty() {
                None
            } else {
                Some(format!("enum values removed: {}", removed.join(", ")))
            }
        }
        _ => None,
    }
}

pub fn compare_required(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    let added: Vec<&str> = new
        .required
        .iter()
        .filter(|name| !old.is_required(name))
        .map(String::as_str)
        .collect();

    if added.is_empty() {
        None
    } else {
        Some(format!("required fields added: {}", added.join(", ")))
    }
}

pub fn compare_minimum(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    match (old.minimum, new.minimum) {
        (None, Some(v)) => Some(format!("minimum added ({})", bound(v, new.exclusive_minimum))),
        (Some(old_v), Some(new_v)) if new_v > old_v => Some(format!(
            "minimum increased from {} to {}",
            bound(old_v, old.exclusive_minimum),
            bound(new_v, new.exclusive_minimum)
        )),
        (Some(old_v), Some(new_v))
            if new_v == old_v && new.exclusive_minimum && !old.exclusive_minimum =>
        {
            Some(format!("minimum {} became exclusive", new_v))
        }
        _ => None,
    }
}

pub fn compare_maximum(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    match (old.maximum, new.maximum) {
        (None, Some(v)) => Some(format!("maximum added ({})", bound(v, new.exclusive_maximum))),
        (Some(old_v), Some(new_v)) if new_v < old_v => Some(format!(
            "maximum decreased from {} to {}",
            bound(old_v, old.exclusive_maximum),
            bound(new_v, new.exclusive_maximum)
        )),
        (Some(old_v), Some(new_v))
            if new_v == old_v && new.exclusive_maximum && !old.exclusive_maximum =>
        {
            Some(format!("maximum {} became exclusive", new_v))
        }
        _ => None,
    }
}

pub fn compare_min_length(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    lower_bound("minLength", old.min_length, new.min_length)
}

pub fn compare_max_length(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    upper_bound("maxLength", old.max_length, new.max_length)
}

pub fn compare_min_items(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    lower_bound("minItems", old.min_items, new.min_items)
}

pub fn compare_max_items(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    upper_bound("maxItems", old.max_items, new.max_items)
}

pub fn compare_min_properties(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    lower_bound("minProperties", old.min_properties, new.min_properties)
}

pub fn compare_max_properties(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    upper_bound("maxProperties", old.max_properties, new.max_properties)
}

/// Two different regexes are treated as narrowing: equivalence is undecidable here
pub fn compare_pattern(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    match (&old.pattern, &new.pattern) {
        (None, Some(p)) => Some(format!("pattern added ({:?})", p)),
        (Some(old_p), Some(new_p)) if old_p != new_p => {
            Some(format!("pattern changed from {:?} to {:?}", old_p, new_p))
        }
        _ => None,
    }
}

pub fn compare_nullable(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    (old.nullable && !new.nullable).then(|| "nullable removed".to_string())
}

pub fn compare_additional_properties(old: &SchemaProperty, new: &SchemaProperty) -> Option<String> {
    use AdditionalProperties::{Allowed, Denied, Schema};

    match (&old.additional_properties, &new.additional_properties) {
        (Some(Allowed | Schema(_)), Some(Denied)) => Some("additionalProperties removed".to_string()),
        (Some(Allowed), Some(Schema(_))) => {
            Some("additionalProperties restricted to a schema".to_string())
        }
        _ => None,
    }
}

/// Numbers compare by value, so `1` and `1.0` are the same enum entry
fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn lower_bound(keyword: &str, old: Option<u64>, new: Option<u64>) -> Option<String> {
    match (old, new) {
        (None, Some(v)) if v > 0 => Some(format!("{} added ({})", keyword, v)),
        (Some(old_v), Some(new_v)) if new_v > old_v => Some(format!(
            "{} increased from {} to {}",
            keyword, old_v, new_v
        )),
        _ => None,
    }
}

fn upper_bound(keyword: &str, old: Option<u64>, new: Option<u64>) -> Option<String> {
    match (old, new) {
        (None, Some(v)) => Some(format!("{} added ({})", keyword, v)),
        (Some(old_v), Some(new_v)) if new_v < old_v => Some(format!(
            "{} decreased from {} to {}",
            keyword, old_v, new_v
        )),
        _ => None,
    }
}

fn bound(value: f64, exclusive: bool) -> String {
    if exclusive {
        format!("{} exclusive", value)
    } else {
        value.to_string()
    }
}

fn render_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
