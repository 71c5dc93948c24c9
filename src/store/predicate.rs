use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::{Document, ID_FIELD};

/// Predicate
///
/// Filter over document fields. Field names are dotted paths (`video.title`);
/// the query layer only lets declared fields through.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Matches every document.
    All,
    /// Exact equality.
    Eq(String, Value),
    /// Equality against any of the listed values.
    In(String, Vec<Value>),
    /// Case-insensitive regular expression over a string field.
    Regex(String, Regex),
    /// Inclusive bounds; a missing bound is open.
    Range {
        field: String,
        min: Option<Value>,
        max: Option<Value>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq(field.into(), value.into())
    }

    /// Shorthand for `_id == id`.
    pub fn id(id: impl ToString) -> Self {
        Predicate::Eq(ID_FIELD.to_string(), Value::String(id.to_string()))
    }

    pub fn regex(field: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        let compiled = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Predicate::Regex(field.into(), compiled))
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        match predicates.len() {
            0 => Predicate::All,
            1 => predicates.into_iter().next().unwrap_or(Predicate::All),
            _ => Predicate::And(predicates),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Eq(field, value) => get_path(doc, field) == Some(value),
            Predicate::In(field, values) => {
                get_path(doc, field).is_some_and(|found| values.contains(found))
            }
            Predicate::Regex(field, re) => get_path(doc, field)
                .and_then(Value::as_str)
                .is_some_and(|s| re.is_match(s)),
            Predicate::Range { field, min, max } => match get_path(doc, field) {
                None | Some(Value::Null) => false,
                Some(found) => {
                    let above = min
                        .as_ref()
                        .is_none_or(|m| compare_values(Some(found), Some(m)) != Ordering::Less);
                    let below = max
                        .as_ref()
                        .is_none_or(|m| compare_values(Some(found), Some(m)) != Ordering::Greater);
                    above && below
                }
            },
            Predicate::And(all) => all.iter().all(|p| p.matches(doc)),
            Predicate::Or(any) => any.iter().any(|p| p.matches(doc)),
        }
    }

    /// Every field name referenced by this predicate.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::All => {}
            Predicate::Eq(field, _) | Predicate::In(field, _) | Predicate::Regex(field, _) => {
                out.push(field)
            }
            Predicate::Range { field, .. } => out.push(field),
            Predicate::And(inner) | Predicate::Or(inner) => {
                inner.iter().for_each(|p| p.collect_fields(out))
            }
        }
    }

    /// The top-level equality conjuncts, as a JSON object suitable for
    /// containment pushdown. Everything else must still be checked with
    /// [`Predicate::matches`].
    pub fn equality_conjuncts(&self) -> Map<String, Value> {
        let mut out = Map::new();
        self.collect_equalities(&mut out);
        out
    }

    /// True when [`Predicate::equality_conjuncts`] alone decides a match, so a
    /// containment query needs no in-process filtering. Object and array values
    /// are excluded because JSONB containment is looser than equality for them.
    pub fn is_containment_only(&self) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Eq(field, value) => {
                !field.contains('.') && !value.is_object() && !value.is_array()
            }
            Predicate::And(inner) => inner.iter().all(Predicate::is_containment_only),
            _ => false,
        }
    }

    fn collect_equalities(&self, out: &mut Map<String, Value>) {
        match self {
            Predicate::Eq(field, value) if !field.contains('.') => {
                out.insert(field.clone(), value.clone());
            }
            Predicate::And(inner) => inner.iter().for_each(|p| p.collect_equalities(out)),
            _ => {}
        }
    }
}

/// Resolves a dotted path inside a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Writes `value` at a dotted path, creating intermediate objects.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Bool(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::String(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Object(_)) => 6,
    }
}

/// Total order over optional JSON values: missing < null < bool < number < string < array < object.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn containment_only_covers_plain_equalities() {
        assert!(Predicate::id("abc").is_containment_only());
        assert!(
            Predicate::and(vec![Predicate::eq("actor", "a"), Predicate::eq("kind", "video")])
                .is_containment_only()
        );
        assert!(!Predicate::eq("video.title", "x").is_containment_only());
        assert!(!Predicate::eq("videos", json!(["a"])).is_containment_only());
        assert!(!Predicate::regex("title", "x").unwrap().is_containment_only());
    }

    #[test]
    fn regex_is_case_insensitive() {
        let p = Predicate::regex("title", "rust").unwrap();
        assert!(p.matches(&doc(json!({ "title": "Learning RUST fast" }))));
        assert!(!p.matches(&doc(json!({ "title": "Go" }))));
        assert!(!p.matches(&doc(json!({ "views": 3 }))));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let p = Predicate::Range {
            field: "views".into(),
            min: Some(json!(10)),
            max: Some(json!(20)),
        };
        assert!(p.matches(&doc(json!({ "views": 10 }))));
        assert!(p.matches(&doc(json!({ "views": 20 }))));
        assert!(!p.matches(&doc(json!({ "views": 21 }))));
        assert!(!p.matches(&doc(json!({}))));
    }

    #[test]
    fn nested_paths_resolve_and_write() {
        let mut d = doc(json!({ "video": { "title": "a" } }));
        assert_eq!(get_path(&d, "video.title"), Some(&json!("a")));
        set_path(&mut d, "likes.count", json!(2));
        assert_eq!(get_path(&d, "likes.count"), Some(&json!(2)));
    }

    #[test]
    fn only_top_level_equalities_are_pushed_down() {
        let p = Predicate::and(vec![
            Predicate::eq("actor", "a"),
            Predicate::eq("video.title", "x"),
            Predicate::Or(vec![Predicate::eq("kind", "video")]),
        ]);
        let pushed = p.equality_conjuncts();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed.get("actor"), Some(&json!("a")));
    }

    #[test]
    fn missing_sorts_before_present() {
        assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
    }
}
