//! Data bag values consumed by the template compiler.
//!
//! A [`DataBag`] maps string keys onto one of three shapes: a scalar, a list of
//! scalars, or another nested bag. The compiler branches on [`Value`]
//! exhaustively, so list blocks, simple substitution and dotted lookups can
//! never disagree about what a key holds.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Separator used by dotted lookups such as `{{company.phone}}`.
pub const PATH_SEPARATOR: char = '.';

/// Separator used when a list is rendered through a simple `{{key}}` tag.
pub const LIST_JOINER: &str = ", ";

/// A single data bag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Plain text, already formatted for display.
    Scalar(String),
    /// Ordered list of display strings.
    List(Vec<String>),
    /// Nested bag reached through dotted keys.
    Nested(DataBag),
}

impl Value {
    /// Render this value as a leaf: scalars verbatim, lists joined with
    /// `", "`, nested bags as the empty string.
    pub fn render_leaf(&self) -> Cow<'_, str> {
        match self {
            Value::Scalar(s) => Cow::Borrowed(s.as_str()),
            Value::List(items) => Cow::Owned(items.join(LIST_JOINER)),
            Value::Nested(_) => Cow::Borrowed(""),
        }
    }

    /// The list elements when this value is a list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// The nested bag when this value is nested.
    pub fn as_nested(&self) -> Option<&DataBag> {
        match self {
            Value::Nested(bag) => Some(bag),
            _ => None,
        }
    }

    /// Approximate payload size, used by tests and diagnostics.
    pub fn size_bytes(&self) -> usize {
        match self {
            Value::Scalar(s) => s.len(),
            Value::List(items) => items.iter().map(String::len).sum(),
            Value::Nested(bag) => bag
                .iter()
                .map(|(k, v)| k.len() + v.size_bytes())
                .sum(),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Scalar(s.clone())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<DataBag> for Value {
    fn from(bag: DataBag) -> Self {
        Value::Nested(bag)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Scalar(n.to_string())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Scalar(n.to_string())
    }
}

/// Ordered key/value bag. Iteration order is the key order, so rendering and
/// serialization are deterministic for identical inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataBag {
    entries: BTreeMap<String, Value>,
}

impl DataBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Insert only when a value is present. Absent fields stay absent so the
    /// compiler renders them as the empty string.
    pub fn insert_opt<V: Into<Value>>(
        &mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.entries.insert(key.into(), value.into());
        }
        self
    }

    /// Look up a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Resolve a dotted path (`a.b.c`) by walking nested bags.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(PATH_SEPARATOR);
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_nested()?.entries.get(segment)?;
        }
        Some(current)
    }

    /// Overlay `other` on top of `self`; keys in `other` win. When both sides
    /// hold nested bags under the same key the bags are merged recursively.
    pub fn overlay(&mut self, other: DataBag) {
        for (key, value) in other.entries {
            match (self.entries.get_mut(&key), value) {
                (Some(Value::Nested(existing)), Value::Nested(incoming)) => {
                    existing.overlay(incoming);
                }
                (_, value) => {
                    self.entries.insert(key, value);
                }
            }
        }
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the bag has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the top-level key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over top-level entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, Value)> for DataBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bag() -> DataBag {
        let mut company = DataBag::new();
        company.insert("name", "Acme Roofing");
        company.insert("phone", "(504) 555-0100");

        let mut bag = DataBag::new();
        bag.insert("service_name", "Roof Repair");
        bag.insert(
            "local_benefits",
            vec!["Fast response".to_string(), "Licensed techs".to_string()],
        );
        bag.insert("company", company);
        bag
    }

    #[test]
    fn test_render_leaf_shapes() {
        let bag = sample_bag();
        assert_eq!(bag.get("service_name").unwrap().render_leaf(), "Roof Repair");
        assert_eq!(
            bag.get("local_benefits").unwrap().render_leaf(),
            "Fast response, Licensed techs"
        );
        assert_eq!(bag.get("company").unwrap().render_leaf(), "");
    }

    #[test]
    fn test_get_path_walks_nested_bags() {
        let bag = sample_bag();
        assert_eq!(
            bag.get_path("company.phone").map(|v| v.render_leaf().into_owned()),
            Some("(504) 555-0100".to_string())
        );
        assert!(bag.get_path("company.missing").is_none());
        assert!(bag.get_path("service_name.nope").is_none());
        assert!(bag.get_path("").is_none());
    }

    #[test]
    fn test_insert_opt_skips_none() {
        let mut bag = DataBag::new();
        bag.insert_opt("slogan", None::<String>);
        bag.insert_opt("email", Some("office@example.com"));
        assert!(!bag.contains_key("slogan"));
        assert!(bag.contains_key("email"));
    }

    #[test]
    fn test_overlay_later_layer_wins() {
        let mut base = DataBag::new();
        base.insert("description", "Company description");
        base.insert("business_name", "Acme");

        let mut top = DataBag::new();
        top.insert("description", "Local description");

        base.overlay(top);
        assert_eq!(base.get("description"), Some(&Value::from("Local description")));
        assert_eq!(base.get("business_name"), Some(&Value::from("Acme")));
    }

    #[test]
    fn test_overlay_merges_nested_bags() {
        let mut colors = DataBag::new();
        colors.insert("primary", "#123456");
        colors.insert("accent", "#ff0000");
        let mut base = DataBag::new();
        base.insert("colors", colors);

        let mut override_colors = DataBag::new();
        override_colors.insert("accent", "#00ff00");
        let mut top = DataBag::new();
        top.insert("colors", override_colors);

        base.overlay(top);
        assert_eq!(base.get_path("colors.primary"), Some(&Value::from("#123456")));
        assert_eq!(base.get_path("colors.accent"), Some(&Value::from("#00ff00")));
    }

    #[test]
    fn test_serialization_is_untagged() -> Result<(), serde_json::Error> {
        let bag = sample_bag();
        let json = serde_json::to_value(&bag)?;
        assert_eq!(json["service_name"], "Roof Repair");
        assert_eq!(json["local_benefits"][1], "Licensed techs");
        assert_eq!(json["company"]["name"], "Acme Roofing");

        let back: DataBag = serde_json::from_value(json)?;
        assert_eq!(back, bag);
        Ok(())
    }
}
