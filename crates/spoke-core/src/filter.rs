//! Client-side projections over a mirror.
//!
//! Filters are pure and synchronous: they never re-query the store and never
//! affect a subscription. Order of the input is preserved.

use serde_json::Value;

use crate::document::Document;

/// Label that selects every item.
pub const ALL: &str = "All";

/// Field that category filters match against.
pub const CATEGORY_FIELD: &str = "category";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
  #[default]
  All,
  /// Keep items whose `field` equals `value` exactly.
  FieldEquals { field: String, value: Value },
}

impl Filter {
  /// A category filter; `"All"` (or no category) selects everything.
  pub fn category(category: Option<&str>) -> Self {
    Self::field_label(CATEGORY_FIELD, category)
  }

  /// Equality on a string field, with `"All"` meaning no filter.
  pub fn field_label(field: &str, label: Option<&str>) -> Self {
    match label.map(str::trim) {
      None | Some("") | Some(ALL) => Self::All,
      Some(label) => Self::FieldEquals {
        field: field.to_owned(),
        value: Value::String(label.to_owned()),
      },
    }
  }

  pub fn matches(&self, doc: &Document) -> bool {
    match self {
      Self::All => true,
      Self::FieldEquals { field, value } => doc.get(field) == Some(value),
    }
  }

  /// Lazily select matching items, preserving order.
  pub fn select<'f, 'a: 'f>(
    &'f self,
    items: &'a [Document],
  ) -> impl Iterator<Item = &'a Document> + 'f {
    items.iter().filter(move |d| self.matches(d))
  }

  /// Collect matching items into an owned list.
  pub fn apply(&self, items: &[Document]) -> Vec<Document> {
    self.select(items).cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::document::Fields;

  fn item(id: &str, category: &str) -> Document {
    let mut f = Fields::new();
    f.insert("category".into(), json!(category));
    Document::new(id.into(), f)
  }

  fn mirror() -> Vec<Document> {
    vec![
      item("1", "Mountain"),
      item("2", "Road"),
      item("3", "Mountain"),
      item("4", "Gravel"),
    ]
  }

  #[test]
  fn all_returns_mirror_unchanged() {
    let m = mirror();
    assert_eq!(Filter::category(Some("All")).apply(&m), m);
    assert_eq!(Filter::category(None).apply(&m), m);
  }

  #[test]
  fn category_keeps_matching_subsequence_in_order() {
    let m = mirror();
    let ids: Vec<_> = Filter::category(Some("Mountain"))
      .select(&m)
      .map(|d| d.id.as_str())
      .collect();
    assert_eq!(ids, ["1", "3"]);
  }

  #[test]
  fn unknown_category_yields_nothing() {
    assert!(Filter::category(Some("Track")).apply(&mirror()).is_empty());
  }

  #[test]
  fn missing_field_does_not_match() {
    let bare = Document::new("x".into(), Fields::new());
    assert!(!Filter::category(Some("Road")).matches(&bare));
    assert!(Filter::All.matches(&bare));
  }
}
