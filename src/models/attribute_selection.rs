use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Validated, ordered mapping of attribute id to selected option id.
///
/// The map is ordered (BTreeMap keyed by attribute id) so that two
/// selections picking the same options always serialize to the same
/// canonical JSON string. Cart-line de-duplication compares that string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSelection(BTreeMap<Uuid, Uuid>);

impl AttributeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, attribute_id: Uuid, option_id: Uuid) {
        self.0.insert(attribute_id, option_id);
    }

    /// Canonical string form stored in the database and used as the
    /// equality key for cart lines.
    pub fn canonical(&self) -> String {
        // BTreeMap iteration order makes this deterministic.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl FromIterator<(Uuid, Uuid)> for AttributeSelection {
    fn from_iter<T: IntoIterator<Item = (Uuid, Uuid)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_insertion_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();

        let mut first = AttributeSelection::new();
        first.insert(a, x);
        first.insert(b, y);

        let mut second = AttributeSelection::new();
        second.insert(b, y);
        second.insert(a, x);

        assert_eq!(first.canonical(), second.canonical());
        assert_eq!(first, second);
    }

    #[test]
    fn differing_options_differ_canonically() {
        let attr = Uuid::new_v4();
        let mut first = AttributeSelection::new();
        first.insert(attr, Uuid::new_v4());
        let mut second = AttributeSelection::new();
        second.insert(attr, Uuid::new_v4());

        assert_ne!(first.canonical(), second.canonical());
    }

    #[test]
    fn empty_selection_round_trips() {
        let sel = AttributeSelection::new();
        assert_eq!(sel.canonical(), "{}");
        let parsed = AttributeSelection::parse(&sel.canonical()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(AttributeSelection::parse("not json").is_err());
        assert!(AttributeSelection::parse("{\"k\":\"v\"}").is_err());
    }
}
