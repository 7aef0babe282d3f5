//! Namespace, pod and service selectors.

use serde::ser::{Serialize, SerializeMap, Serializer};

use guide_core::{LabelPair, NamespaceSelection, SelectionMethod};

/// Label equalities in input order; all must match.
///
/// Repeated keys keep their first position and take the last value, so the
/// rendered mapping never has duplicate keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelMap(Vec<(String, String)>);

impl LabelMap {
    pub fn from_pairs(pairs: &[LabelPair]) -> Self {
        let mut map = Self::default();
        for pair in pairs {
            map.insert(&pair.key, &pair.value);
        }
        map
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.0.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for LabelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Which namespaces a target applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorSpec {
    MatchNames(Vec<String>),
    MatchLabels(LabelMap),
}

impl Serialize for SelectorSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::MatchNames(names) => map.serialize_entry("matchNames", names)?,
            Self::MatchLabels(labels) => map.serialize_entry("matchLabels", labels)?,
        }
        map.end()
    }
}

/// `matchLabels` wrapper used for pod and service selection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: LabelMap,
}

/// Split `"a, b,,c"` into `["a", "b", "c"]`.
pub fn parse_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Label map that is never empty: an empty `matchLabels` would select every
/// object, so missing labels become one literal empty-key equality that
/// selects nothing.
pub fn match_labels(pairs: &[LabelPair]) -> LabelMap {
    let mut labels = LabelMap::from_pairs(pairs);
    if labels.is_empty() {
        labels.insert("", "");
    }
    labels
}

pub fn build_namespace_selector(selection: &NamespaceSelection) -> SelectorSpec {
    match selection.method {
        SelectionMethod::Name => SelectorSpec::MatchNames(parse_names(&selection.names)),
        SelectionMethod::Label => SelectorSpec::MatchLabels(match_labels(&selection.labels)),
        SelectionMethod::Unspecified => SelectorSpec::MatchNames(Vec::new()),
    }
}

pub fn build_label_selector(pairs: &[LabelPair]) -> LabelSelector {
    LabelSelector {
        match_labels: match_labels(pairs),
    }
}
