use crate::{MemStore, Storage};
use appmeta_core::Metadata;
use std::collections::BTreeMap;

const VERSION: &str = "version";
const MAINTAINER_NAME: &str = "maintainers.name";
const MAINTAINER_EMAIL: &str = "maintainers.email";

/// Search criteria taken from URL query parameters.
///
/// A parameter may be repeated; only the maintainer parameters accept more
/// than one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    params: BTreeMap<String, Vec<String>>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = SearchParams::new();
        for (key, value) in pairs {
            params.push(key.as_ref(), value);
        }
        params
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.params
            .entry(key.trim().to_string())
            .or_default()
            .push(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The version criterion, which identifies a record on its own
    pub fn version(&self) -> Option<&str> {
        self.params
            .get(VERSION)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Whether a record satisfies every criterion.
    ///
    /// `title` and `description` match on substring, the other scalar fields
    /// need an exact match, and every maintainer value must belong to some
    /// maintainer. Unknown parameters are ignored.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        for (param, values) in &self.params {
            let is_maintainer = param == MAINTAINER_NAME || param == MAINTAINER_EMAIL;
            if !is_maintainer && values.len() > 1 {
                return false;
            }
            let Some(first) = values.first() else {
                continue;
            };

            let matched = match param.as_str() {
                "title" => metadata.title.contains(first.as_str()),
                "description" => metadata.description.contains(first.as_str()),
                "company" => metadata.company == *first,
                "website" => metadata.website == *first,
                "source" => metadata.source == *first,
                "license" => metadata.license == *first,
                VERSION => metadata.version == *first,
                MAINTAINER_NAME => values.iter().all(|name| metadata.has_maintainer_name(name)),
                MAINTAINER_EMAIL => values.iter().all(|email| metadata.has_maintainer_email(email)),
                _ => true,
            };
            if !matched {
                return false;
            }
        }
        true
    }
}

/// Records matching the criteria.
///
/// No criteria returns everything; a version criterion is a direct key
/// lookup and the other criteria are not consulted.
pub fn search(store: &MemStore<Metadata>, params: &SearchParams) -> Vec<Metadata> {
    if params.is_empty() {
        return store.values();
    }

    if let Some(version) = params.version() {
        return store.read(version).into_iter().collect();
    }

    store
        .values()
        .into_iter()
        .filter(|metadata| params.matches(metadata))
        .collect()
}
