//! Captured path parameters.
//!
//! On a successful dispatch the router inserts a [`PathParams`] into the
//! request's extensions, delivering placeholder captures to downstream
//! handlers.

use std::collections::HashMap;

/// Placeholder name to captured path segment value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: HashMap<String, String>,
}

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_and_get() {
        let params: PathParams = vec![("id".to_string(), "42".to_string())]
            .into_iter()
            .collect();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.len(), 1);
    }
}
