//! An ordered multi-value map used for headers and query parameters.

use indexmap::IndexMap;

/// A mapping from a name to an ordered list of values.
///
/// Names keep the order in which they were first inserted, and the values of
/// one name keep the order in which they were added. Adding a value for a name
/// that is already present appends to that name's list.
///
/// Two maps are equal when they hold the same names with the same value
/// sequences; the order of different names does not matter.
///
/// # Examples
///
/// ```
/// use callsheet::MultiValueMap;
///
/// let mut headers = MultiValueMap::new();
/// headers.add("Accept", "application/json");
/// headers.add("Accept", "application/cbor");
///
/// assert_eq!(
///     headers.get("Accept"),
///     Some(&["application/json".to_string(), "application/cbor".to_string()][..])
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiValueMap {
    entries: IndexMap<String, Vec<String>>,
}

impl MultiValueMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to the list stored under `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Appends every value of `other`, name by name, after the values already present.
    pub fn merge(&mut self, other: &MultiValueMap) {
        for (name, values) in other.iter() {
            for value in values {
                self.add(name, value.as_str());
            }
        }
    }

    /// Returns the values stored under `name`.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Returns the first value stored under `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)?.first().map(String::as_str)
    }

    /// Returns `true` if at least one value is stored under `name`.
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Replaces all values of `name`, returning the previous ones.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) -> Option<Vec<String>> {
        self.entries.insert(name.into(), values)
    }

    /// Removes `name` and its values, keeping the order of the remaining names.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.shift_remove(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no names.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over names and their value lists in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Iterates over every `(name, value)` pair, flattening the value lists.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .flat_map(|(name, values)| values.iter().map(move |value| (name, value.as_str())))
    }
}

impl<K, V> FromIterator<(K, V)> for MultiValueMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MultiValueMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V> Extend<(K, V)> for MultiValueMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.add(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_preserve_insertion_order() {
        let map: MultiValueMap = [("region", "sgp"), ("Authorization", "token"), ("region", "esp")]
            .into_iter()
            .collect();

        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get("region").unwrap(),
            &["sgp".to_string(), "esp".to_string()]
        );
        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["region", "Authorization"]);
    }

    #[test]
    fn test_merge_appends_after_existing_values() {
        let mut base: MultiValueMap = [("Accept", "application/json")].into_iter().collect();
        let other: MultiValueMap = [("Accept", "application/cbor"), ("Test", "t1")]
            .into_iter()
            .collect();

        base.merge(&other);

        assert_eq!(
            base.get("Accept").unwrap(),
            &["application/json".to_string(), "application/cbor".to_string()]
        );
        assert_eq!(base.first("Test"), Some("t1"));
    }

    #[test]
    fn test_equality_ignores_name_order() {
        let a: MultiValueMap = [("a", "1"), ("b", "2")].into_iter().collect();
        let b: MultiValueMap = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(a, b);

        let c: MultiValueMap = [("a", "2"), ("a", "1")].into_iter().collect();
        let d: MultiValueMap = [("a", "1"), ("a", "2")].into_iter().collect();
        assert_ne!(c, d);
    }

    #[test]
    fn test_pairs_flatten_values() {
        let map: MultiValueMap = [("page", "1"), ("tag", "a"), ("tag", "b")]
            .into_iter()
            .collect();
        let pairs: Vec<(&str, &str)> = map.pairs().collect();
        assert_eq!(pairs, vec![("page", "1"), ("tag", "a"), ("tag", "b")]);
    }

    #[test]
    fn test_remove_keeps_remaining_order() {
        let mut map: MultiValueMap = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        assert_eq!(map.remove("b"), Some(vec!["2".to_string()]));
        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
