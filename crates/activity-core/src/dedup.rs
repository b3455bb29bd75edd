use std::collections::HashMap;
use std::hash::Hash;

/// Collapse items sharing a key.
///
/// The survivor sits at the position of the key's first appearance but
/// carries the value of its last appearance, so the outcome depends only
/// on iteration order.
pub fn dedup_by_key<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::new();
    for item in items {
        match slots.get(&key(&item)) {
            Some(&slot) => out[slot] = item,
            None => {
                slots.insert(key(&item), out.len());
                out.push(item);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Issue {
        id: &'static str,
        title: &'static str,
    }

    fn issue(id: &'static str, title: &'static str) -> Issue {
        Issue { id, title }
    }

    #[test]
    fn same_id_from_two_fetches_keeps_one_entry_last_writer_wins() {
        let first = vec![issue("a", "old title"), issue("b", "b")];
        let second = vec![issue("c", "c"), issue("a", "new title")];
        let merged = dedup_by_key(first.into_iter().chain(second), |i| i.id);
        assert_eq!(
            merged,
            vec![issue("a", "new title"), issue("b", "b"), issue("c", "c")]
        );
    }

    #[test]
    fn no_duplicates_is_identity() {
        let items = vec![issue("x", "1"), issue("y", "2")];
        assert_eq!(dedup_by_key(items.clone(), |i| i.id), items);
    }

    #[test]
    fn empty() {
        let merged: Vec<Issue> = dedup_by_key(Vec::new(), |i: &Issue| i.id);
        assert!(merged.is_empty());
    }
}
