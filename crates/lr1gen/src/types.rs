//! Utility types.

use crate::grammar::TerminalID;
use std::fmt;

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A set of terminal symbols, represented as a bit set over the raw IDs.
#[derive(Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    pub fn remove(&mut self, id: TerminalID) -> bool {
        self.inner.remove(id.into_raw().into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_superset(&self, other: &Self) -> bool {
        self.inner.is_superset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| raw.try_into().map(TerminalID::from_raw).unwrap())
    }
}

impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl Eq for TerminalSet {}

impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

impl Extend<TerminalID> for TerminalSet {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = TerminalID>,
    {
        for t in iter {
            self.insert(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_set_ops() {
        let t = |raw| TerminalID::from_raw(raw);

        let mut set: TerminalSet = [t(3), t(0)].into_iter().collect();
        assert!(set.contains(t(0)));
        assert!(!set.contains(t(1)));
        assert!(set.insert(t(1)));
        assert!(!set.insert(t(1)));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![t(0), t(1), t(3)]);

        let other: TerminalSet = [t(1), t(3)].into_iter().collect();
        assert!(set.is_superset(&other));
        assert!(set.remove(t(0)));
        assert_eq!(set, other);
        assert_eq!(set.len(), 2);
    }
}
