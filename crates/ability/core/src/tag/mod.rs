//! Hierarchical gameplay tags.
//!
//! A tag is a dot-delimited name such as `"Buff.DeBuff.Poison"`. Matching is
//! prefix-hierarchical: a tag matches itself and every ancestor, never a
//! descendant.
//!
//! ```
//! # use ability_core::tag::{GameplayTag, TagSet, matches};
//! let poison = GameplayTag::new("Buff.DeBuff.Poison");
//! let debuffs = TagSet::from_iter(["Buff.DeBuff"]);
//! assert!(matches(&poison, &debuffs));
//! assert!(!matches(&GameplayTag::new("Buff"), &debuffs));
//! ```
//!
//! Unknown names are valid opaque tags; there is no registry.

mod owned;

pub use owned::OwnedTags;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Immutable hierarchical tag. Equality is by normalized name.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub struct GameplayTag(Arc<str>);

impl GameplayTag {
    pub const SEPARATOR: char = '.';

    /// Creates a tag, normalizing whitespace and empty segments.
    ///
    /// `" CD..火球术. "` and `"CD.火球术"` produce the same tag.
    pub fn new(name: impl AsRef<str>) -> Self {
        let normalized = name
            .as_ref()
            .split(Self::SEPARATOR)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        Self(Arc::from(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of segments. `"A.B.C"` has depth 3.
    pub fn depth(&self) -> usize {
        if self.0.is_empty() {
            0
        } else {
            self.0.split(Self::SEPARATOR).count()
        }
    }

    /// Direct parent, if any. `"A.B.C"` → `"A.B"`.
    pub fn parent(&self) -> Option<GameplayTag> {
        self.0
            .rfind(Self::SEPARATOR)
            .map(|idx| Self(Arc::from(&self.0[..idx])))
    }

    /// All proper ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = GameplayTag> {
        std::iter::successors(self.parent(), |tag| tag.parent())
    }

    /// True if `self` equals `ancestor` or lies below it in the hierarchy.
    pub fn matches(&self, ancestor: &GameplayTag) -> bool {
        let (tag, query) = (self.as_str(), ancestor.as_str());
        tag == query
            || (tag.len() > query.len()
                && tag.starts_with(query)
                && tag[query.len()..].starts_with(Self::SEPARATOR))
    }

    /// True if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &GameplayTag) -> bool {
        self != ancestor && self.matches(ancestor)
    }
}

impl fmt::Debug for GameplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.0)
    }
}

impl fmt::Display for GameplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameplayTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GameplayTag {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<GameplayTag> for String {
    fn from(value: GameplayTag) -> Self {
        value.0.to_string()
    }
}

/// `Matches(query, candidateSet)`: true if `tag` equals or descends from any
/// candidate.
pub fn matches(tag: &GameplayTag, candidates: &TagSet) -> bool {
    candidates.iter().any(|candidate| tag.matches(candidate))
}

/// Ordered set of tags with duplicates collapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TagSet {
    tags: BTreeSet<GameplayTag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameplayTag> {
        self.tags.iter()
    }

    /// Exact membership, no hierarchy.
    pub fn contains_exact(&self, tag: &GameplayTag) -> bool {
        self.tags.contains(tag)
    }

    /// Adds a tag. Returns false if it was already present.
    pub fn add(&mut self, tag: GameplayTag) -> bool {
        self.tags.insert(tag)
    }

    /// Removes `tag` together with every descendant of it.
    ///
    /// Returns true if anything was removed.
    pub fn remove(&mut self, tag: &GameplayTag) -> bool {
        let before = self.tags.len();
        self.tags.retain(|owned| !owned.matches(tag));
        self.tags.len() != before
    }

    /// Removes every tag in `other` (with descendants).
    pub fn remove_all(&mut self, other: &TagSet) -> bool {
        let mut changed = false;
        for tag in other.iter() {
            changed |= self.remove(tag);
        }
        changed
    }

    pub fn union(&self, other: &TagSet) -> TagSet {
        TagSet {
            tags: self.tags.union(&other.tags).cloned().collect(),
        }
    }

    pub fn extend(&mut self, other: &TagSet) {
        self.tags.extend(other.tags.iter().cloned());
    }

    /// True if some owned tag equals or descends from `query`.
    pub fn has_tag(&self, query: &GameplayTag) -> bool {
        self.tags.iter().any(|owned| owned.matches(query))
    }

    /// `HasAny(set, querySet)`. An empty query never matches.
    pub fn has_any(&self, queries: &TagSet) -> bool {
        queries.iter().any(|query| self.has_tag(query))
    }

    /// `HasAll(set, querySet)`. An empty query always matches.
    pub fn has_all(&self, queries: &TagSet) -> bool {
        queries.iter().all(|query| self.has_tag(query))
    }

    /// Tags of `queries` that this set does not satisfy.
    pub fn missing(&self, queries: &TagSet) -> TagSet {
        queries
            .iter()
            .filter(|query| !self.has_tag(query))
            .cloned()
            .collect()
    }

    /// Exact-name intersection test, no hierarchy in either direction.
    pub fn matches_any_exact(&self, other: &TagSet) -> bool {
        self.tags.iter().any(|tag| other.tags.contains(tag))
    }
}

impl<T: Into<GameplayTag>> FromIterator<T> for TagSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a GameplayTag;
    type IntoIter = std::collections::btree_set::Iter<'a, GameplayTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> GameplayTag {
        GameplayTag::new(name)
    }

    #[test]
    fn tag_matches_itself_and_ancestors_only() {
        assert!(matches(&tag("A"), &TagSet::from_iter(["A"])));
        assert!(matches(&tag("X.Y.Z"), &TagSet::from_iter(["X.Y"])));
        assert!(!matches(&tag("X.Y"), &TagSet::from_iter(["X.Y.Z"])));
    }

    #[test]
    fn prefix_without_separator_is_not_an_ancestor() {
        assert!(!tag("Buff.DeBuffed").matches(&tag("Buff.DeBuff")));
        assert!(tag("Buff.DeBuff.Slow").matches(&tag("Buff.DeBuff")));
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(tag(" CD..火球术. "), tag("CD.火球术"));
        assert_eq!(tag("CD.火球术").depth(), 2);
    }

    #[test]
    fn parent_and_ancestors_walk_upwards() {
        let leaf = tag("A.B.C");
        assert_eq!(leaf.parent(), Some(tag("A.B")));
        let ancestors: Vec<_> = leaf.ancestors().collect();
        assert_eq!(ancestors, vec![tag("A.B"), tag("A")]);
        assert_eq!(tag("A").parent(), None);
    }

    #[test]
    fn remove_takes_descendants_with_it() {
        let mut set = TagSet::from_iter(["Buff.DeBuff.Slow", "Buff.DeBuff", "Buff.Haste"]);
        assert!(set.remove(&tag("Buff.DeBuff")));
        assert_eq!(set, TagSet::from_iter(["Buff.Haste"]));
        assert!(!set.remove(&tag("Unknown")));
    }

    #[test]
    fn has_any_and_has_all_use_hierarchy() {
        let owned = TagSet::from_iter(["unitType.boss", "State.Stunned"]);
        assert!(owned.has_any(&TagSet::from_iter(["State", "Missing"])));
        assert!(owned.has_all(&TagSet::from_iter(["unitType", "State.Stunned"])));
        assert!(!owned.has_all(&TagSet::from_iter(["unitType", "Missing"])));
        assert!(!owned.has_any(&TagSet::new()));
        assert!(owned.has_all(&TagSet::new()));
    }

    #[test]
    fn duplicates_collapse() {
        let mut set = TagSet::new();
        assert!(set.add(tag("A.B")));
        assert!(!set.add(tag("A..B")));
        assert_eq!(set.len(), 1);
    }
}
