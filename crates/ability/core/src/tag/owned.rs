use std::collections::BTreeMap;

use super::{GameplayTag, TagSet};

/// A unit's owned tags.
///
/// Tags reach a unit from two directions: counted grants (effects and running
/// abilities, one grant per instance) and loose tags added directly by game
/// code. A granted tag stays owned until every grant has been revoked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OwnedTags {
    granted: BTreeMap<GameplayTag, u32>,
    loose: TagSet,
    combined: TagSet,
}

impl OwnedTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective owned set used by every gate and query.
    pub fn as_set(&self) -> &TagSet {
        &self.combined
    }

    pub fn has_tag(&self, query: &GameplayTag) -> bool {
        self.combined.has_tag(query)
    }

    pub fn has_any(&self, queries: &TagSet) -> bool {
        self.combined.has_any(queries)
    }

    pub fn has_all(&self, queries: &TagSet) -> bool {
        self.combined.has_all(queries)
    }

    /// Number of outstanding grants for exactly `tag`.
    pub fn grant_count(&self, tag: &GameplayTag) -> u32 {
        self.granted.get(tag).copied().unwrap_or(0)
    }

    /// Adds one grant for each tag. Returns true if the effective set changed.
    pub fn grant(&mut self, tags: &TagSet) -> bool {
        for tag in tags {
            *self.granted.entry(tag.clone()).or_insert(0) += 1;
        }
        self.rebuild()
    }

    /// Drops one grant for each tag. Tags whose count reaches zero leave the
    /// set unless also held as loose tags.
    pub fn revoke(&mut self, tags: &TagSet) -> bool {
        for tag in tags {
            if let Some(count) = self.granted.get_mut(tag) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.granted.remove(tag);
                }
            }
        }
        self.rebuild()
    }

    pub fn add_loose(&mut self, tag: GameplayTag) -> bool {
        self.loose.add(tag);
        self.rebuild()
    }

    /// Removes a loose tag and its loose descendants. Granted tags are untouched.
    pub fn remove_loose(&mut self, tag: &GameplayTag) -> bool {
        self.loose.remove(tag);
        self.rebuild()
    }

    fn rebuild(&mut self) -> bool {
        let mut next: TagSet = self.granted.keys().cloned().collect();
        next.extend(&self.loose);
        let changed = next != self.combined;
        self.combined = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_grant_survives_single_revoke() {
        let mut owned = OwnedTags::new();
        let slow = TagSet::from_iter(["Buff.DeBuff.Slow"]);

        assert!(owned.grant(&slow));
        assert!(!owned.grant(&slow));
        assert_eq!(owned.grant_count(&GameplayTag::new("Buff.DeBuff.Slow")), 2);

        assert!(!owned.revoke(&slow));
        assert!(owned.has_tag(&GameplayTag::new("Buff.DeBuff")));

        assert!(owned.revoke(&slow));
        assert!(owned.as_set().is_empty());
    }

    #[test]
    fn loose_and_granted_tags_are_independent() {
        let mut owned = OwnedTags::new();
        owned.grant(&TagSet::from_iter(["State.Stunned"]));
        owned.add_loose(GameplayTag::new("State.Stunned"));

        assert!(!owned.remove_loose(&GameplayTag::new("State")));
        assert!(owned.has_tag(&GameplayTag::new("State.Stunned")));

        owned.revoke(&TagSet::from_iter(["State.Stunned"]));
        assert!(!owned.has_tag(&GameplayTag::new("State")));
    }

    #[test]
    fn revoking_unknown_tag_is_harmless() {
        let mut owned = OwnedTags::new();
        assert!(!owned.revoke(&TagSet::from_iter(["Missing"])));
    }
}
