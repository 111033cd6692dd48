use std::collections::BTreeMap;

use super::{EffectDefinition, EffectInstance, EffectPurpose, StackType};
use crate::ids::{EffectHandle, UnitId};

/// Active effect instances of one unit, keyed by handle.
///
/// Iteration follows handle order, which is application order.
#[derive(Clone, Debug, Default)]
pub struct ActiveEffects {
    instances: BTreeMap<EffectHandle, EffectInstance>,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, handle: EffectHandle) -> Option<&EffectInstance> {
        self.instances.get(&handle)
    }

    pub fn contains(&self, handle: EffectHandle) -> bool {
        self.instances.contains_key(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectInstance> {
        self.instances.values()
    }

    pub fn handles(&self) -> Vec<EffectHandle> {
        self.instances.keys().copied().collect()
    }

    /// Instances of the definition with the given id.
    pub fn with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EffectInstance> + 'a {
        self.instances
            .values()
            .filter(move |instance| instance.definition.id == id)
    }

    /// Total stacks across instances of the definition with the given id.
    pub fn stack_count(&self, id: &str) -> u32 {
        self.with_id(id).map(|instance| instance.stack_count).sum()
    }

    pub fn with_purpose(&self, purpose: EffectPurpose) -> Option<&EffectInstance> {
        self.instances
            .values()
            .find(|instance| instance.purpose == purpose)
    }

    /// Existing instance an application of `definition` from `source` would
    /// aggregate into.
    pub fn find_stack(
        &self,
        definition: &EffectDefinition,
        source: UnitId,
    ) -> Option<EffectHandle> {
        let matches_key = |instance: &&EffectInstance| {
            instance.definition.id == definition.id
                && match definition.stacking.stack_type {
                    StackType::None => false,
                    StackType::AggregateBySource => instance.source == source,
                    StackType::AggregateByTarget => true,
                }
        };
        self.instances
            .values()
            .find(matches_key)
            .map(|instance| instance.handle)
    }

    pub(crate) fn get_mut(&mut self, handle: EffectHandle) -> Option<&mut EffectInstance> {
        self.instances.get_mut(&handle)
    }

    pub(crate) fn insert(&mut self, instance: EffectInstance) {
        self.instances.insert(instance.handle, instance);
    }

    pub(crate) fn remove(&mut self, handle: EffectHandle) -> Option<EffectInstance> {
        self.instances.remove(&handle)
    }
}
