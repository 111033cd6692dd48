//! Per-unit numeric attributes with layered modifiers.
//!
//! Every attribute holds a `base` value, the ordered list of modifiers that
//! active effects placed on it, and a derived `current` value. `current` is
//! recomputed synchronously on every base or modifier change, so readers never
//! observe a stale value.
//!
//! Recompute order (see [`aggregate`]):
//! 1. Add modifiers summed
//! 2. Multiply modifiers applied to `base + ΣAdd`
//! 3. Override replaces the result (last inserted wins)
//! 4. Clamp via the [`ClampHook`]
//!
//! Clamping is never part of aggregation. Removing a modifier recomputes from
//! scratch, so apply-then-remove restores the previous value exactly. Pools
//! (Health, Mana) are the exception: when their maximum changes, their base is
//! re-clamped too, and raising the maximum again does not refill them.

mod kind;
mod modifier;

pub use kind::{AttributeKind, ClampHook, default_clamp};
pub use modifier::{AppliedModifier, ModifierOp, aggregate};

use std::collections::BTreeMap;

use tracing::warn;

use crate::ids::EffectHandle;

/// One live attribute.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeValue {
    pub base: f32,
    pub modifiers: Vec<AppliedModifier>,
    pub current: f32,
}

impl AttributeValue {
    fn new(base: f32) -> Self {
        Self {
            base,
            modifiers: Vec::new(),
            current: base,
        }
    }
}

/// Attribute set owned by one ability system component.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    values: BTreeMap<AttributeKind, AttributeValue>,
    #[cfg_attr(feature = "serde", serde(skip, default = "default_clamp_hook"))]
    clamp: ClampHook,
}

#[cfg(feature = "serde")]
fn default_clamp_hook() -> ClampHook {
    default_clamp
}

impl Default for Attributes {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Attributes {
    pub fn new() -> Self {
        Self::with_clamp(default_clamp)
    }

    pub fn with_clamp(clamp: ClampHook) -> Self {
        Self {
            values: BTreeMap::new(),
            clamp,
        }
    }

    /// Seeds a set from `(kind, base)` pairs.
    pub fn from_values(values: impl IntoIterator<Item = (AttributeKind, f32)>) -> Self {
        let mut attributes = Self::new();
        for (kind, base) in values {
            attributes.add_attribute(kind, base);
        }
        attributes
    }

    pub fn set_clamp_hook(&mut self, clamp: ClampHook) {
        self.clamp = clamp;
        let kinds: Vec<_> = self.values.keys().copied().collect();
        for kind in kinds {
            self.recompute(kind);
        }
    }

    /// Adds an attribute. Returns false (and logs) if it already exists.
    pub fn add_attribute(&mut self, kind: AttributeKind, initial: f32) -> bool {
        if self.values.contains_key(&kind) {
            warn!(attribute = %kind, "attribute already present, ignoring add");
            return false;
        }
        self.values.insert(kind, AttributeValue::new(initial));
        self.recompute(kind);
        true
    }

    pub fn contains(&self, kind: AttributeKind) -> bool {
        self.values.contains_key(&kind)
    }

    pub fn get_current_value(&self, kind: AttributeKind) -> Option<f32> {
        self.values.get(&kind).map(|value| value.current)
    }

    pub fn get_base_value(&self, kind: AttributeKind) -> Option<f32> {
        self.values.get(&kind).map(|value| value.base)
    }

    pub fn get(&self, kind: AttributeKind) -> Option<&AttributeValue> {
        self.values.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeKind, &AttributeValue)> {
        self.values.iter().map(|(kind, value)| (*kind, value))
    }

    /// Overwrites the base value. Returns false if the attribute is missing.
    pub fn set_base_value(&mut self, kind: AttributeKind, base: f32) -> bool {
        let clamped = (self.clamp)(kind, base, self);
        match self.values.get_mut(&kind) {
            Some(value) => {
                value.base = clamped;
                self.recompute(kind);
                true
            }
            None => false,
        }
    }

    /// Permanently mutates the base value, as instant effects do.
    ///
    /// The new base is clamped before recomputation. Returns the resulting
    /// current value, or `None` if the attribute is missing.
    pub fn apply_instant(
        &mut self,
        kind: AttributeKind,
        op: ModifierOp,
        magnitude: f32,
    ) -> Option<f32> {
        let base = self.get_base_value(kind)?;
        let next = match op {
            ModifierOp::Add => base + magnitude,
            ModifierOp::Multiply => base * magnitude,
            ModifierOp::Override => magnitude,
        };
        self.set_base_value(kind, next);
        self.get_current_value(kind)
    }

    /// Appends a modifier. Returns false if the attribute is missing.
    pub fn apply_modifier(&mut self, kind: AttributeKind, modifier: AppliedModifier) -> bool {
        match self.values.get_mut(&kind) {
            Some(value) => {
                value.modifiers.push(modifier);
                self.recompute(kind);
                true
            }
            None => false,
        }
    }

    /// Removes the modifier identified by `(source, slot)`.
    pub fn remove_modifier(
        &mut self,
        kind: AttributeKind,
        source: EffectHandle,
        slot: u32,
    ) -> bool {
        let Some(value) = self.values.get_mut(&kind) else {
            return false;
        };
        let before = value.modifiers.len();
        value.modifiers.retain(|m| m.key() != (source, slot));
        let removed = value.modifiers.len() != before;
        if removed {
            self.recompute(kind);
        }
        removed
    }

    /// Removes every modifier placed by `source` across all attributes.
    ///
    /// Returns the number of modifiers removed.
    pub fn remove_modifiers_from(&mut self, source: EffectHandle) -> usize {
        let mut touched = Vec::new();
        let mut removed = 0;
        for (kind, value) in self.values.iter_mut() {
            let before = value.modifiers.len();
            value.modifiers.retain(|m| m.source != source);
            if value.modifiers.len() != before {
                removed += before - value.modifiers.len();
                touched.push(*kind);
            }
        }
        for kind in touched {
            self.recompute(kind);
        }
        removed
    }

    /// Changes the magnitude of an existing modifier in place, keeping its
    /// position in the insertion order.
    pub fn update_modifier(
        &mut self,
        kind: AttributeKind,
        source: EffectHandle,
        slot: u32,
        magnitude: f32,
    ) -> bool {
        let Some(value) = self.values.get_mut(&kind) else {
            return false;
        };
        let Some(modifier) = value.modifiers.iter_mut().find(|m| m.key() == (source, slot)) else {
            return false;
        };
        if modifier.magnitude == magnitude {
            return true;
        }
        modifier.magnitude = magnitude;
        self.recompute(kind);
        true
    }

    /// The only code path writing `current`.
    fn recompute(&mut self, kind: AttributeKind) {
        let Some(value) = self.values.get(&kind) else {
            return;
        };
        let raw = aggregate(value.base, &value.modifiers);
        let clamped = (self.clamp)(kind, raw, self);
        if let Some(value) = self.values.get_mut(&kind) {
            value.current = clamped;
        }
        for dependant in kind.dependants() {
            self.reclamp_base(*dependant);
            self.recompute(*dependant);
        }
    }

    /// Clamps a pool's base against its maximum's current value.
    fn reclamp_base(&mut self, kind: AttributeKind) {
        let Some(base) = self.get_base_value(kind) else {
            return;
        };
        let clamped = (self.clamp)(kind, base, self);
        if let Some(value) = self.values.get_mut(&kind) {
            value.base = clamped;
        }
    }
}
