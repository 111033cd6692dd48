use crate::ids::EffectHandle;

/// How a modifier combines with the attribute's base value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierOp {
    /// Summed with every other Add, then added to base.
    Add,
    /// Multiplies `base + ΣAdd`. Several multipliers compound.
    Multiply,
    /// Replaces the result entirely. Last one applied wins.
    Override,
}

/// A live modifier as stored on an attribute.
///
/// `(source, slot)` identifies the modifier: `slot` is the index of the
/// modifier within the owning effect's definition.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AppliedModifier {
    pub op: ModifierOp,
    pub magnitude: f32,
    pub source: EffectHandle,
    pub slot: u32,
}

impl AppliedModifier {
    pub fn new(op: ModifierOp, magnitude: f32, source: EffectHandle, slot: u32) -> Self {
        Self {
            op,
            magnitude,
            source,
            slot,
        }
    }

    pub fn key(&self) -> (EffectHandle, u32) {
        (self.source, self.slot)
    }
}

/// Combines modifiers with a base value.
///
/// ```text
/// result = Override_last  if any Override
///        = (base + ΣAdd) × ΠMultiply  otherwise
/// ```
///
/// No clamping happens here; the caller clamps the result.
pub fn aggregate(base: f32, modifiers: &[AppliedModifier]) -> f32 {
    let mut add_sum = 0.0_f32;
    let mut multiplier = 1.0_f32;
    let mut override_value = None;

    for modifier in modifiers {
        match modifier.op {
            ModifierOp::Add => add_sum += modifier.magnitude,
            ModifierOp::Multiply => multiplier *= modifier.magnitude,
            ModifierOp::Override => override_value = Some(modifier.magnitude),
        }
    }

    override_value.unwrap_or((base + add_sum) * multiplier)
}
