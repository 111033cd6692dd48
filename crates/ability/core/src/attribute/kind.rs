use super::Attributes;

/// Closed set of numeric attributes a unit may carry.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeKind {
    Health,
    MaxHealth,
    Mana,
    MaxMana,
    Attack,
    Defense,
    CritRate,
    CritDamage,
    MoveSpeed,
    AttackSpeed,
}

impl AttributeKind {
    /// Attributes whose clamp depends on this one and must be re-clamped when
    /// it changes.
    pub const fn dependants(self) -> &'static [AttributeKind] {
        match self {
            Self::MaxHealth => &[Self::Health],
            Self::MaxMana => &[Self::Mana],
            _ => &[],
        }
    }

    /// Upper bound attribute, if this kind is a pool.
    pub const fn maximum(self) -> Option<AttributeKind> {
        match self {
            Self::Health => Some(Self::MaxHealth),
            Self::Mana => Some(Self::MaxMana),
            _ => None,
        }
    }
}

/// Clamp policy applied after every recomputation and base mutation.
///
/// Receives the unclamped value and the owning attribute set, so bounds may
/// depend on other attributes.
pub type ClampHook = fn(AttributeKind, f32, &Attributes) -> f32;

/// Default clamp policy.
///
/// - Health in `[0, MaxHealth]`, Mana in `[0, MaxMana]` (upper bound only when
///   the maximum attribute exists)
/// - CritRate in `[0, 1]`
/// - everything else floored at zero
pub fn default_clamp(kind: AttributeKind, value: f32, attributes: &Attributes) -> f32 {
    match kind {
        AttributeKind::CritRate => value.clamp(0.0, 1.0),
        _ => {
            let floored = value.max(0.0);
            match kind.maximum().and_then(|max| attributes.get_current_value(max)) {
                Some(upper) => floored.min(upper.max(0.0)),
                None => floored,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in AttributeKind::iter() {
            let name: &'static str = kind.into();
            assert_eq!(AttributeKind::from_str(name).unwrap(), kind);
        }
        assert!(AttributeKind::from_str("Stamina").is_err());
    }

    #[test]
    fn pools_clamp_against_their_maximum() {
        let mut attrs = Attributes::new();
        attrs.add_attribute(AttributeKind::MaxHealth, 100.0);
        assert_eq!(default_clamp(AttributeKind::Health, 130.0, &attrs), 100.0);
        assert_eq!(default_clamp(AttributeKind::Health, -5.0, &attrs), 0.0);
        assert_eq!(default_clamp(AttributeKind::Mana, 500.0, &attrs), 500.0);
        assert_eq!(default_clamp(AttributeKind::CritRate, 1.5, &attrs), 1.0);
        assert_eq!(default_clamp(AttributeKind::Attack, -3.0, &attrs), 0.0);
    }
}
