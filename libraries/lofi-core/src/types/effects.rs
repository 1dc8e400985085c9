//! Effect selection and playback rate

use crate::error::{LofiError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five selectable effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectName {
    /// Low-pass coloration at 3 kHz
    Lofi,
    /// Looping vinyl hiss and pops
    VinylCrackle,
    /// Synthetic convolution reverb
    Reverb,
    /// Tempo slow-down (rate × 0.8)
    SlowedDown,
    /// Mid boost plus warmth filter
    Jazz,
}

impl EffectName {
    /// Every effect, in graph application order
    pub const ALL: [Self; 5] = [
        Self::Lofi,
        Self::Jazz,
        Self::Reverb,
        Self::VinylCrackle,
        Self::SlowedDown,
    ];

    /// Stable identifier used in persistence and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lofi => "lofi",
            Self::VinylCrackle => "vinylCrackle",
            Self::Reverb => "reverb",
            Self::SlowedDown => "slowedDown",
            Self::Jazz => "jazz",
        }
    }
}

impl fmt::Display for EffectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectName {
    type Err = LofiError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "lofi" => Ok(Self::Lofi),
            "vinylcrackle" | "vinyl" | "crackle" => Ok(Self::VinylCrackle),
            "reverb" => Ok(Self::Reverb),
            "sloweddown" | "slowed" | "slow" => Ok(Self::SlowedDown),
            "jazz" => Ok(Self::Jazz),
            _ => Err(LofiError::invalid_input(format!("unknown effect: {s}"))),
        }
    }
}

/// The set of enabled effects
///
/// Any subset is valid. The order effects are applied in is fixed by the
/// graph builder, not by the order they were enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectSet {
    pub lofi: bool,
    pub vinyl_crackle: bool,
    pub reverb: bool,
    pub slowed_down: bool,
    pub jazz: bool,
}

impl EffectSet {
    /// Check whether an effect is enabled
    pub fn is_enabled(&self, name: EffectName) -> bool {
        match name {
            EffectName::Lofi => self.lofi,
            EffectName::VinylCrackle => self.vinyl_crackle,
            EffectName::Reverb => self.reverb,
            EffectName::SlowedDown => self.slowed_down,
            EffectName::Jazz => self.jazz,
        }
    }

    /// Enable or disable an effect
    pub fn set(&mut self, name: EffectName, enabled: bool) {
        let flag = match name {
            EffectName::Lofi => &mut self.lofi,
            EffectName::VinylCrackle => &mut self.vinyl_crackle,
            EffectName::Reverb => &mut self.reverb,
            EffectName::SlowedDown => &mut self.slowed_down,
            EffectName::Jazz => &mut self.jazz,
        };
        *flag = enabled;
    }

    /// Flip an effect, returning its new state
    pub fn toggle(&mut self, name: EffectName) -> bool {
        let enabled = !self.is_enabled(name);
        self.set(name, enabled);
        enabled
    }

    /// Enabled effects in application order
    pub fn enabled(&self) -> impl Iterator<Item = EffectName> + '_ {
        EffectName::ALL
            .into_iter()
            .filter(move |name| self.is_enabled(*name))
    }
}

/// User-selected base playback rate
///
/// Always within `[MIN, MAX]`. The rate actually applied to the source is
/// [`BaseRate::effective`], which folds in the slowed-down effect.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BaseRate(f64);

impl BaseRate {
    /// Lowest accepted base rate
    pub const MIN: f64 = 0.5;
    /// Highest accepted base rate
    pub const MAX: f64 = 1.0;
    /// Rate used when nothing has been configured
    pub const DEFAULT: f64 = 0.85;
    /// Multiplier applied while slowed-down is enabled
    pub const SLOWED_FACTOR: f64 = 0.8;

    /// Create a base rate, clamping into `[MIN, MAX]`
    ///
    /// # Errors
    /// Returns `InvalidInput` for NaN or infinite values.
    pub fn new(rate: f64) -> Result<Self> {
        if !rate.is_finite() {
            return Err(LofiError::invalid_input(format!(
                "playback rate must be finite, got {rate}"
            )));
        }
        Ok(Self(rate.clamp(Self::MIN, Self::MAX)))
    }

    /// Raw base rate
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Rate applied to the source given the enabled effects
    pub fn effective(&self, effects: &EffectSet) -> f64 {
        if effects.slowed_down {
            self.0 * Self::SLOWED_FACTOR
        } else {
            self.0
        }
    }
}

impl Default for BaseRate {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f64> for BaseRate {
    type Error = LofiError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BaseRate> for f64 {
    fn from(rate: BaseRate) -> Self {
        rate.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_effect_names() {
        assert_eq!("lofi".parse::<EffectName>().unwrap(), EffectName::Lofi);
        assert_eq!(
            "vinylCrackle".parse::<EffectName>().unwrap(),
            EffectName::VinylCrackle
        );
        assert_eq!(
            "vinyl-crackle".parse::<EffectName>().unwrap(),
            EffectName::VinylCrackle
        );
        assert_eq!(
            "SLOWED_DOWN".parse::<EffectName>().unwrap(),
            EffectName::SlowedDown
        );
        assert_eq!("Jazz".parse::<EffectName>().unwrap(), EffectName::Jazz);
        assert!("chorus".parse::<EffectName>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for name in EffectName::ALL {
            assert_eq!(name.to_string().parse::<EffectName>().unwrap(), name);
        }
    }

    #[test]
    fn toggle_flips_exactly_one_bit() {
        let mut effects = EffectSet::default();
        assert!(effects.toggle(EffectName::Reverb));
        assert!(effects.reverb);
        assert!(!effects.lofi && !effects.jazz && !effects.vinyl_crackle && !effects.slowed_down);

        assert!(!effects.toggle(EffectName::Reverb));
        assert_eq!(effects, EffectSet::default());
    }

    #[test]
    fn enabled_iterates_in_application_order() {
        let mut effects = EffectSet::default();
        effects.set(EffectName::Reverb, true);
        effects.set(EffectName::Lofi, true);
        effects.set(EffectName::Jazz, true);

        let order: Vec<_> = effects.enabled().collect();
        assert_eq!(
            order,
            vec![EffectName::Lofi, EffectName::Jazz, EffectName::Reverb]
        );
    }

    #[test]
    fn effect_set_serializes_camel_case() {
        let mut effects = EffectSet::default();
        effects.vinyl_crackle = true;
        let json = serde_json::to_value(effects).unwrap();
        assert_eq!(json["vinylCrackle"], true);
        assert_eq!(json["slowedDown"], false);
    }

    #[test]
    fn effective_rate_law() {
        let base = BaseRate::default();
        let mut effects = EffectSet::default();
        assert!((base.effective(&effects) - 0.85).abs() < 1e-6);

        effects.slowed_down = true;
        assert!((base.effective(&effects) - 0.68).abs() < 1e-6);
    }

    #[test]
    fn base_rate_clamps_and_rejects_non_finite() {
        assert_eq!(BaseRate::new(2.0).unwrap().value(), BaseRate::MAX);
        assert_eq!(BaseRate::new(0.1).unwrap().value(), BaseRate::MIN);
        assert!(BaseRate::new(f64::NAN).is_err());
        assert!(BaseRate::new(f64::INFINITY).is_err());
    }

    #[test]
    fn base_rate_deserialization_clamps() {
        let rate: BaseRate = serde_json::from_str("3.5").unwrap();
        assert_eq!(rate.value(), BaseRate::MAX);
    }

    proptest! {
        #[test]
        fn base_rate_always_in_range(rate in -10.0f64..10.0) {
            let base = BaseRate::new(rate).unwrap();
            prop_assert!(base.value() >= BaseRate::MIN);
            prop_assert!(base.value() <= BaseRate::MAX);
        }

        #[test]
        fn slowed_down_is_multiplicative(rate in 0.5f64..=1.0) {
            let base = BaseRate::new(rate).unwrap();
            let effects = EffectSet { slowed_down: true, ..EffectSet::default() };
            prop_assert!((base.effective(&effects) - rate * 0.8).abs() < 1e-12);
        }
    }
}
