use std::collections::BTreeMap;
use std::fmt;

use super::types::Asset;

/// Owns the unit value of one asset class over simulated time.
pub trait AssetProvider: fmt::Debug + Send + Sync {
    /// Advance the unit value to `year`.
    ///
    /// Before the call `value()` is the value at `year - increment`, after it the
    /// value at `year`. A NaN `increment` is the initialisation call and must set
    /// the starting value.
    fn update_value(&mut self, year: f64, increment: f64);

    fn value(&self) -> f64;

    /// A new, independent provider in its just-constructed state.
    fn fresh(&self) -> Box<dyn AssetProvider>;
}

/// Every asset the system knows how to price, keyed by tag.
///
/// Entries are prototypes: runs take `fresh()` copies and never mutate the registry.
pub type ProviderRegistry = BTreeMap<Asset, Box<dyn AssetProvider>>;

/// Grows by a constant yearly rate, compounded geometrically for fractional steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantGeomIncreaseAsset {
    starting_value: f64,
    // 0.05 is 5% growth per year
    growth_rate: f64,
    value: f64,
}

impl ConstantGeomIncreaseAsset {
    pub fn new(starting_value: f64, growth_rate: f64) -> Self {
        Self {
            starting_value,
            growth_rate,
            value: starting_value,
        }
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }
}

impl AssetProvider for ConstantGeomIncreaseAsset {
    fn update_value(&mut self, _year: f64, increment: f64) {
        if increment.is_nan() {
            self.value = self.starting_value;
        } else {
            self.value *= (1.0 + self.growth_rate).powf(increment);
        }
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn fresh(&self) -> Box<dyn AssetProvider> {
        Box::new(Self::new(self.starting_value, self.growth_rate))
    }
}
