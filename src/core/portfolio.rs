use std::collections::BTreeMap;

use super::asset::AssetProvider;
use super::error::{Result, SimError};
use super::types::{Asset, Expense, Income};

pub type IncomeBook = BTreeMap<Income, f64>;
pub type ExpenseBook = BTreeMap<Expense, f64>;

/// Mutable state for one simulation run: holdings, priced by their providers,
/// plus the current step's annualised income and expense flows.
#[derive(Debug)]
pub struct Portfolio {
    providers: BTreeMap<Asset, Box<dyn AssetProvider>>,
    // units held; keys always match `providers`
    asset_holdings: BTreeMap<Asset, f64>,
    pub income: IncomeBook,
    pub expenses: ExpenseBook,
}

impl Portfolio {
    pub fn new(providers: BTreeMap<Asset, Box<dyn AssetProvider>>) -> Self {
        let asset_holdings = providers.keys().map(|asset| (*asset, 0.0)).collect();
        Self {
            providers,
            asset_holdings,
            income: IncomeBook::new(),
            expenses: ExpenseBook::new(),
        }
    }

    /// Add to a holding, either by cash (converted at the current unit value) or by units.
    /// Exactly one of the two must be given.
    pub fn add(&mut self, asset: Asset, cash: Option<f64>, units: Option<f64>) -> Result<()> {
        let added_units = match (cash, units) {
            (None, None) => {
                return Err(SimError::invalid_argument(format!(
                    "nothing to add to {asset}: neither cash nor units given"
                )));
            }
            (Some(_), Some(_)) => {
                return Err(SimError::invalid_argument(format!(
                    "ambiguous add to {asset}: both cash and units given"
                )));
            }
            (None, Some(units)) => units,
            (Some(cash), None) => cash / self.asset_value_per_unit(asset)?,
        };

        let held = self
            .asset_holdings
            .get_mut(&asset)
            .ok_or(SimError::UnknownAsset(asset))?;
        *held += added_units;
        Ok(())
    }

    pub fn add_cash(&mut self, asset: Asset, cash: f64) -> Result<()> {
        self.add(asset, Some(cash), None)
    }

    pub fn add_units(&mut self, asset: Asset, units: f64) -> Result<()> {
        self.add(asset, None, Some(units))
    }

    pub fn current_value(&self) -> f64 {
        self.asset_holdings
            .iter()
            .map(|(asset, units)| units * self.providers[asset].value())
            .sum()
    }

    pub fn asset_value_per_unit(&self, asset: Asset) -> Result<f64> {
        self.providers
            .get(&asset)
            .map(|provider| provider.value())
            .ok_or(SimError::UnknownAsset(asset))
    }

    pub fn units_of_asset_held(&self, asset: Asset) -> Result<f64> {
        self.asset_holdings
            .get(&asset)
            .copied()
            .ok_or(SimError::UnknownAsset(asset))
    }

    pub fn cash_of_asset_held(&self, asset: Asset) -> Result<f64> {
        Ok(self.units_of_asset_held(asset)? * self.asset_value_per_unit(asset)?)
    }

    /// Held units per asset, in asset order.
    pub fn holdings(&self) -> impl Iterator<Item = (Asset, f64)> + '_ {
        self.asset_holdings.iter().map(|(asset, units)| (*asset, *units))
    }

    /// Held units per asset with the current unit value, in asset order.
    pub fn priced_holdings(&self) -> impl Iterator<Item = (Asset, f64, f64)> + '_ {
        self.asset_holdings
            .iter()
            .map(|(asset, units)| (*asset, *units, self.providers[asset].value()))
    }

    pub fn tracked_assets(&self) -> impl Iterator<Item = Asset> + '_ {
        self.providers.keys().copied()
    }

    pub fn total_income(&self) -> f64 {
        self.income.values().sum()
    }

    pub fn total_expenses(&self) -> f64 {
        self.expenses.values().sum()
    }

    /// Initialisation call on every provider, establishing starting values.
    pub fn initialise(&mut self, year: f64) {
        self.advance(year, f64::NAN);
    }

    pub fn advance(&mut self, year: f64, increment: f64) {
        for provider in self.providers.values_mut() {
            provider.update_value(year, increment);
        }
    }
}
