use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::asset::{AssetProvider, ProviderRegistry};
use super::error::{Result, SimError};
use super::metric::RecordedMetric;
use super::portfolio::Portfolio;
use super::strategy::Strategy;
use super::types::Asset;

/// Upper bound on steps in one run.
pub const MAX_STEPS: f64 = 1_000_000.0;

/// Static parameters of a run.
#[derive(Debug)]
pub struct SimulationConfig {
    /// Step size in years.
    pub increment: f64,
    pub start_year: f64,
    pub end_year: f64,
    pub asset_provider_mapping: ProviderRegistry,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.increment.is_finite() || self.increment <= 0.0 {
            return Err(SimError::invalid_config("increment must be a finite value > 0"));
        }
        if !self.start_year.is_finite() || !self.end_year.is_finite() {
            return Err(SimError::invalid_config("start_year and end_year must be finite"));
        }
        if self.end_year < self.start_year {
            return Err(SimError::invalid_config("end_year must be >= start_year"));
        }
        let steps = ((self.end_year - self.start_year) / self.increment).ceil();
        if steps > MAX_STEPS {
            return Err(SimError::invalid_config(format!(
                "range of {steps} steps exceeds the limit of {MAX_STEPS}; use a larger increment"
            )));
        }
        Ok(())
    }

    /// Years at which a step runs: every `start_year + k * increment` strictly
    /// below `end_year`, as a stepped numeric range yields them.
    ///
    /// When the range is not a whole number of increments nothing is added to land
    /// on `end_year`; the remainder past the last whole step is never simulated.
    pub fn step_years(&self) -> Vec<f64> {
        let span = self.end_year - self.start_year;
        let steps = (span / self.increment).ceil().max(0.0) as usize;
        (0..steps)
            .map(|k| self.start_year + k as f64 * self.increment)
            .collect()
    }
}

/// Runs strategies and metrics over a portfolio scoped to the assets they ask for.
///
/// Strategies carry state between steps, so a simulation runs once;
/// [`Simulation::run`] consumes it and hands back the recorded metrics.
#[derive(Debug)]
pub struct Simulation {
    metrics: Vec<RecordedMetric>,
    strategies: Vec<Box<dyn Strategy>>,
    increment: f64,
    start_year: f64,
    step_years: Vec<f64>,
    providers: BTreeMap<Asset, Box<dyn AssetProvider>>,
}

impl Simulation {
    pub fn new(
        metrics: Vec<RecordedMetric>,
        strategies: Vec<Box<dyn Strategy>>,
        config: &SimulationConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut collected_assets = BTreeSet::new();
        for strategy in &strategies {
            collected_assets.extend(strategy.requested_assets());
        }
        for metric in &metrics {
            collected_assets.extend(metric.requested_assets());
        }

        let providers = collected_assets
            .into_iter()
            .map(|asset| {
                config
                    .asset_provider_mapping
                    .get(&asset)
                    .map(|provider| (asset, provider.fresh()))
                    .ok_or(SimError::MissingProvider(asset))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            metrics,
            strategies,
            increment: config.increment,
            start_year: config.start_year,
            step_years: config.step_years(),
            providers,
        })
    }

    pub fn run(mut self) -> Result<Vec<RecordedMetric>> {
        let increment = self.increment;
        let mut portfolio = Portfolio::new(self.providers);

        info!(
            start_year = self.start_year,
            steps = self.step_years.len(),
            increment,
            assets = ?portfolio.tracked_assets().collect::<Vec<_>>(),
            "simulation started"
        );

        portfolio.initialise(self.start_year);
        for &year in &self.step_years {
            debug!(year, "step");
            for strategy in &mut self.strategies {
                strategy.update_income(&mut portfolio.income, year, increment);
            }
            for strategy in &mut self.strategies {
                strategy.update_expenses(&mut portfolio.expenses, year, increment);
            }
            for strategy in &mut self.strategies {
                strategy.execute(&mut portfolio, year, increment)?;
            }

            for metric in &mut self.metrics {
                metric.record(&portfolio, year);
            }
            portfolio.advance(year, increment);
        }

        info!(final_value = portfolio.current_value(), "simulation finished");
        Ok(self.metrics)
    }

    /// Assets the run tracks: the union of everything strategies and metrics requested.
    pub fn tracked_assets(&self) -> impl Iterator<Item = Asset> + '_ {
        self.providers.keys().copied()
    }
}
