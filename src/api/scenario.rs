//! Scenario documents: the JSON form of a simulation config together with the
//! strategies and metrics to run against it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::core::{
    Asset, AssetProvider, BusinessConstant, CareerExponential, CashflowStatement,
    CombinedStrategy, ConstantGeomIncreaseAsset, EarnPostTaxIncome, FIReached, FixedRent,
    FixedYearlyInvestmentStrategy, HoldingsByAsset, InvestFractionOfCashAfterBuffer,
    LimitedDurationStrategy, ProviderRegistry, RecordedMetric, RentalConstant, Result, SimError,
    SimpleSpendingWithCreep, Simulation, SimulationConfig, Strategy, TotalAssets, UkTaxRules,
};

const DEFAULT_HORIZON_YEARS: f64 = 50.0;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    #[serde(default = "default_increment")]
    increment: f64,
    start_year: Option<f64>,
    end_year: Option<f64>,
    asset_providers: BTreeMap<Asset, ProviderSpec>,
    #[serde(default)]
    strategies: Vec<StrategySpec>,
    #[serde(default)]
    metrics: Vec<MetricSpec>,
}

fn default_increment() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ProviderSpec {
    ConstantGeomIncrease { starting_value: f64, growth_rate: f64 },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StrategySpec {
    Combined {
        children: Vec<StrategySpec>,
    },
    LimitedDuration {
        child: Box<StrategySpec>,
        start: Option<f64>,
        end: Option<f64>,
        #[serde(default = "default_relative")]
        relative: bool,
    },
    FixedYearlyInvestment {
        asset: Asset,
        amount: f64,
    },
    EarnPostTaxIncome {
        #[serde(default)]
        tax_rules: UkTaxRules,
    },
    CareerExponential {
        starting_salary: f64,
        growth_rate: f64,
    },
    BusinessConstant {
        yearly_profit: f64,
    },
    RentalConstant {
        yearly_rent: f64,
    },
    FixedRent {
        yearly_rent: f64,
    },
    InvestFractionOfCashAfterBuffer {
        buffer_per_yearly_expenses: f64,
        allocation: BTreeMap<Asset, f64>,
    },
    SimpleSpendingWithCreep {
        starting_spending: f64,
        creep_rate: f64,
    },
}

fn default_relative() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum MetricSpec {
    TotalAssets,
    HoldingsByAsset,
    FiReached { withdrawal_rate: f64 },
    CashflowStatement,
}

/// A validated scenario, ready to run once.
#[derive(Debug)]
pub struct Scenario {
    pub config: SimulationConfig,
    pub strategies: Vec<Box<dyn Strategy>>,
    pub metrics: Vec<RecordedMetric>,
}

impl Scenario {
    pub fn into_simulation(self) -> Result<Simulation> {
        Simulation::new(self.metrics, self.strategies, &self.config)
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.display().to_string(),
        source,
    })?;
    scenario_from_json(&json)
}

pub fn scenario_from_json(json: &str) -> Result<Scenario> {
    let file = serde_json::from_str::<ScenarioFile>(json)
        .map_err(|e| SimError::invalid_config(format!("invalid scenario JSON: {e}")))?;
    build_scenario(file)
}

fn build_scenario(file: ScenarioFile) -> Result<Scenario> {
    let start_year = file
        .start_year
        .unwrap_or_else(|| f64::from(Utc::now().year()));
    let end_year = file.end_year.unwrap_or(start_year + DEFAULT_HORIZON_YEARS);

    let config = SimulationConfig {
        increment: file.increment,
        start_year,
        end_year,
        asset_provider_mapping: build_registry(file.asset_providers)?,
    };
    config.validate()?;

    let strategies = file
        .strategies
        .into_iter()
        .map(build_strategy)
        .collect::<Result<Vec<_>>>()?;
    let metrics = file
        .metrics
        .into_iter()
        .map(build_metric)
        .collect::<Result<Vec<_>>>()?;

    Ok(Scenario {
        config,
        strategies,
        metrics,
    })
}

fn build_registry(specs: BTreeMap<Asset, ProviderSpec>) -> Result<ProviderRegistry> {
    specs
        .into_iter()
        .map(|(asset, spec)| {
            let provider: Box<dyn AssetProvider> = match spec {
                ProviderSpec::ConstantGeomIncrease {
                    starting_value,
                    growth_rate,
                } => {
                    if !starting_value.is_finite() || starting_value <= 0.0 {
                        return Err(SimError::invalid_config(format!(
                            "{asset}: starting_value must be a finite value > 0"
                        )));
                    }
                    if !growth_rate.is_finite() || growth_rate <= -1.0 {
                        return Err(SimError::invalid_config(format!(
                            "{asset}: growth_rate must be a finite value > -1"
                        )));
                    }
                    Box::new(ConstantGeomIncreaseAsset::new(starting_value, growth_rate))
                }
            };
            Ok((asset, provider))
        })
        .collect()
}

fn build_strategy(spec: StrategySpec) -> Result<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match spec {
        StrategySpec::Combined { children } => Box::new(CombinedStrategy::new(
            children
                .into_iter()
                .map(build_strategy)
                .collect::<Result<Vec<_>>>()?,
        )),
        StrategySpec::LimitedDuration {
            child,
            start,
            end,
            relative,
        } => {
            if let (Some(start), Some(end)) = (start, end)
                && end < start
            {
                return Err(SimError::invalid_config(format!(
                    "limited_duration: end {end} is before start {start}"
                )));
            }
            Box::new(LimitedDurationStrategy::new(
                build_strategy(*child)?,
                start,
                end,
                relative,
            ))
        }
        StrategySpec::FixedYearlyInvestment { asset, amount } => {
            Box::new(FixedYearlyInvestmentStrategy::new(asset, amount))
        }
        StrategySpec::EarnPostTaxIncome { tax_rules } => {
            Box::new(EarnPostTaxIncome::new(tax_rules)?)
        }
        StrategySpec::CareerExponential {
            starting_salary,
            growth_rate,
        } => Box::new(CareerExponential::new(starting_salary, growth_rate)),
        StrategySpec::BusinessConstant { yearly_profit } => {
            Box::new(BusinessConstant::new(yearly_profit))
        }
        StrategySpec::RentalConstant { yearly_rent } => Box::new(RentalConstant::new(yearly_rent)),
        StrategySpec::FixedRent { yearly_rent } => Box::new(FixedRent::new(yearly_rent)),
        StrategySpec::InvestFractionOfCashAfterBuffer {
            buffer_per_yearly_expenses,
            allocation,
        } => Box::new(InvestFractionOfCashAfterBuffer::new(
            buffer_per_yearly_expenses,
            allocation,
        )?),
        StrategySpec::SimpleSpendingWithCreep {
            starting_spending,
            creep_rate,
        } => Box::new(SimpleSpendingWithCreep::new(starting_spending, creep_rate)),
    };
    Ok(strategy)
}

fn build_metric(spec: MetricSpec) -> Result<RecordedMetric> {
    let metric = match spec {
        MetricSpec::TotalAssets => RecordedMetric::from(TotalAssets),
        MetricSpec::HoldingsByAsset => RecordedMetric::from(HoldingsByAsset),
        MetricSpec::FiReached { withdrawal_rate } => {
            if !(0.0..=1.0).contains(&withdrawal_rate) {
                return Err(SimError::invalid_config(
                    "fi_reached: withdrawal_rate must be between 0 and 1",
                ));
            }
            RecordedMetric::from(FIReached::new(withdrawal_rate))
        }
        MetricSpec::CashflowStatement => RecordedMetric::from(CashflowStatement),
    };
    Ok(metric)
}
