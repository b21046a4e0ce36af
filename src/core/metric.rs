use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::portfolio::Portfolio;
use super::types::Asset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub asset: &'static str,
    pub units: f64,
    pub unit_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    pub name: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cashflow {
    pub income: Vec<Flow>,
    pub expenses: Vec<Flow>,
}

/// What a metric observed at one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Amount(f64),
    Flag(bool),
    Holdings(Vec<Holding>),
    Cashflow(Cashflow),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub year: f64,
    pub value: MetricValue,
}

/// A read-only observer of the portfolio.
pub trait Metric: fmt::Debug + Send {
    /// Key under which the recorded series is reported.
    fn name(&self) -> &'static str;

    fn requested_assets(&self) -> BTreeSet<Asset> {
        BTreeSet::new()
    }

    fn calculate(&self, portfolio: &Portfolio) -> MetricValue;
}

/// A metric together with the series it has recorded so far.
///
/// The series is append-only; start over by building a new recorder.
#[derive(Debug)]
pub struct RecordedMetric {
    metric: Box<dyn Metric>,
    values: Vec<MetricPoint>,
}

impl RecordedMetric {
    pub fn new(metric: Box<dyn Metric>) -> Self {
        Self {
            metric,
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.metric.name()
    }

    pub fn requested_assets(&self) -> BTreeSet<Asset> {
        self.metric.requested_assets()
    }

    pub fn record(&mut self, portfolio: &Portfolio, year: f64) {
        let value = self.metric.calculate(portfolio);
        self.values.push(MetricPoint { year, value });
    }

    pub fn values(&self) -> &[MetricPoint] {
        &self.values
    }

    pub fn into_values(self) -> Vec<MetricPoint> {
        self.values
    }
}

impl<M: Metric + 'static> From<M> for RecordedMetric {
    fn from(metric: M) -> Self {
        Self::new(Box::new(metric))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TotalAssets;

impl Metric for TotalAssets {
    fn name(&self) -> &'static str {
        "TotalAssets"
    }

    fn calculate(&self, portfolio: &Portfolio) -> MetricValue {
        MetricValue::Amount(portfolio.current_value())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HoldingsByAsset;

impl Metric for HoldingsByAsset {
    fn name(&self) -> &'static str {
        "HoldingsByAsset"
    }

    fn calculate(&self, portfolio: &Portfolio) -> MetricValue {
        MetricValue::Holdings(
            portfolio
                .priced_holdings()
                .map(|(asset, units, unit_value)| Holding {
                    asset: asset.name(),
                    units,
                    unit_value,
                })
                .collect(),
        )
    }
}

/// Whether withdrawing `withdrawal_rate` of the portfolio each year covers expenses.
#[derive(Debug, Clone, Copy)]
pub struct FIReached {
    withdrawal_rate: f64,
}

impl FIReached {
    pub fn new(withdrawal_rate: f64) -> Self {
        Self { withdrawal_rate }
    }
}

impl Metric for FIReached {
    fn name(&self) -> &'static str {
        "FIReached"
    }

    fn calculate(&self, portfolio: &Portfolio) -> MetricValue {
        let safe_income = portfolio.current_value() * self.withdrawal_rate;
        MetricValue::Flag(safe_income >= portfolio.total_expenses())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CashflowStatement;

impl Metric for CashflowStatement {
    fn name(&self) -> &'static str {
        "CashflowStatement"
    }

    fn calculate(&self, portfolio: &Portfolio) -> MetricValue {
        MetricValue::Cashflow(Cashflow {
            income: portfolio
                .income
                .iter()
                .map(|(category, value)| Flow {
                    name: category.name(),
                    value: *value,
                })
                .collect(),
            expenses: portfolio
                .expenses
                .iter()
                .map(|(category, value)| Flow {
                    name: category.name(),
                    value: *value,
                })
                .collect(),
        })
    }
}
