mod asset;
mod engine;
mod error;
mod metric;
mod portfolio;
mod strategy;
mod tax;
mod types;

pub use asset::{AssetProvider, ConstantGeomIncreaseAsset, ProviderRegistry};
pub use engine::{Simulation, SimulationConfig};
pub use error::{Result, SimError};
pub use metric::{
    Cashflow, CashflowStatement, FIReached, Flow, Holding, HoldingsByAsset, Metric, MetricPoint,
    MetricValue, RecordedMetric, TotalAssets,
};
pub use portfolio::{ExpenseBook, IncomeBook, Portfolio};
pub use strategy::{
    BusinessConstant, CareerExponential, CombinedStrategy, EarnPostTaxIncome, FixedRent,
    FixedYearlyInvestmentStrategy, InvestFractionOfCashAfterBuffer, LimitedDurationStrategy,
    RentalConstant, SimpleSpendingWithCreep, Strategy,
};
pub use tax::{TaxAssessment, TaxBand, UkTaxRules, banded_tax};
pub use types::{Asset, Expense, Income};
