use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::trace;

use super::error::{Result, SimError};
use super::portfolio::{ExpenseBook, IncomeBook, Portfolio};
use super::tax::UkTaxRules;
use super::types::{Asset, Expense, Income};

const ALLOCATION_TOLERANCE: f64 = 1e-12;

/// A policy applied to the portfolio once per step.
///
/// Within a step the engine calls every strategy's `update_income`, then every
/// `update_expenses`, then every `execute`. All hooks default to no-ops.
pub trait Strategy: fmt::Debug + Send {
    /// Assets this strategy reads or writes; the portfolio tracks only the union.
    fn requested_assets(&self) -> BTreeSet<Asset> {
        BTreeSet::new()
    }

    fn update_income(&mut self, _income: &mut IncomeBook, _year: f64, _increment: f64) {}

    fn update_expenses(&mut self, _expenses: &mut ExpenseBook, _year: f64, _increment: f64) {}

    fn execute(&mut self, _portfolio: &mut Portfolio, _year: f64, _increment: f64) -> Result<()> {
        Ok(())
    }
}

/// Runs its children in declared order.
#[derive(Debug)]
pub struct CombinedStrategy {
    children: Vec<Box<dyn Strategy>>,
}

impl CombinedStrategy {
    pub fn new(children: Vec<Box<dyn Strategy>>) -> Self {
        Self { children }
    }
}

impl Strategy for CombinedStrategy {
    fn requested_assets(&self) -> BTreeSet<Asset> {
        self.children
            .iter()
            .flat_map(|child| child.requested_assets())
            .collect()
    }

    fn update_income(&mut self, income: &mut IncomeBook, year: f64, increment: f64) {
        for child in &mut self.children {
            child.update_income(income, year, increment);
        }
    }

    fn update_expenses(&mut self, expenses: &mut ExpenseBook, year: f64, increment: f64) {
        for child in &mut self.children {
            child.update_expenses(expenses, year, increment);
        }
    }

    fn execute(&mut self, portfolio: &mut Portfolio, year: f64, increment: f64) -> Result<()> {
        for child in &mut self.children {
            child.execute(portfolio, year, increment)?;
        }
        Ok(())
    }
}

/// Only lets its child act for times inside `[start, end]` (inclusive).
///
/// Relative windows measure time as the elapsed simulated time seen by this
/// strategy, counted from zero and advanced before the bounds are checked.
/// Absolute windows compare against the simulation year.
#[derive(Debug)]
pub struct LimitedDurationStrategy {
    child: Box<dyn Strategy>,
    start: f64,
    end: f64,
    relative: bool,
    elapsed: f64,
    // last year a real step advanced the relative clock; each year counts once across all hooks
    clocked_year: Option<f64>,
}

impl LimitedDurationStrategy {
    /// Unset bounds never exclude.
    pub fn new(
        child: Box<dyn Strategy>,
        start: Option<f64>,
        end: Option<f64>,
        relative: bool,
    ) -> Self {
        Self {
            child,
            start: start.unwrap_or(f64::NEG_INFINITY),
            end: end.unwrap_or(f64::INFINITY),
            relative,
            elapsed: 0.0,
            clocked_year: None,
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    fn is_active(&mut self, year: f64, increment: f64) -> bool {
        if !self.relative {
            return self.start <= year && year <= self.end;
        }

        // the NaN initialisation call never touches the clock
        if increment.is_finite() && self.clocked_year != Some(year) {
            self.clocked_year = Some(year);
            self.elapsed += increment;
        }
        self.start <= self.elapsed && self.elapsed <= self.end
    }
}

impl Strategy for LimitedDurationStrategy {
    fn requested_assets(&self) -> BTreeSet<Asset> {
        self.child.requested_assets()
    }

    fn update_income(&mut self, income: &mut IncomeBook, year: f64, increment: f64) {
        if self.is_active(year, increment) {
            self.child.update_income(income, year, increment);
        }
    }

    fn update_expenses(&mut self, expenses: &mut ExpenseBook, year: f64, increment: f64) {
        if self.is_active(year, increment) {
            self.child.update_expenses(expenses, year, increment);
        }
    }

    fn execute(&mut self, portfolio: &mut Portfolio, year: f64, increment: f64) -> Result<()> {
        if self.is_active(year, increment) {
            self.child.execute(portfolio, year, increment)?;
        }
        Ok(())
    }
}

/// Buys a fixed yearly cash amount of one asset, pro rata to the step size.
#[derive(Debug, Clone)]
pub struct FixedYearlyInvestmentStrategy {
    asset: Asset,
    amount: f64,
}

impl FixedYearlyInvestmentStrategy {
    pub fn new(asset: Asset, amount: f64) -> Self {
        Self { asset, amount }
    }
}

impl Strategy for FixedYearlyInvestmentStrategy {
    fn requested_assets(&self) -> BTreeSet<Asset> {
        BTreeSet::from([self.asset])
    }

    fn execute(&mut self, portfolio: &mut Portfolio, _year: f64, increment: f64) -> Result<()> {
        portfolio.add_cash(self.asset, self.amount * increment)
    }
}

/// Pays this step's income, net of UK tax, insurance and current expenses, into cash.
#[derive(Debug, Clone, Default)]
pub struct EarnPostTaxIncome {
    rules: UkTaxRules,
}

impl EarnPostTaxIncome {
    pub fn new(rules: UkTaxRules) -> Result<Self> {
        rules.validate()?;
        Ok(Self { rules })
    }

    /// Yearly cash left after tax, insurance and expenses.
    pub fn net_yearly_cash(&self, portfolio: &Portfolio) -> f64 {
        let bucket =
            |category: Income| portfolio.income.get(&category).copied().unwrap_or(0.0);
        let salary = bucket(Income::Salary);
        let rental = bucket(Income::Rental);
        let trading = bucket(Income::Trading);

        let assessment = self.rules.assess(salary, rental, trading);
        salary + rental + trading - assessment.total() - portfolio.total_expenses()
    }
}

impl Strategy for EarnPostTaxIncome {
    fn requested_assets(&self) -> BTreeSet<Asset> {
        BTreeSet::from([Asset::Cash])
    }

    fn execute(&mut self, portfolio: &mut Portfolio, _year: f64, increment: f64) -> Result<()> {
        let net = self.net_yearly_cash(portfolio);
        portfolio.add_cash(Asset::Cash, net * increment)
    }
}

/// Curve `base * (1 + g)^(year - anchor)`, anchored at the first year it sees,
/// emitting the change since the previous step.
#[derive(Debug, Clone)]
struct ExponentialCurve {
    base: f64,
    growth_rate: f64,
    anchor_year: Option<f64>,
    previous: f64,
}

impl ExponentialCurve {
    fn new(base: f64, growth_rate: f64) -> Self {
        Self {
            base,
            growth_rate,
            anchor_year: None,
            previous: 0.0,
        }
    }

    fn delta(&mut self, year: f64) -> f64 {
        let anchor = *self.anchor_year.get_or_insert(year);
        let current = self.base * (1.0 + self.growth_rate).powf(year - anchor);
        let delta = current - self.previous;
        self.previous = current;
        delta
    }
}

/// Salary growing exponentially from the first simulated year.
///
/// Adds the change in salary to `income[SALARY]` rather than assigning it, so
/// other strategies can contribute to the same bucket.
#[derive(Debug, Clone)]
pub struct CareerExponential {
    salary: ExponentialCurve,
}

impl CareerExponential {
    pub fn new(starting_salary: f64, growth_rate: f64) -> Self {
        Self {
            salary: ExponentialCurve::new(starting_salary, growth_rate),
        }
    }
}

impl Strategy for CareerExponential {
    fn update_income(&mut self, income: &mut IncomeBook, year: f64, _increment: f64) {
        *income.entry(Income::Salary).or_insert(0.0) += self.salary.delta(year);
    }
}

/// Sets trading income to a fixed yearly profit, overwriting the bucket.
#[derive(Debug, Clone)]
pub struct BusinessConstant {
    yearly_profit: f64,
}

impl BusinessConstant {
    pub fn new(yearly_profit: f64) -> Self {
        Self { yearly_profit }
    }
}

impl Strategy for BusinessConstant {
    fn update_income(&mut self, income: &mut IncomeBook, _year: f64, _increment: f64) {
        income.insert(Income::Trading, self.yearly_profit);
    }
}

/// Sets rental income to a fixed yearly amount, overwriting the bucket.
#[derive(Debug, Clone)]
pub struct RentalConstant {
    yearly_rent: f64,
}

impl RentalConstant {
    pub fn new(yearly_rent: f64) -> Self {
        Self { yearly_rent }
    }
}

impl Strategy for RentalConstant {
    fn update_income(&mut self, income: &mut IncomeBook, _year: f64, _increment: f64) {
        income.insert(Income::Rental, self.yearly_rent);
    }
}

/// Sets the rent expense to a fixed yearly amount, overwriting the bucket.
#[derive(Debug, Clone)]
pub struct FixedRent {
    yearly_rent: f64,
}

impl FixedRent {
    pub fn new(yearly_rent: f64) -> Self {
        Self { yearly_rent }
    }
}

impl Strategy for FixedRent {
    fn update_expenses(&mut self, expenses: &mut ExpenseBook, _year: f64, _increment: f64) {
        expenses.insert(Expense::Rent, self.yearly_rent);
    }
}

/// Keeps `buffer_per_yearly_expenses` years of expenses in cash and invests the
/// excess, split by fixed ratios.
#[derive(Debug, Clone)]
pub struct InvestFractionOfCashAfterBuffer {
    buffer_per_yearly_expenses: f64,
    allocation: BTreeMap<Asset, f64>,
}

impl InvestFractionOfCashAfterBuffer {
    /// Ratios must be non-negative and sum to 1. An empty allocation is allowed
    /// and leaves cash untouched.
    pub fn new(
        buffer_per_yearly_expenses: f64,
        allocation: BTreeMap<Asset, f64>,
    ) -> Result<Self> {
        if !buffer_per_yearly_expenses.is_finite() || buffer_per_yearly_expenses < 0.0 {
            return Err(SimError::invalid_allocation(
                "buffer_per_yearly_expenses must be a finite value >= 0",
            ));
        }

        if let Some((asset, ratio)) = allocation
            .iter()
            .find(|(_, ratio)| !ratio.is_finite() || **ratio < 0.0)
        {
            return Err(SimError::invalid_allocation(format!(
                "ratio for {asset} must be >= 0, got {ratio}"
            )));
        }

        if !allocation.is_empty() {
            let total: f64 = allocation.values().sum();
            if (total - 1.0).abs() > ALLOCATION_TOLERANCE {
                return Err(SimError::invalid_allocation(format!(
                    "ratios must sum to 1, got {total}"
                )));
            }
        }

        Ok(Self {
            buffer_per_yearly_expenses,
            allocation,
        })
    }
}

impl Strategy for InvestFractionOfCashAfterBuffer {
    fn requested_assets(&self) -> BTreeSet<Asset> {
        let mut assets: BTreeSet<Asset> = self.allocation.keys().copied().collect();
        assets.insert(Asset::Cash);
        assets
    }

    fn execute(&mut self, portfolio: &mut Portfolio, year: f64, increment: f64) -> Result<()> {
        if self.allocation.is_empty() {
            return Ok(());
        }

        let cash_held = portfolio.cash_of_asset_held(Asset::Cash)?;
        let buffer = self.buffer_per_yearly_expenses * portfolio.total_expenses();
        let investable = (cash_held - buffer) * increment;
        if investable < 0.0 {
            trace!(year, cash_held, buffer, "cash buffer not met, nothing invested");
            return Ok(());
        }

        for (asset, ratio) in &self.allocation {
            portfolio.add_cash(*asset, investable * ratio)?;
        }
        portfolio.add_cash(Asset::Cash, -investable)
    }
}

/// Living costs growing exponentially from the first simulated year, added to
/// `expenses[LIVING]` as the change since the previous step.
#[derive(Debug, Clone)]
pub struct SimpleSpendingWithCreep {
    spending: ExponentialCurve,
}

impl SimpleSpendingWithCreep {
    pub fn new(starting_spending: f64, creep_rate: f64) -> Self {
        Self {
            spending: ExponentialCurve::new(starting_spending, creep_rate),
        }
    }
}

impl Strategy for SimpleSpendingWithCreep {
    fn update_expenses(&mut self, expenses: &mut ExpenseBook, year: f64, _increment: f64) {
        *expenses.entry(Expense::Living).or_insert(0.0) += self.spending.delta(year);
    }
}
