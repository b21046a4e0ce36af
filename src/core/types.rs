use std::fmt;

use serde::{Deserialize, Serialize};

/// A class of holding with its own value evolution rule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Asset {
    Cash,
    EtfGlobalStock,
    SavingsAccountVariableRate,
}

impl Asset {
    pub const ALL: [Asset; 3] = [
        Asset::Cash,
        Asset::EtfGlobalStock,
        Asset::SavingsAccountVariableRate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Asset::Cash => "CASH",
            Asset::EtfGlobalStock => "ETF_GLOBAL_STOCK",
            Asset::SavingsAccountVariableRate => "SAVINGS_ACCOUNT_VARIABLE_RATE",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Income {
    Salary,
    Rental,
    Trading,
}

impl Income {
    pub fn name(self) -> &'static str {
        match self {
            Income::Salary => "SALARY",
            Income::Rental => "RENTAL",
            Income::Trading => "TRADING",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Expense {
    Rent,
    Living,
}

impl Expense {
    pub fn name(self) -> &'static str {
        match self {
            Expense::Rent => "RENT",
            Expense::Living => "LIVING",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_names_match_serde_names() {
        for asset in Asset::ALL {
            let json = serde_json::to_string(&asset).expect("serialize asset");
            assert_eq!(json, format!("\"{}\"", asset.name()));
        }
    }

    #[test]
    fn category_names_deserialize() {
        let income: Income = serde_json::from_str("\"TRADING\"").expect("income");
        assert_eq!(income, Income::Trading);
        let expense: Expense = serde_json::from_str("\"LIVING\"").expect("expense");
        assert_eq!(expense.name(), "LIVING");
    }
}
