//! Illustrative UK income tax and National Insurance arithmetic.
//!
//! Figures default to the 2024/25 tax year. Nothing here aims at completeness:
//! no Scottish rates, dividend or savings bands, or pension relief.

use serde::Deserialize;

use super::error::{Result, SimError};

/// One marginal band: `rate` applies to the slice of the amount below `upper`
/// not already consumed by lower bands.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TaxBand {
    pub rate: f64,
    #[serde(default = "unbounded")]
    pub upper: f64,
}

fn unbounded() -> f64 {
    f64::INFINITY
}

impl TaxBand {
    pub const fn new(rate: f64, upper: f64) -> Self {
        Self { rate, upper }
    }
}

/// Tax due on `amount` under ascending cumulative `bands`.
/// Any slice above the last band's threshold is untaxed.
pub fn banded_tax(amount: f64, bands: &[TaxBand]) -> f64 {
    let amount = amount.max(0.0);
    let mut lower = 0.0;
    let mut tax = 0.0;
    for band in bands {
        let slice = (amount.min(band.upper) - lower).max(0.0);
        tax += slice * band.rate;
        if amount <= band.upper {
            break;
        }
        lower = band.upper;
    }
    tax
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TaxAssessment {
    pub income_tax: f64,
    pub salary_insurance: f64,
    pub trading_insurance: f64,
}

impl TaxAssessment {
    pub fn total(&self) -> f64 {
        self.income_tax + self.salary_insurance + self.trading_insurance
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UkTaxRules {
    pub personal_allowance: f64,
    /// Above this adjusted income the personal allowance falls by 1 for every 2.
    pub allowance_taper_threshold: f64,
    pub trading_allowance: f64,
    pub property_allowance: f64,
    pub income_tax_bands: Vec<TaxBand>,
    pub salary_insurance_bands: Vec<TaxBand>,
    pub trading_insurance_bands: Vec<TaxBand>,
}

impl Default for UkTaxRules {
    fn default() -> Self {
        Self {
            personal_allowance: 12_570.0,
            allowance_taper_threshold: 100_000.0,
            trading_allowance: 1_000.0,
            property_allowance: 1_000.0,
            income_tax_bands: vec![
                TaxBand::new(0.20, 37_700.0),
                TaxBand::new(0.40, 125_140.0),
                TaxBand::new(0.45, f64::INFINITY),
            ],
            salary_insurance_bands: vec![
                TaxBand::new(0.0, 12_570.0),
                TaxBand::new(0.08, 50_270.0),
                TaxBand::new(0.02, f64::INFINITY),
            ],
            trading_insurance_bands: vec![
                TaxBand::new(0.0, 12_570.0),
                TaxBand::new(0.06, 50_270.0),
                TaxBand::new(0.02, f64::INFINITY),
            ],
        }
    }
}

impl UkTaxRules {
    pub fn validate(&self) -> Result<()> {
        for (label, value) in [
            ("personal_allowance", self.personal_allowance),
            ("allowance_taper_threshold", self.allowance_taper_threshold),
            ("trading_allowance", self.trading_allowance),
            ("property_allowance", self.property_allowance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::invalid_config(format!(
                    "tax rule {label} must be a finite value >= 0"
                )));
            }
        }

        for (label, bands) in [
            ("income_tax_bands", &self.income_tax_bands),
            ("salary_insurance_bands", &self.salary_insurance_bands),
            ("trading_insurance_bands", &self.trading_insurance_bands),
        ] {
            let mut previous = 0.0;
            for band in bands {
                if !(0.0..=1.0).contains(&band.rate) {
                    return Err(SimError::invalid_config(format!(
                        "{label}: rate must be between 0 and 1"
                    )));
                }
                if band.upper.is_nan() || band.upper <= previous {
                    return Err(SimError::invalid_config(format!(
                        "{label}: upper thresholds must be positive and ascending"
                    )));
                }
                previous = band.upper;
            }
        }
        Ok(())
    }

    /// Personal allowance after the high-income taper, floored at zero.
    pub fn personal_allowance_for(&self, adjusted_income: f64) -> f64 {
        let excess = (adjusted_income - self.allowance_taper_threshold).max(0.0);
        (self.personal_allowance - excess / 2.0).max(0.0)
    }

    /// Tax and insurance due on a year of salary, rental and trading income.
    pub fn assess(&self, salary: f64, rental: f64, trading: f64) -> TaxAssessment {
        let salary = salary.max(0.0);
        let rental_profit = (rental - self.property_allowance).max(0.0);
        let trading_profit = (trading - self.trading_allowance).max(0.0);

        let adjusted_income = salary + rental_profit + trading_profit;
        let allowance = self.personal_allowance_for(adjusted_income);
        let taxable = (adjusted_income - allowance).max(0.0);

        TaxAssessment {
            income_tax: banded_tax(taxable, &self.income_tax_bands),
            salary_insurance: banded_tax(salary, &self.salary_insurance_bands),
            trading_insurance: banded_tax(trading_profit, &self.trading_insurance_bands),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn banded_tax_consumes_each_band_in_order() {
        let bands = [TaxBand::new(0.1, 100.0), TaxBand::new(0.5, 200.0)];
        assert_approx(banded_tax(50.0, &bands), 5.0);
        assert_approx(banded_tax(150.0, &bands), 10.0 + 25.0);
        // nothing above the final threshold
        assert_approx(banded_tax(1_000.0, &bands), 60.0);
        assert_approx(banded_tax(-10.0, &bands), 0.0);
    }

    #[test]
    fn uk_salary_applies_progressive_rates() {
        let rules = UkTaxRules::default();
        let assessment = rules.assess(60_000.0, 0.0, 0.0);

        assert_approx(assessment.income_tax, 11_432.0);
        assert_approx(assessment.salary_insurance, 3_016.0 + 194.6);
        assert_approx(assessment.trading_insurance, 0.0);
    }

    #[test]
    fn personal_allowance_tapers_to_zero() {
        let rules = UkTaxRules::default();
        assert_approx(rules.personal_allowance_for(90_000.0), 12_570.0);
        assert_approx(rules.personal_allowance_for(110_000.0), 7_570.0);
        assert_approx(rules.personal_allowance_for(125_140.0), 0.0);
        assert_approx(rules.personal_allowance_for(400_000.0), 0.0);

        // 37,700 at 20% and the remaining 87,440 at 40%
        let assessment = rules.assess(125_140.0, 0.0, 0.0);
        assert_approx(assessment.income_tax, 7_540.0 + 34_976.0);
    }

    #[test]
    fn trading_and_rental_use_their_own_allowances() {
        let rules = UkTaxRules::default();
        let assessment = rules.assess(0.0, 1_000.0, 31_000.0);

        // 30,000 trading profit less the 12,570 personal allowance
        assert_approx(assessment.income_tax, (30_000.0 - 12_570.0) * 0.20);
        assert_approx(assessment.trading_insurance, (30_000.0 - 12_570.0) * 0.06);
        assert_approx(assessment.salary_insurance, 0.0);
    }

    #[test]
    fn validate_rejects_descending_bands() {
        let mut rules = UkTaxRules::default();
        rules.income_tax_bands = vec![TaxBand::new(0.2, 50_000.0), TaxBand::new(0.4, 40_000.0)];
        let err = rules.validate().expect_err("must reject band order");
        assert!(err.to_string().contains("income_tax_bands"));

        assert!(UkTaxRules::default().validate().is_ok());
    }

    #[test]
    fn missing_upper_deserializes_as_unbounded() {
        let band: TaxBand = serde_json::from_str(r#"{"rate": 0.45}"#).expect("band");
        assert!(band.upper.is_infinite());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_tax_is_monotone_and_below_gross(
            salary in 0u32..400_000,
            rental in 0u32..100_000,
            trading in 0u32..200_000,
            raise in 1u32..20_000
        ) {
            let rules = UkTaxRules::default();
            let (salary, rental, trading) = (salary as f64, rental as f64, trading as f64);

            let base = rules.assess(salary, rental, trading);
            let raised = rules.assess(salary + raise as f64, rental, trading);

            prop_assert!(base.total() >= 0.0);
            prop_assert!(base.total() <= salary + rental + trading);
            prop_assert!(raised.total() + 1e-6 >= base.total());
        }
    }
}
