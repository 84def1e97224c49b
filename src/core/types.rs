use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CashflowError, CashflowResult};

/// Financial facts of one listing as supplied by a data source.
///
/// Only `price` is guaranteed. Every optional field means "not supplied" when
/// `None`. A `Some(0.0)` tax, insurance or HOA figure is a real value and is
/// never replaced by an estimate; a rent override wins only when positive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyInput {
    pub price: f64,
    pub monthly_rent_override: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub sqft: Option<f64>,
    pub year_built: Option<u32>,
    pub monthly_hoa: Option<f64>,
    pub monthly_property_tax_override: Option<f64>,
    pub monthly_insurance_override: Option<f64>,
    pub address: Option<String>,
    pub url: Option<String>,
}

impl PropertyInput {
    pub fn with_price(price: f64) -> Self {
        Self {
            price,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> CashflowResult<()> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CashflowError::Validation("price must be >= 0".to_string()));
        }

        for (name, value) in [
            ("monthly rent", self.monthly_rent_override),
            ("bathrooms", self.bathrooms),
            ("sqft", self.sqft),
            ("monthly HOA", self.monthly_hoa),
            ("monthly property tax", self.monthly_property_tax_override),
            ("monthly insurance", self.monthly_insurance_override),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(CashflowError::Validation(format!("{name} must be >= 0")));
                }
            }
        }

        Ok(())
    }
}

/// Rate and percentage parameters for one computation, in percent units
/// (`6.0` means 6%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    pub down_payment_percent: f64,
    pub interest_rate: f64,
    pub loan_term_years: u32,
    pub property_tax_rate: f64,
    pub insurance_rate: f64,
    /// Share of monthly rent set aside for maintenance
    pub maintenance_percent: f64,
    pub vacancy_rate: f64,
    /// Share of monthly rent paid to a property manager
    pub management_percent: f64,
    pub pmi_rate: f64,
    pub income_tax_rate_low: f64,
    pub income_tax_rate_high: f64,
    pub appreciation_rate: f64,
    /// Closing costs as a share of price, counted in total cash invested
    pub closing_cost_percent: f64,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            down_payment_percent: 3.5,
            interest_rate: 6.0,
            loan_term_years: 30,
            property_tax_rate: 2.5,
            insurance_rate: 0.3,
            maintenance_percent: 5.0,
            vacancy_rate: 0.0,
            management_percent: 10.0,
            pmi_rate: 0.75,
            income_tax_rate_low: 10.0,
            income_tax_rate_high: 30.0,
            appreciation_rate: 3.0,
            closing_cost_percent: 0.0,
        }
    }
}

impl Assumptions {
    /// Approximation of the flat conventional-loan model: 20% down, no PMI,
    /// no income tax tracks, no appreciation, closing costs counted in cash
    /// invested. Maintenance is charged as 5% of rent rather than 1% of price
    /// per year, so figures differ from a price-based maintenance ledger.
    pub fn simple() -> Self {
        Self {
            down_payment_percent: 20.0,
            interest_rate: 7.0,
            loan_term_years: 30,
            property_tax_rate: 1.25,
            insurance_rate: 0.5,
            maintenance_percent: 5.0,
            vacancy_rate: 5.0,
            management_percent: 0.0,
            pmi_rate: 0.0,
            income_tax_rate_low: 0.0,
            income_tax_rate_high: 0.0,
            appreciation_rate: 0.0,
            closing_cost_percent: 3.0,
        }
    }

    pub fn validate(&self) -> CashflowResult<()> {
        for (name, rate) in [
            ("downPaymentPercent", self.down_payment_percent),
            ("interestRate", self.interest_rate),
            ("propertyTaxRate", self.property_tax_rate),
            ("insuranceRate", self.insurance_rate),
            ("maintenancePercent", self.maintenance_percent),
            ("vacancyRate", self.vacancy_rate),
            ("managementPercent", self.management_percent),
            ("pmiRate", self.pmi_rate),
            ("incomeTaxRateLow", self.income_tax_rate_low),
            ("incomeTaxRateHigh", self.income_tax_rate_high),
            ("closingCostPercent", self.closing_cost_percent),
        ] {
            if !(0.0..=100.0).contains(&rate) {
                return Err(CashflowError::Validation(format!(
                    "{name} must be between 0 and 100"
                )));
            }
        }

        if !(-100.0..=100.0).contains(&self.appreciation_rate) {
            return Err(CashflowError::Validation(
                "appreciationRate must be between -100 and 100".to_string(),
            ));
        }

        if !(1..=50).contains(&self.loan_term_years) {
            return Err(CashflowError::Validation(
                "loanTermYears must be between 1 and 50".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssumptionPreset {
    #[default]
    Detailed,
    #[serde(alias = "flat")]
    Simple,
}

impl AssumptionPreset {
    pub fn assumptions(self) -> Assumptions {
        match self {
            AssumptionPreset::Detailed => Assumptions::default(),
            AssumptionPreset::Simple => Assumptions::simple(),
        }
    }
}

/// A partial assumption set, as persisted by a store or sent with a request.
///
/// Only fields that are `Some` replace the base value when resolved, so an
/// explicit `0` survives the merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssumptionOverrides {
    pub down_payment_percent: Option<f64>,
    pub interest_rate: Option<f64>,
    pub loan_term_years: Option<u32>,
    pub property_tax_rate: Option<f64>,
    pub insurance_rate: Option<f64>,
    pub maintenance_percent: Option<f64>,
    pub vacancy_rate: Option<f64>,
    #[serde(alias = "propertyManagementPercent")]
    pub management_percent: Option<f64>,
    #[serde(alias = "mortgageInsuranceRate")]
    pub pmi_rate: Option<f64>,
    #[serde(alias = "incomeTaxRate")]
    pub income_tax_rate_low: Option<f64>,
    #[serde(alias = "highIncomeTaxRate")]
    pub income_tax_rate_high: Option<f64>,
    pub appreciation_rate: Option<f64>,
    pub closing_cost_percent: Option<f64>,
}

impl AssumptionOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, base: &Assumptions) -> Assumptions {
        Assumptions {
            down_payment_percent: self
                .down_payment_percent
                .unwrap_or(base.down_payment_percent),
            interest_rate: self.interest_rate.unwrap_or(base.interest_rate),
            loan_term_years: self.loan_term_years.unwrap_or(base.loan_term_years),
            property_tax_rate: self.property_tax_rate.unwrap_or(base.property_tax_rate),
            insurance_rate: self.insurance_rate.unwrap_or(base.insurance_rate),
            maintenance_percent: self
                .maintenance_percent
                .unwrap_or(base.maintenance_percent),
            vacancy_rate: self.vacancy_rate.unwrap_or(base.vacancy_rate),
            management_percent: self
                .management_percent
                .unwrap_or(base.management_percent),
            pmi_rate: self.pmi_rate.unwrap_or(base.pmi_rate),
            income_tax_rate_low: self
                .income_tax_rate_low
                .unwrap_or(base.income_tax_rate_low),
            income_tax_rate_high: self
                .income_tax_rate_high
                .unwrap_or(base.income_tax_rate_high),
            appreciation_rate: self.appreciation_rate.unwrap_or(base.appreciation_rate),
            closing_cost_percent: self
                .closing_cost_percent
                .unwrap_or(base.closing_cost_percent),
        }
    }

    /// Layers `other` on top of `self`; fields set in `other` win.
    pub fn merged_with(&self, other: &AssumptionOverrides) -> AssumptionOverrides {
        AssumptionOverrides {
            down_payment_percent: other.down_payment_percent.or(self.down_payment_percent),
            interest_rate: other.interest_rate.or(self.interest_rate),
            loan_term_years: other.loan_term_years.or(self.loan_term_years),
            property_tax_rate: other.property_tax_rate.or(self.property_tax_rate),
            insurance_rate: other.insurance_rate.or(self.insurance_rate),
            maintenance_percent: other.maintenance_percent.or(self.maintenance_percent),
            vacancy_rate: other.vacancy_rate.or(self.vacancy_rate),
            management_percent: other.management_percent.or(self.management_percent),
            pmi_rate: other.pmi_rate.or(self.pmi_rate),
            income_tax_rate_low: other.income_tax_rate_low.or(self.income_tax_rate_low),
            income_tax_rate_high: other.income_tax_rate_high.or(self.income_tax_rate_high),
            appreciation_rate: other.appreciation_rate.or(self.appreciation_rate),
            closing_cost_percent: other.closing_cost_percent.or(self.closing_cost_percent),
        }
    }
}

/// Fully derived analysis of one listing.
///
/// Currency fields are whole units; `ltv`, `cap_rate` and the yield fields
/// are percentages at full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowReport {
    pub address: Option<String>,
    pub url: Option<String>,
    pub price: i64,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub sqft: Option<f64>,
    pub year_built: Option<u32>,

    pub monthly_rent: i64,
    pub rent_estimated: bool,

    pub down_payment: i64,
    pub loan_amount: i64,
    pub ltv: f64,
    pub monthly_mortgage: i64,

    pub monthly_tax: i64,
    pub monthly_insurance: i64,
    pub monthly_hoa: i64,
    pub monthly_maintenance: i64,
    pub monthly_vacancy: i64,
    pub monthly_management: i64,
    pub monthly_pmi: i64,
    pub monthly_operating_expenses: i64,
    pub monthly_total_expenses: i64,

    pub gross_monthly_income: i64,
    pub pre_tax_cashflow: i64,
    pub taxable_income: i64,
    pub income_tax_low: i64,
    pub income_tax_high: i64,
    pub monthly_cashflow_low: i64,
    pub monthly_cashflow_high: i64,
    pub annual_cashflow_low: i64,
    pub annual_cashflow_high: i64,
    #[serde(rename = "annualNOI")]
    pub annual_noi: i64,
    pub annual_appreciation: i64,
    pub total_cash_invested: i64,

    pub cap_rate: f64,
    #[serde(rename = "cashflowAPYLow")]
    pub cashflow_apy_low: f64,
    #[serde(rename = "cashflowAPYHigh")]
    pub cashflow_apy_high: f64,
    #[serde(rename = "fiveYearAPYLow")]
    pub five_year_apy_low: f64,
    #[serde(rename = "fiveYearAPYHigh")]
    pub five_year_apy_high: f64,
    pub cash_on_cash_return: f64,

    pub assumptions: Assumptions,
    pub generated_at: DateTime<Utc>,
}
