use chrono::{DateTime, Utc};

use super::types::{Assumptions, CashflowReport, PropertyInput};

const RENT_TO_PRICE_RATIO: f64 = 0.008;
const RENT_PER_BEDROOM: f64 = 50.0;
const DEFAULT_BEDROOMS: u32 = 2;
const PMI_LTV_THRESHOLD: f64 = 0.80;
const MONTHS_PER_YEAR: f64 = 12.0;
const APY_HORIZON_YEARS: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
struct ResolvedRent {
    monthly: f64,
    estimated: bool,
}

#[derive(Debug, Clone, Copy)]
struct LoanTerms {
    down_payment: f64,
    loan_amount: f64,
    ltv: f64,
    monthly_payment: f64,
    monthly_pmi: f64,
}

#[derive(Debug, Clone, Copy)]
struct MonthlyExpenses {
    tax: f64,
    insurance: f64,
    hoa: f64,
    maintenance: f64,
    vacancy: f64,
    management: f64,
}

impl MonthlyExpenses {
    fn operating_total(self) -> f64 {
        self.tax + self.insurance + self.hoa + self.maintenance + self.vacancy + self.management
    }
}

#[derive(Debug, Clone, Copy)]
struct TaxTracks {
    pre_tax: f64,
    taxable_income: f64,
    income_tax_low: f64,
    income_tax_high: f64,
    cashflow_low: f64,
    cashflow_high: f64,
}

#[derive(Debug, Clone, Copy)]
struct YieldMetrics {
    annual_cashflow_low: f64,
    annual_cashflow_high: f64,
    annual_noi: f64,
    annual_appreciation: f64,
    total_cash_invested: f64,
    cap_rate: f64,
    cashflow_apy_low: f64,
    cashflow_apy_high: f64,
    five_year_apy_low: f64,
    five_year_apy_high: f64,
    cash_on_cash_return: f64,
}

pub fn compute(input: &PropertyInput, assumptions: &Assumptions) -> CashflowReport {
    compute_at(input, assumptions, Utc::now())
}

/// Same as [`compute`] with a caller-supplied timestamp, so two calls with the
/// same arguments produce equal reports.
pub fn compute_at(
    input: &PropertyInput,
    assumptions: &Assumptions,
    generated_at: DateTime<Utc>,
) -> CashflowReport {
    let price = input.price;
    let rent = resolve_rent(input);
    let loan = loan_terms(price, assumptions);
    let expenses = monthly_expenses(input, rent.monthly, assumptions);
    let operating = expenses.operating_total();
    let total_expenses = operating + loan.monthly_payment + loan.monthly_pmi;
    let tracks = tax_tracks(rent.monthly - total_expenses, assumptions);
    let yields = yield_metrics(price, rent.monthly, operating, &loan, &tracks, assumptions);

    CashflowReport {
        address: input.address.clone(),
        url: input.url.clone(),
        price: round_currency(price),
        bedrooms: input.bedrooms,
        bathrooms: input.bathrooms,
        sqft: input.sqft,
        year_built: input.year_built,

        monthly_rent: round_currency(rent.monthly),
        rent_estimated: rent.estimated,

        down_payment: round_currency(loan.down_payment),
        loan_amount: round_currency(loan.loan_amount),
        ltv: finite_or_zero(loan.ltv * 100.0),
        monthly_mortgage: round_currency(loan.monthly_payment),

        monthly_tax: round_currency(expenses.tax),
        monthly_insurance: round_currency(expenses.insurance),
        monthly_hoa: round_currency(expenses.hoa),
        monthly_maintenance: round_currency(expenses.maintenance),
        monthly_vacancy: round_currency(expenses.vacancy),
        monthly_management: round_currency(expenses.management),
        monthly_pmi: round_currency(loan.monthly_pmi),
        monthly_operating_expenses: round_currency(operating),
        monthly_total_expenses: round_currency(total_expenses),

        gross_monthly_income: round_currency(rent.monthly - operating),
        pre_tax_cashflow: round_currency(tracks.pre_tax),
        taxable_income: round_currency(tracks.taxable_income),
        income_tax_low: round_currency(tracks.income_tax_low),
        income_tax_high: round_currency(tracks.income_tax_high),
        monthly_cashflow_low: round_currency(tracks.cashflow_low),
        monthly_cashflow_high: round_currency(tracks.cashflow_high),
        annual_cashflow_low: round_currency(yields.annual_cashflow_low),
        annual_cashflow_high: round_currency(yields.annual_cashflow_high),
        annual_noi: round_currency(yields.annual_noi),
        annual_appreciation: round_currency(yields.annual_appreciation),
        total_cash_invested: round_currency(yields.total_cash_invested),

        cap_rate: finite_or_zero(yields.cap_rate),
        cashflow_apy_low: finite_or_zero(yields.cashflow_apy_low),
        cashflow_apy_high: finite_or_zero(yields.cashflow_apy_high),
        five_year_apy_low: finite_or_zero(yields.five_year_apy_low),
        five_year_apy_high: finite_or_zero(yields.five_year_apy_high),
        cash_on_cash_return: finite_or_zero(yields.cash_on_cash_return),

        assumptions: *assumptions,
        generated_at,
    }
}

/// Linear rent heuristic used when the data source has no rent figure:
/// 0.8% of price plus 50 per bedroom, two bedrooms assumed when unknown.
pub fn estimate_rent(price: f64, bedrooms: Option<u32>) -> f64 {
    let bedrooms = bedrooms.unwrap_or(DEFAULT_BEDROOMS) as f64;
    round_half_up(price * RENT_TO_PRICE_RATIO + bedrooms * RENT_PER_BEDROOM)
}

/// Fixed-rate annuity payment. Zero when there is nothing to amortize or the
/// rate is not positive.
pub fn monthly_payment(loan_amount: f64, annual_rate_percent: f64, term_years: u32) -> f64 {
    let monthly_rate = annual_rate_percent / 100.0 / MONTHS_PER_YEAR;
    let payments = term_years as f64 * MONTHS_PER_YEAR;
    if loan_amount <= 0.0 || monthly_rate <= 0.0 || payments <= 0.0 {
        return 0.0;
    }

    let growth = (1.0 + monthly_rate).powf(payments);
    loan_amount * (monthly_rate * growth) / (growth - 1.0)
}

fn resolve_rent(input: &PropertyInput) -> ResolvedRent {
    match input.monthly_rent_override {
        Some(rent) if rent > 0.0 => ResolvedRent {
            monthly: rent,
            estimated: false,
        },
        _ => ResolvedRent {
            monthly: estimate_rent(input.price, input.bedrooms),
            estimated: true,
        },
    }
}

fn loan_terms(price: f64, assumptions: &Assumptions) -> LoanTerms {
    let down_payment = price * assumptions.down_payment_percent / 100.0;
    let loan_amount = price - down_payment;
    let ltv = if price > 0.0 { loan_amount / price } else { 0.0 };
    let monthly_pmi = if ltv > PMI_LTV_THRESHOLD {
        loan_amount * assumptions.pmi_rate / 100.0 / MONTHS_PER_YEAR
    } else {
        0.0
    };

    LoanTerms {
        down_payment,
        loan_amount,
        ltv,
        monthly_payment: monthly_payment(
            loan_amount,
            assumptions.interest_rate,
            assumptions.loan_term_years,
        ),
        monthly_pmi,
    }
}

fn monthly_expenses(input: &PropertyInput, rent: f64, assumptions: &Assumptions) -> MonthlyExpenses {
    let price = input.price;
    MonthlyExpenses {
        tax: input
            .monthly_property_tax_override
            .unwrap_or_else(|| price * assumptions.property_tax_rate / 100.0 / MONTHS_PER_YEAR),
        insurance: input
            .monthly_insurance_override
            .unwrap_or_else(|| price * assumptions.insurance_rate / 100.0 / MONTHS_PER_YEAR),
        hoa: input.monthly_hoa.unwrap_or(0.0),
        maintenance: rent * assumptions.maintenance_percent / 100.0,
        vacancy: rent * assumptions.vacancy_rate / 100.0,
        management: rent * assumptions.management_percent / 100.0,
    }
}

fn tax_tracks(pre_tax: f64, assumptions: &Assumptions) -> TaxTracks {
    // Losses carry no tax benefit.
    let taxable_income = pre_tax.max(0.0);
    let income_tax_low = taxable_income * assumptions.income_tax_rate_low / 100.0;
    let income_tax_high = taxable_income * assumptions.income_tax_rate_high / 100.0;
    TaxTracks {
        pre_tax,
        taxable_income,
        income_tax_low,
        income_tax_high,
        cashflow_low: pre_tax - income_tax_low,
        cashflow_high: pre_tax - income_tax_high,
    }
}

fn yield_metrics(
    price: f64,
    rent: f64,
    operating_expenses: f64,
    loan: &LoanTerms,
    tracks: &TaxTracks,
    assumptions: &Assumptions,
) -> YieldMetrics {
    let annual_cashflow_low = tracks.cashflow_low * MONTHS_PER_YEAR;
    let annual_cashflow_high = tracks.cashflow_high * MONTHS_PER_YEAR;
    let annual_noi = (rent - operating_expenses) * MONTHS_PER_YEAR;
    let annual_appreciation = price * assumptions.appreciation_rate / 100.0;
    let total_cash_invested = loan.down_payment + price * assumptions.closing_cost_percent / 100.0;

    let cap_rate = if price > 0.0 {
        annual_noi / price * 100.0
    } else {
        0.0
    };

    YieldMetrics {
        annual_cashflow_low,
        annual_cashflow_high,
        annual_noi,
        annual_appreciation,
        total_cash_invested,
        cap_rate,
        cashflow_apy_low: percent_of(annual_cashflow_low, loan.down_payment),
        cashflow_apy_high: percent_of(annual_cashflow_high, loan.down_payment),
        five_year_apy_low: five_year_apy(annual_cashflow_low, annual_appreciation, loan.down_payment),
        five_year_apy_high: five_year_apy(
            annual_cashflow_high,
            annual_appreciation,
            loan.down_payment,
        ),
        cash_on_cash_return: percent_of(tracks.pre_tax * MONTHS_PER_YEAR, total_cash_invested),
    }
}

fn percent_of(amount: f64, base: f64) -> f64 {
    if base > 0.0 { amount / base * 100.0 } else { 0.0 }
}

/// Five-year total return on the down payment, expressed per year.
fn five_year_apy(annual_cashflow: f64, annual_appreciation: f64, down_payment: f64) -> f64 {
    if down_payment <= 0.0 {
        return 0.0;
    }
    let five_year_total =
        annual_cashflow * APY_HORIZON_YEARS + annual_appreciation * APY_HORIZON_YEARS;
    (five_year_total / down_payment * 100.0) / APY_HORIZON_YEARS
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn round_currency(value: f64) -> i64 {
    if value.is_finite() {
        round_half_up(value) as i64
    } else {
        0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn sample_listing() -> PropertyInput {
        PropertyInput {
            price: 500_000.0,
            monthly_rent_override: Some(3_000.0),
            bedrooms: Some(3),
            bathrooms: Some(2.0),
            sqft: Some(1_650.0),
            address: Some("12 Orchard Ln, Springfield".to_string()),
            url: Some("https://listings.example/12-orchard".to_string()),
            ..PropertyInput::default()
        }
    }

    fn conventional_listing() -> PropertyInput {
        PropertyInput {
            price: 200_000.0,
            monthly_rent_override: Some(2_500.0),
            ..PropertyInput::default()
        }
    }

    fn conventional_assumptions() -> Assumptions {
        Assumptions {
            down_payment_percent: 25.0,
            ..Assumptions::default()
        }
    }

    #[test]
    fn fha_scenario_matches_hand_calculation() {
        let report = compute_at(&sample_listing(), &Assumptions::default(), fixed_time());

        assert_eq!(report.price, 500_000);
        assert_eq!(report.monthly_rent, 3_000);
        assert!(!report.rent_estimated);
        assert_eq!(report.down_payment, 17_500);
        assert_eq!(report.loan_amount, 482_500);
        assert_approx(report.ltv, 96.5);
        assert_eq!(report.monthly_mortgage, 2_893);
        assert_eq!(report.monthly_tax, 1_042);
        assert_eq!(report.monthly_insurance, 125);
        assert_eq!(report.monthly_hoa, 0);
        assert_eq!(report.monthly_maintenance, 150);
        assert_eq!(report.monthly_management, 300);
        assert_eq!(report.monthly_vacancy, 0);
        assert_eq!(report.monthly_pmi, 302);
        assert_eq!(report.monthly_operating_expenses, 1_617);
        assert_eq!(report.monthly_total_expenses, 4_811);
        assert_eq!(report.pre_tax_cashflow, -1_811);
        assert_eq!(report.taxable_income, 0);
        assert_eq!(report.income_tax_low, 0);
        assert_eq!(report.income_tax_high, 0);
        assert_eq!(report.monthly_cashflow_low, report.pre_tax_cashflow);
        assert_eq!(report.monthly_cashflow_high, report.pre_tax_cashflow);
        assert_eq!(report.annual_cashflow_low, -21_733);
        assert_eq!(report.annual_noi, 16_600);
        assert_eq!(report.annual_appreciation, 15_000);
        assert_approx(report.cap_rate, 3.32);
        assert_approx_tol(report.cashflow_apy_low, -124.187_002_321_969_3, 1e-6);
        assert_approx_tol(report.five_year_apy_low, -38.472_716_607_683_6, 1e-6);
        assert_eq!(report.address.as_deref(), Some("12 Orchard Ln, Springfield"));
        assert_eq!(report.generated_at, fixed_time());
    }

    #[test]
    fn positive_cashflow_splits_into_two_tax_tracks() {
        let report = compute_at(
            &conventional_listing(),
            &conventional_assumptions(),
            fixed_time(),
        );

        assert_eq!(report.down_payment, 50_000);
        assert_eq!(report.monthly_mortgage, 899);
        assert_eq!(report.monthly_pmi, 0);
        assert_eq!(report.pre_tax_cashflow, 759);
        assert_eq!(report.taxable_income, 759);
        assert_eq!(report.monthly_cashflow_low, 683);
        assert_eq!(report.monthly_cashflow_high, 531);
        assert_eq!(report.annual_cashflow_low, 8_197);
        assert_eq!(report.annual_cashflow_high, 6_376);
        assert_approx_tol(report.cap_rate, 9.95, 1e-9);
        assert_approx_tol(report.cashflow_apy_low, 16.394_562_985_050_67, 1e-6);
        assert_approx_tol(report.cashflow_apy_high, 12.751_326_766_150_52, 1e-6);
        assert_approx_tol(report.five_year_apy_low, 28.394_562_985_050_67, 1e-6);
        assert_approx_tol(report.five_year_apy_high, 24.751_326_766_150_52, 1e-6);
        assert!(report.monthly_cashflow_low > report.monthly_cashflow_high);
    }

    #[test]
    fn five_year_apy_is_annualized_not_cumulative() {
        let report = compute_at(
            &conventional_listing(),
            &conventional_assumptions(),
            fixed_time(),
        );
        let annual_total = (report.cashflow_apy_low / 100.0 * 50_000.0 + 6_000.0) / 50_000.0;
        assert_approx_tol(report.five_year_apy_low, annual_total * 100.0, 1e-6);
    }

    #[test]
    fn estimated_rent_uses_price_and_bedrooms() {
        assert_approx(estimate_rent(300_000.0, Some(3)), 2_550.0);
        assert_approx(estimate_rent(300_000.0, None), 2_500.0);
        assert_approx(estimate_rent(300_000.0, Some(0)), 2_400.0);
        // 0.8% of 100_062.5 is 800.5, which rounds up.
        assert_approx(estimate_rent(100_062.5, Some(0)), 801.0);
    }

    #[test]
    fn rent_override_must_be_positive_to_win() {
        let mut input = PropertyInput::with_price(300_000.0);
        input.bedrooms = Some(3);

        input.monthly_rent_override = Some(0.0);
        let report = compute_at(&input, &Assumptions::default(), fixed_time());
        assert!(report.rent_estimated);
        assert_eq!(report.monthly_rent, 2_550);

        input.monthly_rent_override = Some(2_100.0);
        let report = compute_at(&input, &Assumptions::default(), fixed_time());
        assert!(!report.rent_estimated);
        assert_eq!(report.monthly_rent, 2_100);
    }

    #[test]
    fn estimated_rent_scenario_matches_hand_calculation() {
        let mut input = PropertyInput::with_price(300_000.0);
        input.bedrooms = Some(3);
        let report = compute_at(&input, &Assumptions::default(), fixed_time());

        assert_eq!(report.monthly_rent, 2_550);
        assert_eq!(report.monthly_mortgage, 1_736);
        assert_eq!(report.monthly_pmi, 181);
        assert_eq!(report.monthly_maintenance, 128);
        assert_eq!(report.pre_tax_cashflow, -449);
        assert_approx_tol(report.cap_rate, 5.87, 1e-9);
    }

    #[test]
    fn expense_overrides_replace_estimates_including_zero() {
        let mut input = conventional_listing();
        input.monthly_property_tax_override = Some(0.0);
        input.monthly_insurance_override = Some(80.0);
        input.monthly_hoa = Some(215.0);

        let report = compute_at(&input, &conventional_assumptions(), fixed_time());
        assert_eq!(report.monthly_tax, 0);
        assert_eq!(report.monthly_insurance, 80);
        assert_eq!(report.monthly_hoa, 215);
    }

    #[test]
    fn pmi_boundary_at_exactly_eighty_percent_ltv() {
        let input = PropertyInput {
            price: 500_000.0,
            monthly_rent_override: Some(3_000.0),
            ..PropertyInput::default()
        };

        let mut assumptions = Assumptions::default();
        assumptions.down_payment_percent = 20.0;
        let at_boundary = compute_at(&input, &assumptions, fixed_time());
        assert_approx(at_boundary.ltv, 80.0);
        assert_eq!(at_boundary.monthly_pmi, 0);

        assumptions.down_payment_percent = 19.99;
        let just_above = compute_at(&input, &assumptions, fixed_time());
        assert!(just_above.ltv > 80.0);
        assert!(just_above.monthly_pmi > 0);

        assumptions.down_payment_percent = 20.01;
        let just_below = compute_at(&input, &assumptions, fixed_time());
        assert!(just_below.ltv < 80.0);
        assert_eq!(just_below.monthly_pmi, 0);
    }

    #[test]
    fn zero_interest_rate_yields_zero_payment() {
        assert_approx(monthly_payment(250_000.0, 0.0, 30), 0.0);
        assert_approx(monthly_payment(0.0, 6.0, 30), 0.0);
        assert_approx(monthly_payment(-10.0, 6.0, 30), 0.0);
        assert_approx(monthly_payment(250_000.0, 6.0, 0), 0.0);
    }

    #[test]
    fn annuity_payment_matches_reference_value() {
        assert_approx_tol(monthly_payment(482_500.0, 6.0, 30), 2_892.831_283_862, 1e-6);
        assert_approx_tol(monthly_payment(150_000.0, 6.0, 30), 899.325_787_729, 1e-6);
    }

    #[test]
    fn zero_price_produces_neutral_report() {
        let input = PropertyInput::with_price(0.0);
        let report = compute_at(&input, &Assumptions::default(), fixed_time());

        assert_eq!(report.price, 0);
        assert_eq!(report.down_payment, 0);
        assert_eq!(report.loan_amount, 0);
        assert_approx(report.ltv, 0.0);
        assert_eq!(report.monthly_mortgage, 0);
        assert_eq!(report.monthly_pmi, 0);
        assert_eq!(report.monthly_tax, 0);
        assert_eq!(report.monthly_insurance, 0);
        assert_approx(report.cap_rate, 0.0);
        assert_approx(report.cashflow_apy_low, 0.0);
        assert_approx(report.cashflow_apy_high, 0.0);
        assert_approx(report.five_year_apy_low, 0.0);
        assert_approx(report.five_year_apy_high, 0.0);
        assert_approx(report.cash_on_cash_return, 0.0);
        // Only the bedroom term of the estimate is left.
        assert_eq!(report.monthly_rent, 100);
    }

    #[test]
    fn zero_down_payment_zeroes_every_apy() {
        let mut assumptions = Assumptions::default();
        assumptions.down_payment_percent = 0.0;
        let report = compute_at(&sample_listing(), &assumptions, fixed_time());

        assert_eq!(report.down_payment, 0);
        assert_approx(report.cashflow_apy_low, 0.0);
        assert_approx(report.cashflow_apy_high, 0.0);
        assert_approx(report.five_year_apy_low, 0.0);
        assert_approx(report.five_year_apy_high, 0.0);
        assert!(report.monthly_pmi > 0);
    }

    #[test]
    fn closing_costs_only_affect_cash_invested_and_cash_on_cash() {
        let mut assumptions = conventional_assumptions();
        let without = compute_at(&conventional_listing(), &assumptions, fixed_time());
        assumptions.closing_cost_percent = 3.0;
        let with = compute_at(&conventional_listing(), &assumptions, fixed_time());

        assert_eq!(without.total_cash_invested, 50_000);
        assert_eq!(with.total_cash_invested, 56_000);
        assert!(with.cash_on_cash_return < without.cash_on_cash_return);
        assert_approx(with.cashflow_apy_low, without.cashflow_apy_low);
        assert_eq!(with.pre_tax_cashflow, without.pre_tax_cashflow);
    }

    #[test]
    fn simple_preset_has_no_pmi_or_income_tax() {
        let input = PropertyInput {
            price: 350_000.0,
            monthly_rent_override: Some(3_200.0),
            ..PropertyInput::default()
        };
        let report = compute_at(&input, &Assumptions::simple(), fixed_time());

        assert_eq!(report.down_payment, 70_000);
        assert_eq!(report.monthly_pmi, 0);
        assert_eq!(report.income_tax_low, 0);
        assert_eq!(report.income_tax_high, 0);
        assert_eq!(report.monthly_cashflow_low, report.pre_tax_cashflow);
        assert_eq!(report.annual_appreciation, 0);
        assert_eq!(report.total_cash_invested, 80_500);
        assert_eq!(report.monthly_maintenance, 160);
        assert_eq!(report.monthly_vacancy, 160);
    }

    #[test]
    fn round_currency_rounds_half_up_and_drops_non_finite() {
        assert_eq!(round_currency(2.5), 3);
        assert_eq!(round_currency(-2.5), -2);
        assert_eq!(round_currency(-2.6), -3);
        assert_eq!(round_currency(f64::NAN), 0);
        assert_eq!(round_currency(f64::INFINITY), 0);
    }

    #[test]
    fn compute_does_not_mutate_assumptions() {
        let assumptions = Assumptions::default();
        let before = assumptions;
        let report = compute(&sample_listing(), &assumptions);
        assert_eq!(assumptions, before);
        assert_eq!(report.assumptions, before);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_payment_exceeds_principal_and_grows_with_rate(
            loan in 1_000u32..2_000_000,
            rate_bp in 1u32..1_500,
            bump_bp in 1u32..500,
            term in 1u32..41
        ) {
            let loan = loan as f64;
            let rate = rate_bp as f64 / 100.0;
            let payment = monthly_payment(loan, rate, term);
            let total_interest = payment * term as f64 * 12.0 - loan;
            prop_assert!(payment.is_finite());
            prop_assert!(total_interest > 0.0);

            let higher = monthly_payment(loan, rate + bump_bp as f64 / 100.0, term);
            prop_assert!(higher > payment);
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_pmi_follows_ltv_threshold(
            price in 1_000u32..3_000_000,
            down_bp in 0u32..10_001,
            pmi_bp in 1u32..300
        ) {
            let input = PropertyInput {
                price: price as f64,
                monthly_rent_override: Some(2_000.0),
                ..PropertyInput::default()
            };
            let mut assumptions = Assumptions::default();
            assumptions.down_payment_percent = down_bp as f64 / 100.0;
            assumptions.pmi_rate = pmi_bp as f64 / 100.0;

            let price = input.price;
            let loan = price - price * assumptions.down_payment_percent / 100.0;
            let report = compute_at(&input, &assumptions, fixed_time());
            if loan / price > 0.80 {
                // Sub-unit premiums round to zero on tiny loans.
                let raw = loan * assumptions.pmi_rate / 100.0 / 12.0;
                if raw >= 0.5 {
                    prop_assert!(report.monthly_pmi > 0);
                }
            } else {
                prop_assert_eq!(report.monthly_pmi, 0);
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_negative_cashflow_is_never_taxed(
            price in 50_000u32..2_000_000,
            rent in 0u32..1_000,
            low_bp in 0u32..5_000,
            high_bp in 0u32..5_000
        ) {
            let input = PropertyInput {
                price: price as f64,
                monthly_rent_override: Some(rent as f64 + 1.0),
                ..PropertyInput::default()
            };
            let mut assumptions = Assumptions::default();
            assumptions.income_tax_rate_low = low_bp as f64 / 100.0;
            assumptions.income_tax_rate_high = high_bp as f64 / 100.0;

            let report = compute_at(&input, &assumptions, fixed_time());
            if report.pre_tax_cashflow < 0 {
                prop_assert_eq!(report.taxable_income, 0);
                prop_assert_eq!(report.income_tax_low, 0);
                prop_assert_eq!(report.income_tax_high, 0);
                prop_assert_eq!(report.monthly_cashflow_low, report.pre_tax_cashflow);
                prop_assert_eq!(report.monthly_cashflow_high, report.pre_tax_cashflow);
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_outputs_are_finite_and_repeatable(
            price in 0u32..5_000_000,
            rent in proptest::option::of(0u32..20_000),
            bedrooms in proptest::option::of(0u32..8),
            hoa in proptest::option::of(0u32..2_000),
            down_bp in 0u32..10_001,
            rate_bp in 0u32..2_000,
            term in 1u32..51,
            appreciation_bp in -500i32..1_000
        ) {
            let input = PropertyInput {
                price: price as f64,
                monthly_rent_override: rent.map(f64::from),
                bedrooms,
                monthly_hoa: hoa.map(f64::from),
                ..PropertyInput::default()
            };
            let assumptions = Assumptions {
                down_payment_percent: down_bp as f64 / 100.0,
                interest_rate: rate_bp as f64 / 100.0,
                loan_term_years: term,
                appreciation_rate: appreciation_bp as f64 / 100.0,
                ..Assumptions::default()
            };

            let first = compute_at(&input, &assumptions, fixed_time());
            let second = compute_at(&input, &assumptions, fixed_time());
            prop_assert_eq!(&first, &second);

            for value in [
                first.ltv,
                first.cap_rate,
                first.cashflow_apy_low,
                first.cashflow_apy_high,
                first.five_year_apy_low,
                first.five_year_apy_high,
                first.cash_on_cash_return,
            ] {
                prop_assert!(value.is_finite());
            }
            if first.down_payment == 0 && down_bp == 0 {
                prop_assert_eq!(first.cashflow_apy_low, 0.0);
                prop_assert_eq!(first.five_year_apy_high, 0.0);
            }
            prop_assert!(first.monthly_cashflow_low >= first.monthly_cashflow_high
                || assumptions.income_tax_rate_low > assumptions.income_tax_rate_high);
        }
    }
}
