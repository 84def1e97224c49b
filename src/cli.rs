use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use crate::api::{AppState, run_http_server};
use crate::config::{AppPaths, server_port};
use crate::core::{
    AssumptionOverrides, AssumptionPreset, Assumptions, CashflowReport, PropertyInput, compute,
};
use crate::error::CashflowResult;
use crate::export::{CsvFileSink, ExportRecord, ExportSink};
use crate::store::{AssumptionStore, JsonFileStore, resolve_assumptions};

#[derive(Parser, Debug)]
#[command(
    name = "rental-cashflow",
    version,
    about = "Rental property cashflow analyzer (loan, expenses, tax-adjusted returns)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze one listing and print the cashflow breakdown
    Analyze(AnalyzeArgs),

    /// Show or change the stored assumptions
    #[command(subcommand)]
    Assumptions(AssumptionsCommand),

    /// Start the HTTP API
    Serve {
        /// Port to listen on; defaults to $PORT or 8080
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AssumptionsCommand {
    /// Print the resolved assumptions
    Show {
        #[arg(long, value_enum, default_value_t = CliPreset::Detailed)]
        preset: CliPreset,
        #[arg(long)]
        json: bool,
    },
    /// Store the given values on top of what is already stored
    Set(AssumptionArgs),
    /// Remove every stored value
    Reset,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliPreset {
    Detailed,
    Simple,
}

impl From<CliPreset> for AssumptionPreset {
    fn from(value: CliPreset) -> Self {
        match value {
            CliPreset::Detailed => AssumptionPreset::Detailed,
            CliPreset::Simple => AssumptionPreset::Simple,
        }
    }
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub property: PropertyArgs,

    #[arg(
        long,
        value_enum,
        default_value_t = CliPreset::Detailed,
        help = "Base assumption set before stored and command-line overrides"
    )]
    pub preset: CliPreset,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    #[arg(long, help = "Print the full report as JSON")]
    pub json: bool,

    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        help = "Append the result to a CSV ledger (defaults to the data directory)"
    )]
    pub export: Option<Option<PathBuf>>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PropertyArgs {
    #[arg(long, help = "Purchase price")]
    pub price: f64,
    #[arg(long, help = "Monthly rent; estimated from price and bedrooms when omitted")]
    pub rent: Option<f64>,
    #[arg(long)]
    pub bedrooms: Option<u32>,
    #[arg(long)]
    pub bathrooms: Option<f64>,
    #[arg(long)]
    pub sqft: Option<f64>,
    #[arg(long)]
    pub year_built: Option<u32>,
    #[arg(long, help = "Monthly HOA fee")]
    pub hoa: Option<f64>,
    #[arg(long, help = "Monthly property tax; estimated from the tax rate when omitted")]
    pub property_tax: Option<f64>,
    #[arg(long, help = "Monthly insurance; estimated from the insurance rate when omitted")]
    pub insurance: Option<f64>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
}

impl PropertyArgs {
    pub fn to_input(&self) -> PropertyInput {
        PropertyInput {
            price: self.price,
            monthly_rent_override: self.rent,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            sqft: self.sqft,
            year_built: self.year_built,
            monthly_hoa: self.hoa,
            monthly_property_tax_override: self.property_tax,
            monthly_insurance_override: self.insurance,
            address: self.address.clone(),
            url: self.url.clone(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct AssumptionArgs {
    #[arg(long, help = "Down payment in percent of price")]
    pub down_payment_percent: Option<f64>,
    #[arg(long, help = "Annual mortgage interest rate in percent")]
    pub interest_rate: Option<f64>,
    #[arg(long)]
    pub loan_term_years: Option<u32>,
    #[arg(long, help = "Annual property tax in percent of price")]
    pub property_tax_rate: Option<f64>,
    #[arg(long, help = "Annual insurance in percent of price")]
    pub insurance_rate: Option<f64>,
    #[arg(long, help = "Maintenance in percent of monthly rent")]
    pub maintenance_percent: Option<f64>,
    #[arg(long, help = "Vacancy allowance in percent of monthly rent")]
    pub vacancy_rate: Option<f64>,
    #[arg(long, help = "Property management in percent of monthly rent")]
    pub management_percent: Option<f64>,
    #[arg(long, help = "Annual PMI in percent of the loan, charged above 80% LTV")]
    pub pmi_rate: Option<f64>,
    #[arg(long, help = "Lower marginal income tax rate in percent")]
    pub income_tax_rate_low: Option<f64>,
    #[arg(long, help = "Higher marginal income tax rate in percent")]
    pub income_tax_rate_high: Option<f64>,
    #[arg(long, help = "Annual appreciation in percent", allow_hyphen_values = true)]
    pub appreciation_rate: Option<f64>,
    #[arg(long, help = "Closing costs in percent of price")]
    pub closing_cost_percent: Option<f64>,
}

impl From<&AssumptionArgs> for AssumptionOverrides {
    fn from(args: &AssumptionArgs) -> Self {
        AssumptionOverrides {
            down_payment_percent: args.down_payment_percent,
            interest_rate: args.interest_rate,
            loan_term_years: args.loan_term_years,
            property_tax_rate: args.property_tax_rate,
            insurance_rate: args.insurance_rate,
            maintenance_percent: args.maintenance_percent,
            vacancy_rate: args.vacancy_rate,
            management_percent: args.management_percent,
            pmi_rate: args.pmi_rate,
            income_tax_rate_low: args.income_tax_rate_low,
            income_tax_rate_high: args.income_tax_rate_high,
            appreciation_rate: args.appreciation_rate,
            closing_cost_percent: args.closing_cost_percent,
        }
    }
}

pub async fn run(cli: Cli) -> CashflowResult<()> {
    let paths = AppPaths::new()?;
    let store = JsonFileStore::new(paths.assumptions_file());

    match cli.command {
        Command::Analyze(args) => analyze(&args, &store, &paths),
        Command::Assumptions(command) => manage_assumptions(command, &store),
        Command::Serve { port } => {
            let port = port.unwrap_or_else(server_port);
            let sink = CsvFileSink::new(paths.export_file());
            info!(
                "serving with assumptions at {} and export ledger at {}",
                store.path().display(),
                sink.path().display()
            );
            let state = AppState::new(Arc::new(store), Box::new(sink));
            run_http_server(port, state).await?;
            Ok(())
        }
    }
}

fn analyze(args: &AnalyzeArgs, store: &JsonFileStore, paths: &AppPaths) -> CashflowResult<()> {
    let input = args.property.to_input();
    input.validate()?;
    let overrides = AssumptionOverrides::from(&args.assumptions);
    let assumptions = resolve_assumptions(store, args.preset.into(), &overrides)?;
    let report = compute(&input, &assumptions);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", ReportSummary(&report));
    }

    if let Some(target) = &args.export {
        let path = target.clone().unwrap_or_else(|| paths.export_file());
        let mut sink = CsvFileSink::new(path);
        sink.append(&ExportRecord::from_report(&report))?;
        println!("Exported to {}", sink.path().display());
    }

    Ok(())
}

fn manage_assumptions(command: AssumptionsCommand, store: &JsonFileStore) -> CashflowResult<()> {
    match command {
        AssumptionsCommand::Show { preset, json } => {
            let assumptions = store.resolve(&AssumptionPreset::from(preset).assumptions())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&assumptions)?);
            } else {
                print!("{}", AssumptionTable(&assumptions));
            }
        }
        AssumptionsCommand::Set(args) => {
            let merged = store
                .load()?
                .merged_with(&AssumptionOverrides::from(&args));
            merged.apply_to(&Assumptions::default()).validate()?;
            store.save(&merged)?;
            print!("{}", AssumptionTable(&merged.apply_to(&Assumptions::default())));
        }
        AssumptionsCommand::Reset => {
            store.reset()?;
            println!("Assumptions reset to defaults");
        }
    }
    Ok(())
}

/// Text breakdown of one report as printed by `analyze`.
pub struct ReportSummary<'a>(pub &'a CashflowReport);

impl fmt::Display for ReportSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "{}", report.address.as_deref().unwrap_or("Listing"))?;
        if let Some(url) = &report.url {
            writeln!(f, "{url}")?;
        }
        writeln!(f)?;

        let rent_note = if report.rent_estimated { " (estimated)" } else { "" };
        writeln!(f, "Price               {:>10}", money(report.price))?;
        writeln!(
            f,
            "Monthly rent        {:>10}{rent_note}",
            money(report.monthly_rent)
        )?;
        writeln!(f, "Down payment        {:>10}", money(report.down_payment))?;
        writeln!(f, "Loan amount         {:>10}", money(report.loan_amount))?;
        writeln!(f, "Loan-to-value       {:>9.2}%", report.ltv)?;
        writeln!(f)?;

        writeln!(f, "Monthly expenses")?;
        for (label, amount) in [
            ("Mortgage (P&I)", report.monthly_mortgage),
            ("Property tax", report.monthly_tax),
            ("Insurance", report.monthly_insurance),
            ("HOA", report.monthly_hoa),
            ("Maintenance", report.monthly_maintenance),
            ("Vacancy", report.monthly_vacancy),
            ("Management", report.monthly_management),
            ("PMI", report.monthly_pmi),
            ("Total", report.monthly_total_expenses),
        ] {
            writeln!(f, "  {label:<18}{:>10}", money(amount))?;
        }
        writeln!(f)?;

        writeln!(f, "Cashflow            {:>10}", "pre-tax")?;
        writeln!(f, "  Monthly           {:>10}", money(report.pre_tax_cashflow))?;
        for (rate, monthly, annual) in [
            (
                report.assumptions.income_tax_rate_low,
                report.monthly_cashflow_low,
                report.annual_cashflow_low,
            ),
            (
                report.assumptions.income_tax_rate_high,
                report.monthly_cashflow_high,
                report.annual_cashflow_high,
            ),
        ] {
            writeln!(
                f,
                "  After {rate}% tax   {:>10}  ({} / yr)",
                money(monthly),
                money(annual)
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Returns")?;
        writeln!(f, "  Cap rate          {:>9.2}%", report.cap_rate)?;
        writeln!(
            f,
            "  Cashflow APY      {:>9.2}% / {:.2}%",
            report.cashflow_apy_low, report.cashflow_apy_high
        )?;
        writeln!(
            f,
            "  5-year APY        {:>9.2}% / {:.2}%",
            report.five_year_apy_low, report.five_year_apy_high
        )?;
        writeln!(f, "  Cash on cash      {:>9.2}%", report.cash_on_cash_return)
    }
}

pub struct AssumptionTable<'a>(pub &'a Assumptions);

impl fmt::Display for AssumptionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.0;
        for (label, value, unit) in [
            ("Down payment", a.down_payment_percent, "%"),
            ("Interest rate", a.interest_rate, "%"),
            ("Loan term", f64::from(a.loan_term_years), " years"),
            ("Property tax", a.property_tax_rate, "% / yr"),
            ("Insurance", a.insurance_rate, "% / yr"),
            ("Maintenance", a.maintenance_percent, "% of rent"),
            ("Vacancy", a.vacancy_rate, "% of rent"),
            ("Management", a.management_percent, "% of rent"),
            ("PMI", a.pmi_rate, "% / yr"),
            ("Income tax (low)", a.income_tax_rate_low, "%"),
            ("Income tax (high)", a.income_tax_rate_high, "%"),
            ("Appreciation", a.appreciation_rate, "% / yr"),
            ("Closing costs", a.closing_cost_percent, "%"),
        ] {
            writeln!(f, "{label:<18}{value}{unit}")?;
        }
        Ok(())
    }
}

fn money(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
