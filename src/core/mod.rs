mod engine;
mod types;

pub use engine::{compute, compute_at, estimate_rent, monthly_payment};
pub use types::{
    AssumptionOverrides, AssumptionPreset, Assumptions, CashflowReport, PropertyInput,
};
