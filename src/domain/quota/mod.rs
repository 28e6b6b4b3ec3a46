//! Quota tracking in rolling UTC calendar windows.

mod ledger;
mod window;

pub use ledger::{QuotaDecision, QuotaError, QuotaLedger, QuotaLimits};
pub use window::{QuotaWindow, WindowKind};
