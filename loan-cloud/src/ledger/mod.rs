//! Loan ledger core
//!
//! - [`policy`]: tier allowances
//! - [`cycle`]: monthly usage window
//! - [`allowance`]: checkout/swap guards
//! - [`lifecycle`]: transactional checkout, return, swap
//! - [`store`]: persistence seam

pub mod allowance;
pub mod cycle;
pub mod lifecycle;
pub mod policy;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use cycle::Cycle;
pub use lifecycle::{Clock, LoanLedger, SystemClock};
pub use policy::{TierPolicy, TierPolicyTable};
pub use store::{CounterDelta, LedgerStore, LedgerTx, NewLoan};
