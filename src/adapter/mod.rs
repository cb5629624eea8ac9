//! In-process implementations of the ports.
//!
//! These back the `simulate` command and the test suite. Production wiring
//! plugs real pricing, oracle and custody systems into the same traits.

mod custody;
mod oracle;
mod pricing;

pub use custody::InMemoryCustody;
pub use oracle::ManualOracle;
pub use pricing::FixedPriceEngine;
