pub mod candidate;
pub mod cases;
pub mod chop;
pub mod harness;

pub use candidate::{Candidate, Chopper};
pub use cases::{Case, CaseTable, ParseError};
pub use harness::{Failure, Fault};
