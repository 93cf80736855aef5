//! FIFO settlement of sales against the lot ledger.

mod disposal_matcher;
mod disposal_model;

pub use disposal_matcher::DisposalMatcher;
pub use disposal_model::{Disposal, DisposalException, LotMatch, MatchingError};
