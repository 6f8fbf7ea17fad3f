// Tue Jan 13 2026 - Alex

pub mod error;
pub mod matcher;
pub mod pattern;

pub use error::PatternError;
pub use matcher::{search, MaskedMatcher};
pub use pattern::Pattern;
