//! Pure derivations over raw gateway data: performance series, percent
//! changes, trade filtering and sorting, holdings totals, and formatting.

pub mod format;
pub mod holdings;
pub mod series;
pub mod trades;

pub use format::*;
pub use holdings::*;
pub use series::*;
pub use trades::*;
