pub mod finding;
pub mod literature;

pub use finding::{GapFinding, GapSummary, Score};
pub use literature::LiteratureRecord;
