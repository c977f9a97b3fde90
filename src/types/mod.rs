pub mod document;
pub mod report;

pub use document::{SearchDocument, SearchParameters, SearchSummary, DEFAULT_SOURCE};
pub use report::{airport_name, render_summary, render_table};
