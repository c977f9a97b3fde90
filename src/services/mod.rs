pub mod flight_client;
pub mod storage;

pub use flight_client::FlightSearchClient;
pub use storage::{
    load_search_document, save_consolidated, save_search_document, save_summary_markdown,
    ConsolidatedSummary,
};
