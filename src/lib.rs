//! fare-sweep: find the cheapest round-trip fares across a flexible travel window
//!
//! The library enumerates candidate departure/return pairs, prices each one
//! through a [`QuoteClient`] at a controlled pace, and consolidates the quotes
//! into a deduplicated ranking with weekend-aware views.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fare_sweep::{
//!     cancel_pair, consolidate, FlightSearchClient, Route, SearchOrchestrator, SearchWindow,
//!     StayRule,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let route = Route::new("PUS", "NRT");
//!     let window = SearchWindow::parse("2025-07-01", "2025-07-10")?;
//!     let trips = window.candidates(StayRule::range(5, 7)?);
//!
//!     let orchestrator = SearchOrchestrator::new(FlightSearchClient::from_env()?);
//!     let (_handle, signal) = cancel_pair();
//!     let run = orchestrator.run(trips, &route, &signal).await;
//!
//!     let consolidation = consolidate(&run.quotes, 3);
//!     if let Some(best) = consolidation.cheapest() {
//!         println!("{} on {} for {}", best.flight_number, best.departure_date, best.total_price);
//!     }
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod error;
pub mod services;
pub mod types;

pub use core::{
    cancel_pair, consolidate, enumerate, format_price, parse_date, parse_price, stay_length,
    weekend_count, CancelHandle, CancelSignal, CandidateTrip, ConsolidatedFlight, Consolidation,
    FixedPacing, FlightInfo, FlightNumberStats, LookupOutcome, PacingPolicy, PriceStats,
    QuoteClient, RawQuote, Route, SearchCounters, SearchOrchestrator, SearchRun, SearchWindow,
    StayRule, TripCandidates, WeekendCoverage,
};
pub use error::{Result, SweepError};
pub use services::{
    load_search_document, save_consolidated, save_search_document, save_summary_markdown,
    FlightSearchClient,
};
pub use types::{
    airport_name, render_summary, render_table, SearchDocument, SearchParameters, SearchSummary,
};

#[cfg(feature = "cli")]
pub mod cli;
