pub mod consolidate;
pub mod orchestrator;
pub mod quote;
pub mod window;

pub use consolidate::{
    consolidate, format_price, parse_price, weekend_count, ConsolidatedFlight, Consolidation,
    FlightNumberStats, PriceStats, WeekendCoverage,
};
pub use orchestrator::{
    cancel_pair, CancelHandle, CancelSignal, FixedPacing, LookupOutcome, PacingPolicy,
    SearchCounters, SearchOrchestrator, SearchRun,
};
pub use quote::{FlightInfo, QuoteClient, RawQuote, Route};
pub use window::{enumerate, parse_date, stay_length, CandidateTrip, SearchWindow, StayRule, TripCandidates};
