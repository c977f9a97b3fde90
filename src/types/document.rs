use crate::{
    core::{RawQuote, Route, SearchRun, SearchWindow, StayRule, TripCandidates},
    error::{Result, SweepError},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE: &str = "naver_flight_api";

fn default_adults() -> u32 {
    1
}

/// Everything needed to run one sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameters {
    pub origin: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub stay: StayRule,
    #[serde(default = "default_adults")]
    pub adults: u32,
}

impl SearchParameters {
    pub fn new(route: Route, window: SearchWindow, stay: StayRule) -> Self {
        Self {
            origin: route.origin,
            destination: route.destination,
            start_date: window.start_date,
            end_date: window.end_date,
            stay,
            adults: 1,
        }
    }

    pub fn with_adults(mut self, adults: u32) -> Self {
        self.adults = adults;
        self
    }

    pub fn route(&self) -> Route {
        Route::new(&self.origin, &self.destination)
    }

    pub fn window(&self) -> SearchWindow {
        SearchWindow::new(self.start_date, self.end_date)
    }

    pub fn candidates(&self) -> TripCandidates {
        self.window().candidates(self.stay)
    }

    pub fn validate(&self) -> Result<()> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(SweepError::Config(
                "origin and destination are required".to_string(),
            ));
        }
        if self.adults == 0 {
            return Err(SweepError::Config("at least one adult is required".to_string()));
        }
        Ok(())
    }
}

/// Run totals stored next to the raw quotes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    #[serde(default, alias = "total_combinations")]
    pub total_results: usize,
    #[serde(default)]
    pub attempted: usize,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub no_result: usize,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub search_date: String,
    #[serde(default)]
    pub source: String,
}

impl SearchSummary {
    pub fn from_run(run: &SearchRun, search_date: String) -> Self {
        Self {
            total_results: run.quotes.len(),
            attempted: run.counters.attempted,
            failed: run.counters.failed,
            no_result: run.counters.no_result,
            interrupted: run.interrupted,
            search_date,
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Raw quotes of a sweep as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_parameters: Option<SearchParameters>,
    #[serde(alias = "naver_flight_results")]
    pub flight_results: Vec<RawQuote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_summary: Option<SearchSummary>,
}

impl SearchDocument {
    /// Route recorded in the document, if any
    pub fn route(&self) -> Option<Route> {
        self.search_parameters.as_ref().map(SearchParameters::route)
    }
}
