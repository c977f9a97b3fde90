use crate::{
    core::{
        quote::{FlightInfo, QuoteClient, RawQuote, Route},
        window::CandidateTrip,
    },
    error::{Result, SweepError},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

const SEARCH_TARGET: &str = "fare_sweep::search";
/// Failures logged with full detail before switching to one-line notices
const MAX_DETAILED_FAILURES: usize = 5;
const PROGRESS_INTERVAL: usize = 10;

pub const DEFAULT_PACING: Duration = Duration::from_secs(1);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Decides how long to wait before each external call after the first
pub trait PacingPolicy: Send + Sync + std::fmt::Debug {
    /// `call_index` is the zero-based index of the upcoming call, always > 0
    fn delay_before(&self, call_index: usize) -> Duration;
}

/// The same pause before every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPacing {
    pub interval: Duration,
}

impl FixedPacing {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_secs_f64(seconds: f64) -> Result<Self> {
        Duration::try_from_secs_f64(seconds)
            .map(Self::new)
            .map_err(|_| SweepError::Config(format!("invalid pacing delay: {}s", seconds)))
    }
}

impl Default for FixedPacing {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

impl PacingPolicy for FixedPacing {
    fn delay_before(&self, _call_index: usize) -> Duration {
        self.interval
    }
}

/// Create a linked cancel handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        CancelHandle {
            sender: Arc::new(sender),
        },
        CancelSignal { receiver },
    )
}

/// Requests cancellation of a running search
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Observed by the orchestrator between and during calls
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_handle, signal) = cancel_pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested; pends forever if the handle is dropped first
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// What a single lookup produced
#[derive(Debug)]
pub enum LookupOutcome {
    Success(FlightInfo),
    NoResult,
    Failure(SweepError),
}

impl From<Result<Option<FlightInfo>>> for LookupOutcome {
    fn from(result: Result<Option<FlightInfo>>) -> Self {
        match result {
            Ok(Some(info)) => LookupOutcome::Success(info),
            Ok(None) => LookupOutcome::NoResult,
            Err(err) => LookupOutcome::Failure(err),
        }
    }
}

/// Call tallies for one search run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCounters {
    pub attempted: usize,
    pub succeeded: usize,
    pub no_result: usize,
    pub failed: usize,
}

/// Result of a search run
#[derive(Debug, Clone)]
pub struct SearchRun {
    /// Successful quotes in enumeration order
    pub quotes: Vec<RawQuote>,
    pub counters: SearchCounters,
    /// True when the run stopped early on cancellation
    pub interrupted: bool,
    pub duration: Duration,
}

impl SearchRun {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} attempted, {} succeeded, {} without result, {} failed in {:.1}s",
            self.counters.attempted,
            self.counters.succeeded,
            self.counters.no_result,
            self.counters.failed,
            self.duration.as_secs_f64()
        );
        if self.interrupted {
            line.push_str(" (interrupted)");
        }
        line
    }
}

/// Drives a quote client over candidate trips, one call at a time
#[derive(Debug)]
pub struct SearchOrchestrator<C> {
    client: C,
    pacing: Box<dyn PacingPolicy>,
    call_timeout: Duration,
}

impl<C: QuoteClient> SearchOrchestrator<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            pacing: Box::new(FixedPacing::default()),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_pacing(mut self, pacing: impl PacingPolicy + 'static) -> Self {
        self.pacing = Box::new(pacing);
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn pacing(&self) -> &dyn PacingPolicy {
        self.pacing.as_ref()
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Look up one trip, bounded by the call timeout
    pub async fn lookup_trip(&self, route: &Route, trip: &CandidateTrip) -> LookupOutcome {
        let lookup = self.client.lookup(
            &route.origin,
            &route.destination,
            trip.departure_date,
            trip.return_date,
        );

        match timeout(self.call_timeout, lookup).await {
            Ok(result) => result.into(),
            Err(_) => LookupOutcome::Failure(SweepError::Timeout(self.call_timeout.as_secs())),
        }
    }

    /// Query every candidate in order and collect the successful quotes.
    ///
    /// Failures never abort the run. Cancellation stops further calls and
    /// returns whatever was collected.
    pub async fn run<I>(&self, trips: I, route: &Route, cancel: &CancelSignal) -> SearchRun
    where
        I: IntoIterator<Item = CandidateTrip>,
    {
        let start_time = Instant::now();
        let mut quotes = Vec::new();
        let mut counters = SearchCounters::default();
        let mut interrupted = false;

        info!(
            target: SEARCH_TARGET,
            route = %route.label(),
            pacing = ?self.pacing,
            call_timeout_secs = self.call_timeout.as_secs(),
            "Starting fare search"
        );

        for (index, trip) in trips.into_iter().enumerate() {
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            if index > 0 {
                let delay = self.pacing.delay_before(index);
                if !delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            interrupted = true;
                            break;
                        }
                        _ = sleep(delay) => {}
                    }
                }
            }

            counters.attempted += 1;
            debug!(
                target: SEARCH_TARGET,
                departure = %trip.departure_date,
                return_date = %trip.return_date,
                stay_days = trip.stay_days,
                "Looking up fare"
            );

            let outcome = tokio::select! {
                biased;
                outcome = self.lookup_trip(route, &trip) => outcome,
                _ = cancel.cancelled() => {
                    warn!(
                        target: SEARCH_TARGET,
                        departure = %trip.departure_date,
                        return_date = %trip.return_date,
                        "Search cancelled during lookup"
                    );
                    interrupted = true;
                    break;
                }
            };

            match outcome {
                LookupOutcome::Success(flight_info) => {
                    counters.succeeded += 1;
                    quotes.push(RawQuote::new(&trip, flight_info));
                }
                LookupOutcome::NoResult => {
                    counters.no_result += 1;
                    info!(
                        target: SEARCH_TARGET,
                        departure = %trip.departure_date,
                        return_date = %trip.return_date,
                        "No fare found"
                    );
                }
                LookupOutcome::Failure(err) => {
                    counters.failed += 1;
                    if counters.failed <= MAX_DETAILED_FAILURES {
                        warn!(
                            target: SEARCH_TARGET,
                            departure = %trip.departure_date,
                            return_date = %trip.return_date,
                            code = err.error_code(),
                            error = %err,
                            "Lookup failed"
                        );
                    } else {
                        warn!(
                            target: SEARCH_TARGET,
                            departure = %trip.departure_date,
                            return_date = %trip.return_date,
                            code = err.error_code(),
                            "Lookup failed"
                        );
                    }
                }
            }

            if counters.attempted % PROGRESS_INTERVAL == 0 {
                info!(
                    target: SEARCH_TARGET,
                    attempted = counters.attempted,
                    succeeded = counters.succeeded,
                    "Search progress"
                );
            }
        }

        if interrupted {
            warn!(
                target: SEARCH_TARGET,
                attempted = counters.attempted,
                collected = quotes.len(),
                "Search interrupted, keeping partial results"
            );
        }

        let run = SearchRun {
            quotes,
            counters,
            interrupted,
            duration: start_time.elapsed(),
        };
        info!(target: SEARCH_TARGET, "Search finished: {}", run.summary());
        run
    }
}
