use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use fare_sweep::{
    cancel_pair, consolidate, format_price, CancelHandle, CancelSignal, FixedPacing, FlightInfo,
    QuoteClient, RawQuote, Route, SearchOrchestrator, SearchWindow, StayRule, SweepError,
    WeekendCoverage,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

type Script =
    Box<dyn Fn(NaiveDate, NaiveDate) -> fare_sweep::Result<Option<FlightInfo>> + Send + Sync>;

/// Quote client driven by a closure, recording when each call starts
struct ScriptedClient {
    script: Script,
    calls: AtomicUsize,
    started: Mutex<Vec<Instant>>,
    cancel_after: Option<(usize, CancelHandle)>,
    stall_on: Option<NaiveDate>,
    latency: Duration,
}

impl ScriptedClient {
    fn new(
        script: impl Fn(NaiveDate, NaiveDate) -> fare_sweep::Result<Option<FlightInfo>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            cancel_after: None,
            stall_on: None,
            latency: Duration::ZERO,
        }
    }

    fn cancel_after(mut self, calls: usize, handle: CancelHandle) -> Self {
        self.cancel_after = Some((calls, handle));
        self
    }

    fn stall_on(mut self, departure: NaiveDate) -> Self {
        self.stall_on = Some(departure);
        self
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteClient for ScriptedClient {
    async fn lookup(
        &self,
        _origin: &str,
        _destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
    ) -> fare_sweep::Result<Option<FlightInfo>> {
        self.started.lock().unwrap().push(Instant::now());
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.stall_on == Some(departure_date) {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = (self.script)(departure_date, return_date);
        if let Some((after, handle)) = &self.cancel_after {
            if call == *after {
                handle.cancel();
            }
        }
        result
    }
}

fn date(value: &str) -> NaiveDate {
    assert_ok!(fare_sweep::parse_date(value))
}

fn priced(amount: u64, flight: &str) -> FlightInfo {
    FlightInfo {
        outbound_flight: Some(flight.to_string()),
        return_flight: Some(format!("{}R", flight)),
        total_price: Some(format_price(amount)),
        outbound_departure: Some("07:20".to_string()),
        ..FlightInfo::default()
    }
}

/// Cheaper the later the departure, pricier the longer the stay
fn price_by_dates(departure: NaiveDate, ret: NaiveDate) -> fare_sweep::Result<Option<FlightInfo>> {
    let stay = (ret - departure).num_days() as u64;
    let amount = 200_000 - u64::from(departure.day()) * 5_000 + stay * 2_000;
    Ok(Some(priced(amount, "7C1151")))
}

fn no_pacing() -> FixedPacing {
    FixedPacing::new(Duration::ZERO)
}

#[tokio::test]
async fn test_full_sweep_with_mixed_outcomes() {
    let window = assert_ok!(SearchWindow::parse("2025-07-01", "2025-07-10"));
    let rule = assert_ok!(StayRule::range(5, 7));
    let trips = window.candidates(rule);
    assert_eq!(trips.clone().count(), 15);

    let failing = date("2025-07-03");
    let empty = date("2025-07-04");
    let client = ScriptedClient::new(move |departure, ret| {
        if departure == failing {
            Err(SweepError::Upstream {
                status: 503,
                message: "busy".to_string(),
            })
        } else if departure == empty {
            Ok(None)
        } else {
            price_by_dates(departure, ret)
        }
    });

    let orchestrator = SearchOrchestrator::new(client).with_pacing(no_pacing());
    let route = Route::new("PUS", "NRT");
    let run = orchestrator
        .run(trips, &route, &CancelSignal::never())
        .await;

    assert!(!run.interrupted);
    assert_eq!(run.counters.attempted, 15);
    assert_eq!(run.counters.failed, 3);
    assert_eq!(run.counters.no_result, 3);
    assert_eq!(run.counters.succeeded, 9);
    assert_eq!(run.quotes.len(), 9);
    assert_eq!(orchestrator.client().call_count(), 15);

    // quotes keep enumeration order
    let keys: Vec<_> = run
        .quotes
        .iter()
        .map(|q| (q.departure_date, q.return_date))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let consolidation = consolidate(&run.quotes, 3);
    assert_eq!(consolidation.ranked.len(), 9);
    let prices: Vec<u64> = consolidation.ranked.iter().map(|f| f.price_numeric).collect();
    assert!(prices.windows(2).all(|pair| pair[0] <= pair[1]));

    // latest departure with the shortest stay is cheapest
    let best = consolidation.cheapest().unwrap();
    assert_eq!(best.departure_date, date("2025-07-06"));
    assert_eq!(best.return_date, date("2025-07-10"));

    for flight in &consolidation.one_weekend_day {
        assert_eq!(flight.weekend_coverage(), WeekendCoverage::OneDay);
    }
    for flight in &consolidation.full_weekend {
        assert!(flight.weekend_days() >= 2);
    }
    assert!(consolidation.full_weekend.len() <= 3);
}

#[tokio::test]
async fn test_cancel_keeps_partial_results() {
    let window = SearchWindow::new(date("2025-07-01"), date("2025-07-10"));
    let trips = window.candidates(assert_ok!(StayRule::fixed(3)));
    assert_eq!(trips.clone().count(), 10);

    let (handle, signal) = cancel_pair();
    let client = ScriptedClient::new(price_by_dates).cancel_after(3, handle);
    let orchestrator = SearchOrchestrator::new(client).with_pacing(no_pacing());

    let run = orchestrator
        .run(trips, &Route::new("PUS", "NRT"), &signal)
        .await;

    assert!(run.interrupted);
    assert_eq!(run.counters.attempted, 3);
    assert_eq!(run.counters.succeeded, 3);
    assert_eq!(orchestrator.client().call_count(), 3);

    let consolidation = consolidate(&run.quotes, 3);
    assert_eq!(consolidation.ranked.len(), 3);
}

fn cancel_at(handle: CancelHandle, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        handle.cancel();
    });
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_lookup_abandons_the_call() {
    let window = SearchWindow::new(date("2025-07-01"), date("2025-07-10"));
    let trips = window.candidates(assert_ok!(StayRule::fixed(3)));

    // first call spans 0..10s, second starts at 11s and is cut off at 15s
    let (handle, signal) = cancel_pair();
    let client = ScriptedClient::new(price_by_dates).with_latency(Duration::from_secs(10));
    let orchestrator = SearchOrchestrator::new(client)
        .with_pacing(FixedPacing::new(Duration::from_secs(1)));
    cancel_at(handle, Duration::from_secs(15));

    let start = Instant::now();
    let run = orchestrator
        .run(trips, &Route::new("PUS", "NRT"), &signal)
        .await;

    assert!(run.interrupted);
    assert_eq!(run.counters.attempted, 2);
    assert_eq!(
        run.counters.succeeded + run.counters.no_result + run.counters.failed,
        run.counters.attempted - 1
    );
    assert_eq!(run.counters.succeeded, 1);
    assert_eq!(run.quotes.len(), 1);
    assert_eq!(run.quotes[0].departure_date, date("2025-07-01"));
    assert_eq!(orchestrator.client().call_count(), 2);
    assert!(start.elapsed() < Duration::from_secs(21));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_pacing_delay_starts_no_more_calls() {
    let window = SearchWindow::new(date("2025-07-01"), date("2025-07-10"));
    let trips = window.candidates(assert_ok!(StayRule::fixed(3)));

    let (handle, signal) = cancel_pair();
    let orchestrator = SearchOrchestrator::new(ScriptedClient::new(price_by_dates))
        .with_pacing(FixedPacing::new(Duration::from_secs(60)));
    cancel_at(handle, Duration::from_secs(5));

    let start = Instant::now();
    let run = orchestrator
        .run(trips, &Route::new("PUS", "NRT"), &signal)
        .await;

    assert!(run.interrupted);
    assert_eq!(run.counters.attempted, 1);
    assert_eq!(run.counters.succeeded, 1);
    assert_eq!(orchestrator.client().call_count(), 1);
    assert!(start.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_pacing_spaces_out_calls() {
    let window = SearchWindow::new(date("2025-07-01"), date("2025-07-04"));
    let trips = window.candidates(assert_ok!(StayRule::fixed(2)));

    let client = ScriptedClient::new(price_by_dates);
    let orchestrator = SearchOrchestrator::new(client)
        .with_pacing(FixedPacing::new(Duration::from_secs(1)));

    let start = Instant::now();
    let run = orchestrator
        .run(trips, &Route::new("PUS", "NRT"), &CancelSignal::never())
        .await;

    assert_eq!(run.counters.succeeded, 4);
    assert!(start.elapsed() >= Duration::from_secs(3));

    let started = orchestrator.client().started.lock().unwrap().clone();
    assert_eq!(started.len(), 4);
    for pair in started.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_lookup_times_out_as_failure() {
    let window = SearchWindow::new(date("2025-07-01"), date("2025-07-03"));
    let trips = window.candidates(assert_ok!(StayRule::fixed(4)));

    let client = ScriptedClient::new(price_by_dates).stall_on(date("2025-07-02"));
    let orchestrator = SearchOrchestrator::new(client)
        .with_pacing(no_pacing())
        .with_call_timeout(Duration::from_secs(5));

    let run = orchestrator
        .run(trips, &Route::new("PUS", "NRT"), &CancelSignal::never())
        .await;

    assert!(!run.interrupted);
    assert_eq!(run.counters.attempted, 3);
    assert_eq!(run.counters.failed, 1);
    assert_eq!(run.counters.succeeded, 2);
    assert!(run
        .quotes
        .iter()
        .all(|quote| quote.departure_date != date("2025-07-02")));
}

#[tokio::test]
async fn test_repeated_sweeps_keep_cheapest_quote_per_date_pair() {
    let window = SearchWindow::new(date("2025-07-01"), date("2025-07-02"));
    let rule = assert_ok!(StayRule::fixed(5));
    let route = Route::new("PUS", "NRT");

    let first = SearchOrchestrator::new(ScriptedClient::new(|_, _| {
        Ok(Some(priced(150_000, "7C1151")))
    }))
    .with_pacing(no_pacing());
    let second = SearchOrchestrator::new(ScriptedClient::new(|_, _| {
        Ok(Some(priced(140_000, "LJ201")))
    }))
    .with_pacing(no_pacing());

    let mut quotes: Vec<RawQuote> = first
        .run(window.candidates(rule), &route, &CancelSignal::never())
        .await
        .quotes;
    quotes.extend(
        second
            .run(window.candidates(rule), &route, &CancelSignal::never())
            .await
            .quotes,
    );
    assert_eq!(quotes.len(), 4);

    let consolidation = consolidate(&quotes, 3);
    assert_eq!(consolidation.ranked.len(), 2);
    for flight in &consolidation.ranked {
        assert_eq!(flight.price_numeric, 140_000);
        assert_eq!(flight.total_price, "₩140,000");
        assert_eq!(flight.flight_number, "LJ201");
    }
}

#[test]
fn test_invalid_inputs_are_rejected() {
    assert_err!(StayRule::range(7, 5));
    assert_err!(StayRule::fixed(0));
    assert_err!(SearchWindow::parse("2025-07-01", "2025-7-32"));

    let inverted = SearchWindow::new(date("2025-07-10"), date("2025-07-01"));
    assert_eq!(inverted.candidates(StayRule::Fixed { stay_days: 3 }).count(), 0);
}
