use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    core::{format_price, FlightInfo, QuoteClient},
    error::{Result, SweepError},
};

const DEFAULT_BASE_URL: &str = "https://flight-api.naver.com";
const SEARCH_PATH: &str = "/flight/international/searchFlights";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";
const REFERER: &str = "https://flight.naver.com/";
const MAX_ERROR_BODY: usize = 200;

/// Round-trip fare lookups against the international flight search API
#[derive(Clone, Debug)]
pub struct FlightSearchClient {
    http: reqwest::Client,
    base_url: String,
    adults: u32,
    timeout: Duration,
}

impl Default for FlightSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightSearchClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            adults: 1,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a client from `FARE_SWEEP_BASE_URL` and `FARE_SWEEP_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let mut client = Self::new();
        if let Ok(base_url) = std::env::var("FARE_SWEEP_BASE_URL") {
            client = client.with_base_url(base_url);
        }
        if let Ok(raw) = std::env::var("FARE_SWEEP_TIMEOUT_SECS") {
            let seconds: u64 = raw.trim().parse().map_err(|_| {
                SweepError::Config(format!("FARE_SWEEP_TIMEOUT_SECS must be whole seconds, got '{}'", raw))
            })?;
            client = client.with_timeout(Duration::from_secs(seconds));
        }
        Ok(client)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_adults(mut self, adults: u32) -> Self {
        self.adults = adults;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl QuoteClient for FlightSearchClient {
    async fn lookup(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
    ) -> Result<Option<FlightInfo>> {
        if return_date < departure_date {
            return Err(SweepError::InvalidRequest(format!(
                "return date {} is before departure date {}",
                return_date, departure_date
            )));
        }

        let payload =
            build_search_payload(origin, destination, departure_date, return_date, self.adults);

        let response = self
            .http
            .post(build_search_url(&self.base_url))
            .timeout(self.timeout)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(header::REFERER, REFERER)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(SweepError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parse_event_stream(&body)?;
        debug!(
            origin,
            destination,
            %departure_date,
            %return_date,
            itineraries = parsed.itineraries.len(),
            fare_mappings = parsed.fare_mappings.len(),
            "Flight search response received"
        );

        Ok(cheapest_flight(&parsed))
    }
}

fn build_search_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(SEARCH_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, SEARCH_PATH)
    }
}

/// Nonstop economy round trip, cheapest fares first
fn build_search_payload(
    origin: &str,
    destination: &str,
    departure_date: NaiveDate,
    return_date: NaiveDate,
    adults: u32,
) -> Value {
    json!({
        "adultCount": adults,
        "childCount": 0,
        "infantCount": 0,
        "device": "pc",
        "isNonstop": true,
        "seatClass": "Y",
        "tripType": "RT",
        "itineraries": [
            {
                "departureLocationCode": origin,
                "departureLocationType": "airport",
                "arrivalLocationCode": destination,
                "arrivalLocationType": "airport",
                "departureDate": departure_date.format("%Y%m%d").to_string(),
            },
            {
                "departureLocationCode": destination,
                "departureLocationType": "airport",
                "arrivalLocationCode": origin,
                "arrivalLocationType": "airport",
                "departureDate": return_date.format("%Y%m%d").to_string(),
            }
        ],
        "openReturnDays": 0,
        "flightFilter": {
            "filter": {
                "airlines": [],
                "departureAirports": [[origin], []],
                "arrivalAirports": [[], [origin]],
                "departureTime": [],
                "fareTypes": [],
                "flightDurationSeconds": [],
                "hasCardBenefit": true,
                "isIndividual": false,
                "isLowCarbonEmission": false,
                "isSameAirlines": false,
                "isSameDepArrAirport": true,
                "isTravelClub": false,
                "minFare": {},
                "viaCount": [],
                "selectedItineraries": []
            },
            "limit": 200,
            "skip": 0,
            "sort": { "adultMinFare": 1 }
        },
        "initialRequest": true
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchFlightsResponse {
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
    #[serde(default)]
    pub fare_mappings: Vec<FareMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Itinerary {
    #[serde(default)]
    pub itinerary_id: String,
    /// Seconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Segment {
    #[serde(default)]
    pub departure: SegmentPoint,
    #[serde(default)]
    pub arrival: SegmentPoint,
    #[serde(default)]
    pub marketing_carrier: Carrier,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SegmentPoint {
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Carrier {
    #[serde(default)]
    pub airline_code: String,
    #[serde(default)]
    pub flight_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FareMapping {
    /// Outbound and return itinerary ids joined by `-`
    #[serde(default)]
    pub itinerary_ids: String,
    #[serde(default)]
    pub fares: Vec<Fare>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Fare {
    #[serde(default)]
    pub adult: Option<AdultFare>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdultFare {
    #[serde(default)]
    pub total_fare: Option<f64>,
}

/// Extract the JSON body from the first `data: ` line of an event stream.
/// A plain JSON body is accepted as well.
fn parse_event_stream(text: &str) -> Result<SearchFlightsResponse> {
    let payload = match text.lines().find_map(|line| line.strip_prefix("data: ")) {
        Some(data) => data,
        None if text.trim_start().starts_with('{') => text,
        None => {
            return Err(SweepError::InvalidResponse(
                "no data line in event stream".to_string(),
            ))
        }
    };

    serde_json::from_str(payload)
        .map_err(|err| SweepError::InvalidResponse(format!("malformed search payload: {}", err)))
}

struct LegSummary {
    flight: String,
    departure: String,
    arrival: String,
    duration: String,
}

fn summarize_leg(response: &SearchFlightsResponse, itinerary_id: Option<&str>) -> Option<LegSummary> {
    let itinerary = response
        .itineraries
        .iter()
        .find(|it| {
            !it.itinerary_id.is_empty() && Some(it.itinerary_id.as_str()) == itinerary_id
        })?;
    let segment = itinerary.segments.first()?;

    Some(LegSummary {
        flight: format!(
            "{}{}",
            segment.marketing_carrier.airline_code, segment.marketing_carrier.flight_number
        ),
        departure: format_time(&segment.departure.time),
        arrival: format_time(&segment.arrival.time),
        duration: format_duration(itinerary.duration),
    })
}

/// Map the cheapest fare of a response into a flight record
fn cheapest_flight(response: &SearchFlightsResponse) -> Option<FlightInfo> {
    let (itinerary_ids, total_fare) = response
        .fare_mappings
        .iter()
        .flat_map(|mapping| {
            // fares without an adult total are unusable
            mapping.fares.iter().filter_map(move |fare| {
                let total_fare = fare.adult.as_ref()?.total_fare?;
                Some((mapping.itinerary_ids.as_str(), total_fare))
            })
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    let mut ids = itinerary_ids.split('-');
    let outbound = summarize_leg(response, ids.next());
    let inbound = summarize_leg(response, ids.next());

    Some(FlightInfo {
        outbound_flight: outbound.as_ref().map(|leg| leg.flight.clone()),
        return_flight: inbound.as_ref().map(|leg| leg.flight.clone()),
        total_price: Some(format_price(total_fare.max(0.0).round() as u64)),
        outbound_departure: outbound.as_ref().map(|leg| leg.departure.clone()),
        outbound_arrival: outbound.as_ref().map(|leg| leg.arrival.clone()),
        outbound_duration: outbound.map(|leg| leg.duration),
        return_departure: inbound.as_ref().map(|leg| leg.departure.clone()),
        return_arrival: inbound.as_ref().map(|leg| leg.arrival.clone()),
        return_duration: inbound.map(|leg| leg.duration),
    })
}

/// `0720` becomes `07:20`; anything else is returned unchanged
fn format_time(raw: &str) -> String {
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}:{}", &raw[..2], &raw[2..])
    } else {
        raw.to_string()
    }
}

fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, m) => format!("{}h {}m", h, m),
    }
}
