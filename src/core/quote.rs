use crate::core::window::CandidateTrip;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Origin and destination codes of a round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
}

impl Route {
    pub fn new(origin: impl AsRef<str>, destination: impl AsRef<str>) -> Self {
        Self {
            origin: origin.as_ref().trim().to_uppercase(),
            destination: destination.as_ref().trim().to_uppercase(),
        }
    }

    /// Display name such as `PUS ↔ NRT`
    pub fn label(&self) -> String {
        format!("{} ↔ {}", self.origin, self.destination)
    }
}

/// Flight details returned for one priced round trip.
///
/// Every field is optional; consolidation supplies the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_flight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_flight: Option<String>,
    /// Display price such as `₩120,000`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_departure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_arrival: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_departure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_arrival: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_duration: Option<String>,
}

/// A quote collected for a candidate trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuote {
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub stay_days: u32,
    pub flight_info: FlightInfo,
}

impl RawQuote {
    pub fn new(trip: &CandidateTrip, flight_info: FlightInfo) -> Self {
        Self {
            departure_date: trip.departure_date,
            return_date: trip.return_date,
            stay_days: trip.stay_days,
            flight_info,
        }
    }
}

/// External source of round-trip flight quotes.
///
/// `Ok(None)` means the source had nothing for the dates; errors cover
/// transport and upstream failures.
#[async_trait]
pub trait QuoteClient: Send + Sync {
    async fn lookup(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
    ) -> Result<Option<FlightInfo>>;
}

#[async_trait]
impl<C: QuoteClient + ?Sized> QuoteClient for Box<C> {
    async fn lookup(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
    ) -> Result<Option<FlightInfo>> {
        (**self)
            .lookup(origin, destination, departure_date, return_date)
            .await
    }
}
