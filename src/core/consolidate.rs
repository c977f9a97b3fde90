use crate::{
    core::quote::RawQuote,
    error::{Result, SweepError},
};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, info, warn};

const MISSING: &str = "N/A";
/// Currency symbols, thousands separators and unit suffixes stripped from display prices
const PRICE_MARKS: &[char] = &['₩', '$', '€', '£', '¥', ',', '원'];

/// Parse a display price such as `₩120,000` into its integer amount.
///
/// Blank and zero prices mean "no fare" and yield `Ok(None)`; anything else
/// that is not a whole number is a [`SweepError::PriceParse`].
pub fn parse_price(raw: &str) -> Result<Option<u64>> {
    let digits: String = raw
        .chars()
        .filter(|c| !PRICE_MARKS.contains(c) && !c.is_whitespace())
        .collect();

    if digits.is_empty() {
        return Ok(None);
    }

    match digits.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(amount) => Ok(Some(amount)),
        Err(_) => Err(SweepError::PriceParse(raw.to_string())),
    }
}

/// Format an amount as `₩` plus comma-grouped digits
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("₩{}", grouped)
}

/// Saturdays and Sundays between the two dates, both inclusive
pub fn weekend_count(departure_date: NaiveDate, return_date: NaiveDate) -> u32 {
    departure_date
        .iter_days()
        .take_while(|date| *date <= return_date)
        .filter(|date| matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as u32
}

/// Weekend coverage class of a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekendCoverage {
    NoWeekend,
    OneDay,
    FullWeekend,
}

impl WeekendCoverage {
    pub fn from_count(count: u32) -> Self {
        match count {
            0 => WeekendCoverage::NoWeekend,
            1 => WeekendCoverage::OneDay,
            _ => WeekendCoverage::FullWeekend,
        }
    }
}

/// Normalized flight record, one per departure/return pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedFlight {
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub stay_days: u32,
    pub flight_number: String,
    pub total_price: String,
    pub price_numeric: u64,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub return_departure_time: String,
    pub return_arrival_time: String,
    pub return_duration: String,
}

impl ConsolidatedFlight {
    /// Build from a quote whose price has already been validated
    pub fn from_quote(quote: &RawQuote, price_numeric: u64) -> Self {
        let info = &quote.flight_info;
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(MISSING)
                .to_string()
        };

        Self {
            departure_date: quote.departure_date,
            return_date: quote.return_date,
            stay_days: quote.stay_days,
            flight_number: field(&info.outbound_flight),
            total_price: field(&info.total_price),
            price_numeric,
            departure_time: field(&info.outbound_departure),
            arrival_time: field(&info.outbound_arrival),
            duration: field(&info.outbound_duration),
            return_departure_time: field(&info.return_departure),
            return_arrival_time: field(&info.return_arrival),
            return_duration: field(&info.return_duration),
        }
    }

    pub fn key(&self) -> (NaiveDate, NaiveDate) {
        (self.departure_date, self.return_date)
    }

    pub fn weekend_days(&self) -> u32 {
        weekend_count(self.departure_date, self.return_date)
    }

    pub fn weekend_coverage(&self) -> WeekendCoverage {
        WeekendCoverage::from_count(self.weekend_days())
    }
}

/// Minimum, maximum and rounded mean of the consolidated prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStats {
    pub min: u64,
    pub max: u64,
    pub average: u64,
}

/// Per flight number tallies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightNumberStats {
    pub flight_number: String,
    pub count: usize,
    pub min_price: u64,
}

/// Ranked, deduplicated flights plus the weekend views
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Consolidation {
    /// Every unique date pair, cheapest first
    pub ranked: Vec<ConsolidatedFlight>,
    /// Cheapest flights covering exactly one weekend day
    pub one_weekend_day: Vec<ConsolidatedFlight>,
    /// Cheapest flights covering two or more weekend days
    pub full_weekend: Vec<ConsolidatedFlight>,
    /// Quotes rejected for a missing, zero or unparsable price
    pub dropped: usize,
}

impl Consolidation {
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn cheapest(&self) -> Option<&ConsolidatedFlight> {
        self.ranked.first()
    }

    /// First `n` ranked flights
    pub fn top(&self, n: usize) -> &[ConsolidatedFlight] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    pub fn price_stats(&self) -> Option<PriceStats> {
        let min = self.ranked.iter().map(|f| f.price_numeric).min()?;
        let max = self.ranked.iter().map(|f| f.price_numeric).max()?;
        let total: u128 = self.ranked.iter().map(|f| u128::from(f.price_numeric)).sum();
        let average = (total as f64 / self.ranked.len() as f64).round() as u64;
        Some(PriceStats { min, max, average })
    }

    /// Count and lowest price per flight number, cheapest first
    pub fn flight_number_stats(&self) -> Vec<FlightNumberStats> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut stats: Vec<FlightNumberStats> = Vec::new();

        for flight in &self.ranked {
            match positions.entry(flight.flight_number.as_str()) {
                Entry::Occupied(entry) => {
                    let stat = &mut stats[*entry.get()];
                    stat.count += 1;
                    stat.min_price = stat.min_price.min(flight.price_numeric);
                }
                Entry::Vacant(entry) => {
                    entry.insert(stats.len());
                    stats.push(FlightNumberStats {
                        flight_number: flight.flight_number.clone(),
                        count: 1,
                        min_price: flight.price_numeric,
                    });
                }
            }
        }

        stats.sort_by_key(|stat| stat.min_price);
        stats
    }
}

/// Validate, deduplicate, rank and classify quotes.
///
/// Each weekend view keeps at most `limit` flights.
pub fn consolidate(quotes: &[RawQuote], limit: usize) -> Consolidation {
    let mut dropped = 0;
    let mut positions: HashMap<(NaiveDate, NaiveDate), usize> = HashMap::new();
    let mut unique: Vec<ConsolidatedFlight> = Vec::new();

    for quote in quotes {
        let raw_price = quote.flight_info.total_price.as_deref().unwrap_or_default();
        let price_numeric = match parse_price(raw_price) {
            Ok(Some(amount)) => amount,
            Ok(None) => {
                debug!(
                    departure = %quote.departure_date,
                    return_date = %quote.return_date,
                    "Skipping quote without a price"
                );
                dropped += 1;
                continue;
            }
            Err(err) => {
                warn!(
                    departure = %quote.departure_date,
                    return_date = %quote.return_date,
                    error = %err,
                    "Dropping quote with unparsable price"
                );
                dropped += 1;
                continue;
            }
        };

        let flight = ConsolidatedFlight::from_quote(quote, price_numeric);
        match positions.entry(flight.key()) {
            Entry::Occupied(entry) => {
                let existing = &mut unique[*entry.get()];
                // ties keep the first quote seen
                if flight.price_numeric < existing.price_numeric {
                    *existing = flight;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(unique.len());
                unique.push(flight);
            }
        }
    }

    unique.sort_by_key(|flight| flight.price_numeric);

    let view = |coverage: WeekendCoverage| -> Vec<ConsolidatedFlight> {
        unique
            .iter()
            .filter(|flight| flight.weekend_coverage() == coverage)
            .take(limit)
            .cloned()
            .collect()
    };
    let one_weekend_day = view(WeekendCoverage::OneDay);
    let full_weekend = view(WeekendCoverage::FullWeekend);

    info!(
        quotes = quotes.len(),
        unique = unique.len(),
        dropped,
        "Consolidated quotes"
    );

    Consolidation {
        ranked: unique,
        one_weekend_day,
        full_weekend,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::FlightInfo;
    use crate::core::window::parse_date;

    fn quote(departure: &str, return_date: &str, price: &str, flight: &str) -> RawQuote {
        let departure_date = parse_date(departure).unwrap();
        let return_date = parse_date(return_date).unwrap();
        RawQuote {
            departure_date,
            return_date,
            stay_days: ((return_date - departure_date).num_days() + 1) as u32,
            flight_info: FlightInfo {
                outbound_flight: Some(flight.to_string()),
                total_price: Some(price.to_string()),
                ..FlightInfo::default()
            },
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("₩120,000").unwrap(), Some(120_000));
        assert_eq!(parse_price("120,000원").unwrap(), Some(120_000));
        assert_eq!(parse_price(" $1,234 ").unwrap(), Some(1234));
        assert_eq!(parse_price("0").unwrap(), None);
        assert_eq!(parse_price("₩0").unwrap(), None);
        assert_eq!(parse_price("").unwrap(), None);
        assert!(matches!(
            parse_price("call for price"),
            Err(SweepError::PriceParse(_))
        ));
        assert!(parse_price("-5").is_err());
    }

    #[test]
    fn test_format_price_round_trips() {
        assert_eq!(format_price(0), "₩0");
        assert_eq!(format_price(999), "₩999");
        assert_eq!(format_price(120_000), "₩120,000");
        assert_eq!(format_price(1_234_567), "₩1,234,567");
        assert_eq!(parse_price(&format_price(1_234_567)).unwrap(), Some(1_234_567));
    }

    #[test]
    fn test_weekend_count() {
        // 2025-07-04 is a Friday
        let friday = parse_date("2025-07-04").unwrap();
        assert_eq!(weekend_count(friday, friday), 0);
        assert_eq!(weekend_count(friday, parse_date("2025-07-05").unwrap()), 1);
        assert_eq!(weekend_count(friday, parse_date("2025-07-07").unwrap()), 2);
        assert_eq!(weekend_count(friday, parse_date("2025-07-13").unwrap()), 4);
        assert_eq!(weekend_count(friday, parse_date("2025-07-01").unwrap()), 0);
    }

    #[test]
    fn test_duplicate_date_pair_keeps_cheapest() {
        let quotes = vec![
            quote("2025-07-01", "2025-07-05", "₩150,000", "7C1151"),
            quote("2025-07-01", "2025-07-05", "₩140,000", "LJ201"),
        ];
        let result = consolidate(&quotes, 3);

        assert_eq!(result.ranked.len(), 1);
        assert_eq!(result.ranked[0].price_numeric, 140_000);
        assert_eq!(result.ranked[0].flight_number, "LJ201");
    }

    #[test]
    fn test_price_tie_keeps_first_seen() {
        let quotes = vec![
            quote("2025-07-01", "2025-07-05", "₩140,000", "FIRST"),
            quote("2025-07-01", "2025-07-05", "140,000원", "SECOND"),
        ];
        let result = consolidate(&quotes, 3);
        assert_eq!(result.ranked.len(), 1);
        assert_eq!(result.ranked[0].flight_number, "FIRST");
    }

    #[test]
    fn test_ranking_is_non_decreasing_and_stable() {
        let quotes = vec![
            quote("2025-07-01", "2025-07-05", "₩180,000", "A"),
            quote("2025-07-02", "2025-07-06", "₩120,000", "B"),
            quote("2025-07-03", "2025-07-07", "₩150,000", "C"),
            quote("2025-07-04", "2025-07-08", "₩120,000", "D"),
        ];
        let result = consolidate(&quotes, 5);

        let prices: Vec<_> = result.ranked.iter().map(|f| f.price_numeric).collect();
        assert!(prices.windows(2).all(|pair| pair[0] <= pair[1]));
        let order: Vec<_> = result.ranked.iter().map(|f| f.flight_number.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "C", "A"]);
    }

    #[test]
    fn test_invalid_prices_are_dropped() {
        let mut missing = quote("2025-07-02", "2025-07-06", "", "X");
        missing.flight_info.total_price = None;
        let quotes = vec![
            quote("2025-07-01", "2025-07-05", "0", "A"),
            quote("2025-07-01", "2025-07-06", "", "B"),
            quote("2025-07-01", "2025-07-07", "sold out", "C"),
            missing,
            quote("2025-07-03", "2025-07-07", "₩99,000", "D"),
        ];
        let result = consolidate(&quotes, 3);

        assert_eq!(result.dropped, 4);
        assert_eq!(result.ranked.len(), 1);
        assert_eq!(result.ranked[0].flight_number, "D");
    }

    #[test]
    fn test_missing_fields_default() {
        let result = consolidate(&[quote("2025-07-01", "2025-07-05", "₩99,000", "")], 3);
        let flight = &result.ranked[0];
        assert_eq!(flight.flight_number, "N/A");
        assert_eq!(flight.departure_time, "N/A");
        assert_eq!(flight.return_duration, "N/A");
        assert_eq!(flight.total_price, "₩99,000");
    }

    #[test]
    fn test_weekend_partitions() {
        let quotes = vec![
            // Mon-Thu: no weekend
            quote("2025-07-07", "2025-07-10", "₩90,000", "NONE"),
            // Wed-Sat: one day
            quote("2025-07-02", "2025-07-05", "₩110,000", "ONE-A"),
            // Fri-Mon: full weekend
            quote("2025-07-04", "2025-07-07", "₩130,000", "FULL-A"),
            // Sun-Wed: one day
            quote("2025-07-06", "2025-07-09", "₩100,000", "ONE-B"),
            // Thu-Tue: full weekend
            quote("2025-07-03", "2025-07-08", "₩120,000", "FULL-B"),
            // Sat-Tue: full weekend
            quote("2025-07-05", "2025-07-08", "₩125,000", "FULL-C"),
        ];
        let result = consolidate(&quotes, 2);

        let names = |flights: &[ConsolidatedFlight]| -> Vec<String> {
            flights.iter().map(|f| f.flight_number.clone()).collect()
        };
        assert_eq!(names(&result.one_weekend_day), vec!["ONE-B", "ONE-A"]);
        assert_eq!(names(&result.full_weekend), vec!["FULL-B", "FULL-C"]);

        for flight in result.one_weekend_day.iter() {
            assert!(!result.full_weekend.contains(flight));
            assert_eq!(flight.weekend_days(), 1);
        }
        assert!(result
            .one_weekend_day
            .iter()
            .chain(result.full_weekend.iter())
            .all(|f| f.flight_number != "NONE"));
    }

    #[test]
    fn test_every_weekend_flight_lands_in_one_view() {
        let quotes = vec![
            quote("2025-07-02", "2025-07-05", "₩110,000", "ONE"),
            quote("2025-07-04", "2025-07-07", "₩130,000", "FULL"),
            quote("2025-07-07", "2025-07-10", "₩90,000", "NONE"),
        ];
        let result = consolidate(&quotes, usize::MAX);

        let weekend_flights = result
            .ranked
            .iter()
            .filter(|f| f.weekend_days() >= 1)
            .count();
        assert_eq!(
            result.one_weekend_day.len() + result.full_weekend.len(),
            weekend_flights
        );
    }

    #[test]
    fn test_stats() {
        let quotes = vec![
            quote("2025-07-01", "2025-07-05", "₩100,000", "7C1151"),
            quote("2025-07-02", "2025-07-06", "₩150,000", "LJ201"),
            quote("2025-07-03", "2025-07-07", "₩125,001", "7C1151"),
        ];
        let result = consolidate(&quotes, 3);

        let stats = result.price_stats().unwrap();
        assert_eq!(stats.min, 100_000);
        assert_eq!(stats.max, 150_000);
        assert_eq!(stats.average, 125_000);

        let per_flight = result.flight_number_stats();
        assert_eq!(per_flight.len(), 2);
        assert_eq!(per_flight[0].flight_number, "7C1151");
        assert_eq!(per_flight[0].count, 2);
        assert_eq!(per_flight[0].min_price, 100_000);
        assert_eq!(per_flight[1].flight_number, "LJ201");
    }

    #[test]
    fn test_empty_input() {
        let result = consolidate(&[], 3);
        assert!(result.is_empty());
        assert!(result.price_stats().is_none());
        assert!(result.cheapest().is_none());
        assert!(result.top(5).is_empty());
    }
}
