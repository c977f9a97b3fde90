use crate::core::{format_price, ConsolidatedFlight, Consolidation, Route};

const DATE_FORMAT: &str = "%Y-%m-%d (%a)";

/// Display name for the airports the sweep is usually run against
pub fn airport_name(code: &str) -> Option<&'static str> {
    match code.to_ascii_uppercase().as_str() {
        "PUS" => Some("Busan Gimhae"),
        "NRT" => Some("Tokyo Narita"),
        "HND" => Some("Tokyo Haneda"),
        "TYO" => Some("Tokyo (all airports)"),
        "KIX" => Some("Osaka Kansai"),
        "ICN" => Some("Seoul Incheon"),
        "GMP" => Some("Seoul Gimpo"),
        _ => None,
    }
}

fn airport_label(code: &str) -> String {
    match airport_name(code) {
        Some(name) => format!("{} ({})", name, code),
        None => code.to_string(),
    }
}

/// Markdown table of flights, ranked from 1
pub fn render_table(flights: &[ConsolidatedFlight]) -> String {
    let mut lines = vec![
        "| Rank | Departure | Return | Stay | Flight | Total Price | Departs | Arrives | Duration |"
            .to_string(),
        "|------|-----------|--------|------|--------|-------------|---------|---------|----------|"
            .to_string(),
    ];

    for (idx, flight) in flights.iter().enumerate() {
        lines.push(format!(
            "| {} | {} | {} | {}d | {} | {} | {} | {} | {} |",
            idx + 1,
            flight.departure_date.format(DATE_FORMAT),
            flight.return_date.format(DATE_FORMAT),
            flight.stay_days,
            flight.flight_number,
            flight.total_price,
            flight.departure_time,
            flight.arrival_time,
            flight.duration
        ));
    }

    lines.join("\n")
}

/// Full markdown report of a consolidation
pub fn render_summary(route: &Route, consolidation: &Consolidation, top: usize) -> String {
    let mut lines = Vec::new();

    lines.push(format!("# Round-trip fares: {}", route.label()));
    lines.push(String::new());
    lines.push(format!(
        "- Route: {} → {}",
        airport_label(&route.origin),
        airport_label(&route.destination)
    ));

    if consolidation.is_empty() {
        lines.push(String::new());
        lines.push("No priced flights were found for this search.".to_string());
        return lines.join("\n");
    }

    lines.push(format!("- Unique date pairs: {}", consolidation.ranked.len()));
    if consolidation.dropped > 0 {
        lines.push(format!("- Quotes without a usable price: {}", consolidation.dropped));
    }

    lines.push(String::new());
    lines.push(format!("## Top {} cheapest", top));
    lines.push(String::new());
    lines.push(render_table(consolidation.top(top)));

    if !consolidation.one_weekend_day.is_empty() {
        lines.push(String::new());
        lines.push("## Covering one weekend day".to_string());
        lines.push(String::new());
        lines.push(render_table(&consolidation.one_weekend_day));
    }

    if !consolidation.full_weekend.is_empty() {
        lines.push(String::new());
        lines.push("## Covering the whole weekend".to_string());
        lines.push(String::new());
        lines.push(render_table(&consolidation.full_weekend));
    }

    if let Some(stats) = consolidation.price_stats() {
        lines.push(String::new());
        lines.push("## Price statistics".to_string());
        lines.push(String::new());
        lines.push(format!("- Lowest: {}", format_price(stats.min)));
        lines.push(format!("- Highest: {}", format_price(stats.max)));
        lines.push(format!("- Average: {}", format_price(stats.average)));
        lines.push(format!(
            "- Spread: {}",
            format_price(stats.max - stats.min)
        ));
    }

    let by_flight = consolidation.flight_number_stats();
    if !by_flight.is_empty() {
        lines.push(String::new());
        lines.push("## By flight number".to_string());
        lines.push(String::new());
        for stat in &by_flight {
            lines.push(format!(
                "- {}: {} date pairs, from {}",
                stat.flight_number,
                stat.count,
                format_price(stat.min_price)
            ));
        }
    }

    if let Some(best) = consolidation.cheapest() {
        lines.push(String::new());
        lines.push("## Cheapest option".to_string());
        lines.push(String::new());
        lines.push(format!(
            "{} departing {} and returning {} ({} days) for {}.",
            best.flight_number,
            best.departure_date.format(DATE_FORMAT),
            best.return_date.format(DATE_FORMAT),
            best.stay_days,
            best.total_price
        ));
    }

    lines.join("\n")
}
