use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::{
    core::{ConsolidatedFlight, Consolidation, PriceStats, Route, SearchRun},
    error::{Result, SweepError},
    types::{render_summary, SearchDocument, SearchParameters, SearchSummary},
};

const ALL_RESULTS_LIMIT: usize = 10;

/// Header of the consolidated results file
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidatedSummary {
    pub route: String,
    pub origin: String,
    pub destination: String,
    pub total_unique_results: usize,
    pub dropped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub processed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_stats: Option<PriceStats>,
}

#[derive(Debug, Serialize)]
struct ConsolidatedFile<'a> {
    search_summary: ConsolidatedSummary,
    top_results: &'a [ConsolidatedFlight],
    weekend_one_day_top: &'a [ConsolidatedFlight],
    weekend_all_top: &'a [ConsolidatedFlight],
    all_results: &'a [ConsolidatedFlight],
}

async fn write_file(dir: &Path, file_name: String, contents: String) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}

/// Write the raw quotes of a run.
///
/// Returns `None` without touching the filesystem when the run found nothing.
pub async fn save_search_document(
    dir: &Path,
    params: &SearchParameters,
    run: &SearchRun,
) -> Result<Option<PathBuf>> {
    if run.quotes.is_empty() {
        info!("No flight results to save");
        return Ok(None);
    }

    let now = Local::now();
    let document = SearchDocument {
        search_parameters: Some(params.clone()),
        flight_results: run.quotes.clone(),
        search_summary: Some(SearchSummary::from_run(
            run,
            now.format("%Y-%m-%d %H:%M:%S").to_string(),
        )),
    };

    let file_name = format!(
        "{}_{}_flights_{}.json",
        params.origin,
        params.destination,
        now.format("%Y%m%d_%H%M%S")
    );
    let path = write_file(dir, file_name, serde_json::to_string_pretty(&document)?).await?;

    info!(
        path = %path.display(),
        results = document.flight_results.len(),
        "Search results saved"
    );
    Ok(Some(path))
}

/// Read a saved search document, reporting the JSON path of any bad field
pub async fn load_search_document(path: &Path) -> Result<SearchDocument> {
    let raw = tokio::fs::read_to_string(path).await?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);

    serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let field = err.path().to_string();
        let location = if field.is_empty() || field == "." {
            "<root>".to_string()
        } else {
            field
        };
        SweepError::Document {
            path: path.display().to_string(),
            message: format!("at {}: {}", location, err.inner()),
        }
    })
}

pub async fn save_consolidated(
    dir: &Path,
    route: &Route,
    consolidation: &Consolidation,
    source_file: Option<&Path>,
    top: usize,
) -> Result<PathBuf> {
    let ranked = &consolidation.ranked;
    let file = ConsolidatedFile {
        search_summary: ConsolidatedSummary {
            route: route.label(),
            origin: route.origin.clone(),
            destination: route.destination.clone(),
            total_unique_results: ranked.len(),
            dropped: consolidation.dropped,
            source_file: source_file.map(|path| path.display().to_string()),
            processed_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            price_stats: consolidation.price_stats(),
        },
        top_results: consolidation.top(top),
        weekend_one_day_top: &consolidation.one_weekend_day,
        weekend_all_top: &consolidation.full_weekend,
        all_results: &ranked[..ranked.len().min(ALL_RESULTS_LIMIT)],
    };

    let file_name = format!("{}_{}_flight_results.json", route.origin, route.destination);
    let path = write_file(dir, file_name, serde_json::to_string_pretty(&file)?).await?;
    info!(path = %path.display(), "Consolidated results saved");
    Ok(path)
}

pub async fn save_summary_markdown(
    dir: &Path,
    route: &Route,
    consolidation: &Consolidation,
    top: usize,
) -> Result<PathBuf> {
    let file_name = format!(
        "{}_{}_final_results_summary.md",
        route.origin, route.destination
    );
    let mut report = render_summary(route, consolidation, top);
    report.push('\n');

    let path = write_file(dir, file_name, report).await?;
    info!(path = %path.display(), "Summary report saved");
    Ok(path)
}
