use crate::{
    core::{
        cancel_pair, consolidate, parse_date, CancelSignal, FixedPacing, Route, SearchOrchestrator,
        SearchWindow, StayRule,
    },
    services::{
        load_search_document, save_consolidated, save_search_document, save_summary_markdown,
        FlightSearchClient,
    },
    types::{render_summary, SearchParameters},
};
use anyhow::Context;
use chrono::{Duration as DateDuration, Local, NaiveDate};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::{path::PathBuf, time::Duration};
use tracing::{info, warn};

const UNKNOWN_AIRPORT: &str = "UNKNOWN";
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What a Ctrl-C does at this point of a search command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop the sweep and keep the partial results
    CancelSearch,
    /// The sweep is already over, so stop the process
    Exit,
}

fn on_interrupt(search: &CancelSignal) -> Interrupt {
    if search.is_cancelled() {
        Interrupt::Exit
    } else {
        Interrupt::CancelSearch
    }
}

fn cli() -> Command {
    let top = Arg::new("top")
        .long("top")
        .value_name("COUNT")
        .help("Number of cheapest flights to show")
        .value_parser(value_parser!(usize))
        .default_value("5");
    let weekend_top = Arg::new("weekend-top")
        .long("weekend-top")
        .value_name("COUNT")
        .help("Number of flights kept in each weekend view")
        .value_parser(value_parser!(usize))
        .default_value("3");
    let output_dir = Arg::new("output-dir")
        .long("output-dir")
        .value_name("DIR")
        .help("Directory for saved files")
        .value_parser(value_parser!(PathBuf))
        .default_value(".");

    Command::new("fare-sweep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find the cheapest round-trip fares across a flexible travel window")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("search")
                .about("Price every candidate trip in the window")
                .after_help(
                    "Ctrl-C during the sweep stops it and keeps the partial results. \
                     A second Ctrl-C, or one after the sweep, exits immediately.",
                )
                .arg(
                    Arg::new("origin")
                        .short('o')
                        .long("origin")
                        .value_name("CODE")
                        .help("Departure airport code")
                        .default_value("PUS"),
                )
                .arg(
                    Arg::new("destination")
                        .short('d')
                        .long("destination")
                        .value_name("CODE")
                        .help("Arrival airport code")
                        .default_value("NRT"),
                )
                .arg(
                    Arg::new("start-date")
                        .short('s')
                        .long("start-date")
                        .value_name("YYYY-MM-DD")
                        .help("First departure date (default: a week from today)"),
                )
                .arg(
                    Arg::new("end-date")
                        .short('e')
                        .long("end-date")
                        .value_name("YYYY-MM-DD")
                        .help("Last travel date (default: two weeks from today)"),
                )
                .arg(
                    Arg::new("min-stay")
                        .long("min-stay")
                        .value_name("DAYS")
                        .help("Shortest stay, counting both travel days")
                        .value_parser(value_parser!(u32))
                        .default_value("5"),
                )
                .arg(
                    Arg::new("max-stay")
                        .long("max-stay")
                        .value_name("DAYS")
                        .help("Longest stay, counting both travel days")
                        .value_parser(value_parser!(u32))
                        .default_value("7"),
                )
                .arg(
                    Arg::new("stay-days")
                        .long("stay-days")
                        .value_name("DAYS")
                        .help("Exact stay length; one trip per departure date")
                        .value_parser(value_parser!(u32))
                        .conflicts_with_all(["min-stay", "max-stay"]),
                )
                .arg(
                    Arg::new("adults")
                        .long("adults")
                        .value_name("COUNT")
                        .value_parser(value_parser!(u32))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("delay")
                        .long("delay")
                        .value_name("SECONDS")
                        .help("Pause before each lookup")
                        .value_parser(value_parser!(f64))
                        .default_value("1.0"),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .value_name("SECONDS")
                        .help("Per-lookup timeout (or set FARE_SWEEP_TIMEOUT_SECS)")
                        .value_parser(value_parser!(u64)),
                )
                .arg(top.clone())
                .arg(weekend_top.clone())
                .arg(
                    Arg::new("save")
                        .long("save")
                        .help("Save raw and consolidated results")
                        .action(ArgAction::SetTrue),
                )
                .arg(output_dir.clone())
                .arg(
                    Arg::new("base-url")
                        .short('u')
                        .long("base-url")
                        .value_name("URL")
                        .help("Flight search base URL (or set FARE_SWEEP_BASE_URL)"),
                ),
        )
        .subcommand(
            Command::new("process")
                .about("Consolidate a saved search document")
                .arg(
                    Arg::new("file")
                        .help("Search document written by `search --save`")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .index(1),
                )
                .arg(
                    Arg::new("origin")
                        .long("origin")
                        .value_name("CODE")
                        .help("Override the origin recorded in the document"),
                )
                .arg(
                    Arg::new("destination")
                        .long("destination")
                        .value_name("CODE")
                        .help("Override the destination recorded in the document"),
                )
                .arg(top)
                .arg(weekend_top)
                .arg(output_dir),
        )
}

fn value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, name: &str) -> anyhow::Result<T> {
    matches
        .get_one::<T>(name)
        .cloned()
        .with_context(|| format!("missing value for --{}", name))
}

fn date_or(matches: &ArgMatches, name: &str, fallback: NaiveDate) -> anyhow::Result<NaiveDate> {
    match matches.get_one::<String>(name) {
        Some(raw) => Ok(parse_date(raw)?),
        None => Ok(fallback),
    }
}

async fn run_search(matches: &ArgMatches) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let route = Route::new(
        value::<String>(matches, "origin")?,
        value::<String>(matches, "destination")?,
    );
    let start_date = date_or(matches, "start-date", today + DateDuration::days(7))?;
    let end_date = date_or(matches, "end-date", today + DateDuration::days(14))?;

    let stay = match matches.get_one::<u32>("stay-days") {
        Some(days) => StayRule::fixed(*days)?,
        None => StayRule::range(value(matches, "min-stay")?, value(matches, "max-stay")?)?,
    };

    let params = SearchParameters::new(route.clone(), SearchWindow::new(start_date, end_date), stay)
        .with_adults(value(matches, "adults")?);
    params.validate()?;

    let mut client = FlightSearchClient::from_env()?.with_adults(params.adults);
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        client = client.with_base_url(base_url.clone());
    }
    if let Some(seconds) = matches.get_one::<u64>("timeout") {
        client = client.with_timeout(Duration::from_secs(*seconds));
    }
    let call_timeout = client.timeout();

    let orchestrator = SearchOrchestrator::new(client)
        .with_pacing(FixedPacing::from_secs_f64(value(matches, "delay")?)?)
        .with_call_timeout(call_timeout);

    let candidates = params.candidates();
    info!(
        route = %route.label(),
        start = %params.start_date,
        end = %params.end_date,
        stay = %params.stay.describe(),
        candidates = candidates.clone().count(),
        "Starting fare sweep"
    );

    let (handle, signal) = cancel_pair();
    let watcher = signal.clone();
    let interrupt_handle = handle.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&watcher) {
                Interrupt::CancelSearch => {
                    warn!("Interrupt received, stopping the search");
                    interrupt_handle.cancel();
                }
                Interrupt::Exit => {
                    warn!("Interrupt received, exiting");
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        }
    });

    let run = orchestrator.run(candidates, &route, &signal).await;
    // from here on an interrupt ends the process
    handle.cancel();
    info!("Sweep finished: {}", run.summary());

    let top: usize = value(matches, "top")?;
    let consolidation = consolidate(&run.quotes, value(matches, "weekend-top")?);
    println!("\n{}", render_summary(&route, &consolidation, top));

    if matches.get_flag("save") {
        let dir: PathBuf = value(matches, "output-dir")?;
        let source = save_search_document(&dir, &params, &run).await?;
        if source.is_some() {
            save_consolidated(&dir, &route, &consolidation, source.as_deref(), top).await?;
            save_summary_markdown(&dir, &route, &consolidation, top).await?;
        }
    }

    Ok(())
}

async fn run_process(matches: &ArgMatches) -> anyhow::Result<()> {
    let file: PathBuf = value(matches, "file")?;
    let document = load_search_document(&file)
        .await
        .with_context(|| format!("failed to load {}", file.display()))?;

    let recorded = document.route();
    let origin = matches
        .get_one::<String>("origin")
        .cloned()
        .or_else(|| recorded.as_ref().map(|route| route.origin.clone()))
        .unwrap_or_else(|| UNKNOWN_AIRPORT.to_string());
    let destination = matches
        .get_one::<String>("destination")
        .cloned()
        .or_else(|| recorded.as_ref().map(|route| route.destination.clone()))
        .unwrap_or_else(|| UNKNOWN_AIRPORT.to_string());
    let route = Route::new(origin, destination);

    info!(
        file = %file.display(),
        quotes = document.flight_results.len(),
        route = %route.label(),
        "Processing saved search"
    );

    let top: usize = value(matches, "top")?;
    let consolidation = consolidate(&document.flight_results, value(matches, "weekend-top")?);
    println!("\n{}", render_summary(&route, &consolidation, top));

    let dir: PathBuf = value(matches, "output-dir")?;
    save_consolidated(&dir, &route, &consolidation, Some(file.as_path()), top).await?;
    save_summary_markdown(&dir, &route, &consolidation, top).await?;

    Ok(())
}

/// CLI entry point for the fare sweep tool
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("search", sub)) => run_search(sub).await,
        Some(("process", sub)) => run_process(sub).await,
        Some((other, _)) => anyhow::bail!("unknown command '{}'", other),
        None => anyhow::bail!("a command is required"),
    }
}
