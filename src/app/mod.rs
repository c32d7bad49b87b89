mod display;
mod fill;
mod prompt;
mod trakt;


use std::env;
use std::io;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Command, FillArgs};
use crate::config::{ApiSettings, load_credentials, resolve_credentials_path};
use crate::error::GapFillError;

use self::display::{Progress, error_mark, ok_mark, rule, warn_mark};
use self::fill::{
    ShowAnalysis, ShowState, WatchIndex, analyze_show, build, render_preview, render_summary,
};
use self::prompt::{SELECTION_HELP, confirm, prompt_selection, selection_from_flag};
use self::trakt::TraktClient;

/// Shows with fillable episodes plus the ones that could not be analyzed.
struct LibraryScan {
    shows: Vec<ShowAnalysis>,
    skipped: Vec<(String, GapFillError)>,
    total: usize,
}

pub fn run(cli: Cli) -> Result<()> {
    let path = resolve_credentials_path(cli.credentials.as_deref())?;
    let credentials = load_credentials(&path, |key| env::var(key).ok())?;
    let client = TraktClient::new(ApiSettings::from_env(), credentials);
    println!("{} Authenticated as: {}", ok_mark(), client.username());
    println!();

    let as_of = Utc::now();
    let scan = scan_library(&client, as_of)?;

    match cli.command {
        Some(Command::Scan) => run_scan(&scan),
        Some(Command::Fill(args)) => run_fill(&client, &scan, &args, as_of)?,
        None => run_fill(&client, &scan, &FillArgs::default(), as_of)?,
    }
    Ok(())
}

fn scan_library(client: &TraktClient, as_of: DateTime<Utc>) -> Result<LibraryScan> {
    println!("Fetching watch history...");
    let mut index = match client.history() {
        Ok(index) => {
            println!("{} Loaded watch history", ok_mark());
            index
        }
        Err(err @ GapFillError::Auth { .. }) => return Err(err.into()),
        Err(err) => {
            warn!(error = %err, "history unavailable, using last watched times");
            println!("{} Could not fetch detailed history: {err}", warn_mark());
            WatchIndex::default()
        }
    };

    println!("Fetching watched shows...");
    let watched = client.watched_shows()?;
    println!("Found {} watched shows", watched.len());
    println!();

    println!("Analyzing shows for gaps...");
    let progress = Progress::new(watched.len());
    let mut shows = Vec::new();
    let mut skipped = Vec::new();
    for (idx, item) in watched.iter().enumerate() {
        progress.update(idx + 1);
        let backfilled = index.fill_missing(&item.events);
        if backfilled > 0 {
            debug!(show = %item.show.title, backfilled, "used last watched times");
        }

        let catalog = match client.seasons(item.show.id, as_of) {
            Ok(catalog) => catalog,
            Err(err @ GapFillError::Auth { .. }) => {
                progress.finish();
                return Err(err.into());
            }
            Err(err) => {
                warn!(show = %item.show.title, error = %err, "skipping show");
                skipped.push((item.show.title.clone(), err));
                continue;
            }
        };

        let state = ShowState::new(item.show.clone(), catalog, &index.events_for(item.show.id));
        match analyze_show(state) {
            Ok(analysis) if analysis.total_fillable() > 0 => shows.push(analysis),
            Ok(_) => {}
            Err(err) => debug!(show = %item.show.title, error = %err, "0 fillable episodes"),
        }
    }
    progress.finish();
    info!(
        fillable = shows.len(),
        skipped = skipped.len(),
        "library scan complete"
    );

    Ok(LibraryScan {
        shows,
        skipped,
        total: watched.len(),
    })
}

fn print_skipped(scan: &LibraryScan) {
    if scan.skipped.is_empty() {
        return;
    }
    println!(
        "{} Skipped {} of {} show(s) that could not be loaded:",
        warn_mark(),
        scan.skipped.len(),
        scan.total
    );
    for (title, err) in &scan.skipped {
        println!("    {title}: {err}");
    }
    println!();
}

fn print_summary(scan: &LibraryScan) -> bool {
    println!();
    print_skipped(scan);
    if scan.shows.is_empty() {
        println!("{} No missing episodes found!", ok_mark());
        return false;
    }

    println!("{}", rule());
    println!(
        "Found {} show(s) with missing episodes:",
        scan.shows.len()
    );
    println!("{}", rule());
    println!();
    print!("{}", render_summary(&scan.shows));
    println!();
    println!("{}", rule());
    true
}

fn run_scan(scan: &LibraryScan) {
    print_summary(scan);
}

fn run_fill(
    client: &TraktClient,
    scan: &LibraryScan,
    args: &FillArgs,
    as_of: DateTime<Utc>,
) -> Result<()> {
    if !print_summary(scan) {
        return Ok(());
    }

    let show_count = scan.shows.len();
    let selection = match args.select.as_deref() {
        Some(text) => match selection_from_flag(text, &mut io::stdout(), show_count)? {
            Some(selection) => selection,
            None => {
                println!("Nothing selected.");
                return Ok(());
            }
        },
        None => {
            println!();
            println!("{SELECTION_HELP}");
            println!();
            let stdin = io::stdin();
            match prompt_selection(&mut stdin.lock(), &mut io::stdout(), show_count)? {
                Some(selection) => selection,
                None => {
                    println!("\nCancelled.");
                    return Ok(());
                }
            }
        }
    };

    let plan = build(&scan.shows, &selection);
    println!();
    println!("{}", rule());
    print!("{}", render_preview(&scan.shows, &selection, &plan, as_of));
    println!("{}", rule());
    println!();

    if plan.is_empty() {
        println!("Nothing to fill for the selected shows.");
        return Ok(());
    }
    if args.dry_run {
        println!("Dry run: nothing submitted.");
        return Ok(());
    }
    if !args.yes {
        let stdin = io::stdin();
        if !confirm(&mut stdin.lock(), &mut io::stdout(), "Proceed?")? {
            println!("\nCancelled.");
            return Ok(());
        }
    }

    println!("Marking {} episodes as watched...", plan.len());
    let report = client.add_history(&plan)?;
    if report.is_complete() {
        println!(
            "{} Done! Marked {} episodes as watched.",
            ok_mark(),
            report.added
        );
        return Ok(());
    }

    println!(
        "{} Only {} of {} episodes were accepted.",
        error_mark(),
        report.added,
        report.planned
    );
    for item in &report.not_found {
        println!("    not found: {item}");
    }
    for episode in &report.rejected {
        println!("    not added: show {} {episode}", episode.show);
    }
    Err(GapFillError::Submission(format!(
        "{} of {} episodes accepted",
        report.added, report.planned
    ))
    .into())
}
