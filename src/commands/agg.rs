use std::io::Write;

use super::CommandError;
use crate::feed::FeedFetcher;
use crate::ingest::{CycleReport, Ingestor, IntervalTrigger, Scheduler};
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::storage::User;
use crate::util::{parse_interval, strip_terminal_escapes};

const SEPARATOR: &str = "----------------------------------------";

/// `agg`: ingest one followed feed per interval until shutdown.
pub(super) async fn run<W: Write>(
    session: &mut Session,
    user: &User,
    interval: &str,
    shutdown: &Shutdown,
    out: &mut W,
) -> Result<(), CommandError> {
    let period = parse_interval(interval)?;
    let fetcher = FeedFetcher::new(&session.config.fetch_settings())?;
    let ingestor = Ingestor::new(session.db.clone(), fetcher, session.config.timestamp_policy);

    writeln!(out, "Collecting feeds every {:?}", period)?;
    out.flush()?;

    let mut scheduler = Scheduler::new(IntervalTrigger::new(period), shutdown.clone());
    let summary = scheduler
        .run_reporting(
            |shutdown| {
                let ingestor = ingestor.clone();
                let user = user.clone();
                async move { ingestor.run_cycle(&user, &shutdown).await }
            },
            |report| {
                if let Some(report) = report {
                    if let Err(e) = print_report(&mut *out, &report) {
                        tracing::warn!(error = %e, "Failed to print cycle report");
                    }
                }
            },
        )
        .await;

    writeln!(
        out,
        "Stopped after {} cycle(s), {} failed",
        summary.cycles, summary.failures
    )?;
    Ok(())
}

/// Per-feed summary printed after each successful cycle.
pub fn print_report<W: Write>(out: &mut W, report: &CycleReport) -> std::io::Result<()> {
    let title = if report.channel_title.is_empty() {
        &report.feed_name
    } else {
        &report.channel_title
    };
    writeln!(out)?;
    writeln!(out, "Feed from {}", strip_terminal_escapes(title))?;
    for saved in &report.saved {
        writeln!(out, "Successfully saved {} to database", saved)?;
    }
    if report.already_stored > 0 {
        writeln!(out, "{} post(s) already stored", report.already_stored)?;
    }
    if report.skipped > 0 {
        writeln!(out, "{} item(s) skipped", report.skipped)?;
    }
    if report.feed_removed {
        writeln!(out, "Feed {} was removed during the fetch", report.feed_url)?;
    }
    writeln!(out, "{}", SEPARATOR)?;
    out.flush()
}
