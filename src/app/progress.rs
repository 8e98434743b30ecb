use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::task::JoinHandle;

use crate::http::ConnectionCounters;
use crate::metrics::ProgressView;
use crate::shutdown::ShutdownSender;

const TICK: Duration = Duration::from_millis(500);
const BAR_WIDTH: usize = 30;

/// Live progress on stderr; a no-op when stderr is not a terminal.
pub(crate) fn setup_progress_indicator(
    total: u64,
    progress: ProgressView,
    connections: Arc<ConnectionCounters>,
    no_color: bool,
    shutdown_tx: &ShutdownSender,
) -> JoinHandle<()> {
    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::spawn(async move {
        if !std::io::stderr().is_terminal() {
            return;
        }

        let mut ticker = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    let snapshot = Snapshot::take(total, &progress, &connections);
                    if render_progress_line(&snapshot, no_color).is_ok() {
                        drop(finish_progress_line());
                    }
                    break;
                }
                _ = ticker.tick() => {
                    let snapshot = Snapshot::take(total, &progress, &connections);
                    if render_progress_line(&snapshot, no_color).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

struct Snapshot {
    completed: u64,
    total: u64,
    created: u64,
    reused: u64,
}

impl Snapshot {
    fn take(total: u64, progress: &ProgressView, connections: &ConnectionCounters) -> Self {
        Self {
            completed: progress.completed().min(total),
            total,
            created: connections.created(),
            reused: connections.reused(),
        }
    }
}

fn render_progress_line(snapshot: &Snapshot, no_color: bool) -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    for segment in build_progress_line(snapshot) {
        match segment.color {
            Some(color) if !no_color => {
                queue!(
                    out,
                    SetForegroundColor(color),
                    Print(&segment.text),
                    ResetColor
                )?;
            }
            Some(_) | None => queue!(out, Print(&segment.text))?,
        }
    }
    out.flush()?;
    Ok(())
}

fn finish_progress_line() -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn build_progress_line(snapshot: &Snapshot) -> Vec<ProgressSegment> {
    let goal = u128::from(snapshot.total.max(1));
    let current = u128::from(snapshot.completed);
    let width = u128::from(u64::try_from(BAR_WIDTH).unwrap_or(u64::MAX));

    // Nothing to do counts as done.
    let (filled, percent_x100) = if snapshot.total == 0 {
        (width, 10_000)
    } else {
        (
            current.saturating_mul(width).checked_div(goal).unwrap_or(0),
            current.saturating_mul(10_000).checked_div(goal).unwrap_or(0),
        )
    };
    let complete_size = usize::try_from(filled).unwrap_or(BAR_WIDTH).min(BAR_WIDTH);
    let incomplete_size = BAR_WIDTH.saturating_sub(complete_size);

    let bar = format!("[{}{}]", "#".repeat(complete_size), "-".repeat(incomplete_size));
    let percent = format!(
        " {}.{:02}%",
        percent_x100.checked_div(100).unwrap_or(0),
        percent_x100.checked_rem(100).unwrap_or(0)
    );
    let count = format!(" | {}/{} requests", snapshot.completed, snapshot.total);
    let conns = format!(
        " | {} new / {} reused connections",
        snapshot.created, snapshot.reused
    );

    vec![
        ProgressSegment::plain(bar),
        ProgressSegment::colored(percent, Color::Cyan),
        ProgressSegment::colored(count, Color::Yellow),
        ProgressSegment::plain(conns),
    ]
}

struct ProgressSegment {
    text: String,
    color: Option<Color>,
}

impl ProgressSegment {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }
}
