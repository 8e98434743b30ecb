use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use crossterm::style::{Color, Stylize};
use serde::Serialize;

use crate::args::OutputFormat;
use crate::error::AppResult;
use crate::metrics::{AggregateStats, TransportErrorCounts};

/// Flat, serializable view of the final aggregate.
#[derive(Debug, Serialize)]
pub(crate) struct Report {
    pub(crate) total_requests: u64,
    pub(crate) succeeded: u64,
    pub(crate) failed: u64,
    pub(crate) transport_errors: u64,
    /// Only kinds that occurred.
    pub(crate) transport_errors_by_kind: BTreeMap<&'static str, u64>,
    pub(crate) requests_per_second: String,
    pub(crate) requests_per_second_x100: u64,
    pub(crate) elapsed_us: u64,
    pub(crate) avg_latency_us: u64,
    pub(crate) min_latency_us: u64,
    pub(crate) max_latency_us: u64,
    pub(crate) avg_time_to_first_byte_us: u64,
    pub(crate) new_connections: u64,
    pub(crate) reused_connections: u64,
    pub(crate) time_connecting_us: u64,
    pub(crate) bytes_received: u64,
}

impl Report {
    pub(crate) fn from_stats(stats: &AggregateStats) -> Self {
        Self {
            total_requests: stats.total_requests,
            succeeded: stats.succeeded,
            failed: stats.failed,
            transport_errors: stats.transport_errors,
            transport_errors_by_kind: occurred_kinds(stats.transport_error_kinds).collect(),
            requests_per_second: stats.requests_per_second.to_string(),
            requests_per_second_x100: stats.requests_per_second.hundredths(),
            elapsed_us: micros(stats.elapsed),
            avg_latency_us: micros(stats.avg_latency),
            min_latency_us: micros(stats.min_latency),
            max_latency_us: micros(stats.max_latency),
            avg_time_to_first_byte_us: micros(stats.avg_time_to_first_byte),
            new_connections: stats.new_connections,
            reused_connections: stats.reused_connections,
            time_connecting_us: micros(stats.time_connecting),
            bytes_received: stats.bytes_received,
        }
    }
}

fn occurred_kinds(counts: TransportErrorCounts) -> impl Iterator<Item = (&'static str, u64)> {
    counts
        .by_kind()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| (kind.as_str(), count))
}

fn transport_errors_line(stats: &AggregateStats) -> String {
    let breakdown: Vec<String> = occurred_kinds(stats.transport_error_kinds)
        .map(|(kind, count)| format!("{}: {}", kind, count))
        .collect();
    if breakdown.is_empty() {
        format!("Transport Errors: {}", stats.transport_errors)
    } else {
        format!(
            "Transport Errors: {} ({})",
            stats.transport_errors,
            breakdown.join(", ")
        )
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Writes the final report to stdout.
///
/// # Errors
///
/// Returns an error when stdout cannot be written or JSON encoding fails.
pub(crate) fn print_summary(
    stats: &AggregateStats,
    format: OutputFormat,
    no_color: bool,
) -> AppResult<()> {
    let mut out = std::io::stdout().lock();
    match format {
        OutputFormat::Text => {
            for line in summary_lines(stats) {
                match line.color {
                    Some(color) if !no_color => writeln!(out, "{}", line.text.with(color))?,
                    Some(_) | None => writeln!(out, "{}", line.text)?,
                }
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &Report::from_stats(stats))?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

struct SummaryLine {
    text: String,
    color: Option<Color>,
}

fn summary_lines(stats: &AggregateStats) -> Vec<SummaryLine> {
    let line = |color: Option<Color>, text: String| SummaryLine { text, color };
    vec![
        line(
            Some(Color::Green),
            format!("Succeeded Requests: {}", stats.succeeded),
        ),
        line(Some(Color::Red), format!("Failed Requests: {}", stats.failed)),
        line(Some(Color::Red), transport_errors_line(stats)),
        line(
            Some(Color::Cyan),
            format!("Requests/Second: {}", stats.requests_per_second),
        ),
        line(
            Some(Color::Cyan),
            format!("Completed Load Testing In: {:?}", stats.elapsed),
        ),
        line(
            None,
            format!("Average Time Per Request: {:?}", stats.avg_latency),
        ),
        line(None, format!("Fastest Request: {:?}", stats.min_latency)),
        line(None, format!("Slowest Request: {:?}", stats.max_latency)),
        line(
            None,
            format!(
                "Average Time To First Byte: {:?}",
                stats.avg_time_to_first_byte
            ),
        ),
        line(
            None,
            format!("New Connections Made: {}", stats.new_connections),
        ),
        line(
            None,
            format!("Reused Connections: {}", stats.reused_connections),
        ),
        line(
            None,
            format!("Time Spent Connecting: {:?}", stats.time_connecting),
        ),
        line(None, format!("Bytes Received: {}", stats.bytes_received)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFailure;
    use crate::metrics::RequestRate;

    fn stats() -> AggregateStats {
        AggregateStats {
            total_requests: 10,
            succeeded: 9,
            failed: 1,
            transport_errors: 0,
            transport_error_kinds: TransportErrorCounts::default(),
            elapsed: Duration::from_millis(450),
            requests_per_second: RequestRate::from_count(9, Duration::from_millis(450)),
            avg_latency: Duration::from_millis(40),
            min_latency: Duration::from_millis(12),
            max_latency: Duration::from_millis(90),
            avg_time_to_first_byte: Duration::from_millis(30),
            new_connections: 2,
            reused_connections: 8,
            time_connecting: Duration::from_micros(800),
            bytes_received: 20,
        }
    }

    #[test]
    fn text_report_lists_every_figure() -> Result<(), String> {
        let lines: Vec<String> = summary_lines(&stats())
            .into_iter()
            .map(|line| line.text)
            .collect();
        for expected in [
            "Succeeded Requests: 9",
            "Failed Requests: 1",
            "Requests/Second: 20.00",
            "Completed Load Testing In: 450ms",
            "Fastest Request: 12ms",
            "Slowest Request: 90ms",
            "Reused Connections: 8",
        ] {
            if !lines.iter().any(|line| line == expected) {
                return Err(format!("Missing line '{}' in {:?}", expected, lines));
            }
        }
        Ok(())
    }

    #[test]
    fn transport_errors_are_broken_down_by_kind() -> Result<(), String> {
        let mut failing = stats();
        failing.failed = 3;
        failing.transport_errors = 3;
        failing.transport_error_kinds.record(TransportFailure::Timeout);
        failing.transport_error_kinds.record(TransportFailure::Timeout);
        failing.transport_error_kinds.record(TransportFailure::Body);

        let line = transport_errors_line(&failing);
        if line != "Transport Errors: 3 (body: 1, timeout: 2)" {
            return Err(format!("Unexpected line: {}", line));
        }
        if transport_errors_line(&stats()) != "Transport Errors: 0" {
            return Err("Expected no breakdown without errors".to_owned());
        }

        let value = serde_json::to_value(Report::from_stats(&failing))
            .map_err(|err| err.to_string())?;
        let expected = serde_json::json!({ "body": 1, "timeout": 2 });
        if value.get("transport_errors_by_kind") != Some(&expected) {
            return Err(format!(
                "Unexpected breakdown: {:?}",
                value.get("transport_errors_by_kind")
            ));
        }
        Ok(())
    }

    #[test]
    fn json_report_uses_microseconds() -> Result<(), String> {
        let value = serde_json::to_value(Report::from_stats(&stats()))
            .map_err(|err| err.to_string())?;
        if value.get("elapsed_us") != Some(&serde_json::json!(450_000)) {
            return Err(format!("Unexpected elapsed: {:?}", value.get("elapsed_us")));
        }
        if value.get("requests_per_second") != Some(&serde_json::json!("20.00")) {
            return Err(format!(
                "Unexpected rate: {:?}",
                value.get("requests_per_second")
            ));
        }
        if value.get("time_connecting_us") != Some(&serde_json::json!(800)) {
            return Err("Unexpected connect time".to_owned());
        }
        Ok(())
    }
}
