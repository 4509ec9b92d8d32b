use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Datelike, TimeDelta, Utc};
use pageproto::feed::ServerSnapshot;
use tracing::error;

use crate::queue::{Outcome, PageRequest};

/// Expand a log path template: `{0}` month name, `{1}` month number,
/// `{2}` year. Recomputed on every write so month and year rollovers land in
/// fresh files instead of a stale cached handle.
pub fn expand_template(template: &str, now: DateTime<Utc>) -> String {
    template
        .replace("{0}", &now.format("%B").to_string())
        .replace("{1}", &now.month().to_string())
        .replace("{2}", &now.year().to_string())
}

fn round_note(snapshot: Option<&ServerSnapshot>) -> String {
    match snapshot {
        Some(s) => format!(
            "Round: {} on {} ({}/{})",
            s.game_mode, s.map, s.player_count, s.max_player_count
        ),
        None => "No Server Info".to_string(),
    }
}

/// Log line for a freshly recorded page request.
pub fn request_line(request: &PageRequest, snapshot: Option<&ServerSnapshot>) -> String {
    format!(
        "{}: '{}'; {}",
        request.requester,
        request.text,
        round_note(snapshot)
    )
}

/// Log line for a flushed request, or `None` for a negative elapsed time
/// (reported here and skipped by the caller).
pub fn outcome_line(
    outcome: &Outcome,
    snapshot: Option<&ServerSnapshot>,
    fail_minutes: i64,
) -> Option<String> {
    match outcome {
        Outcome::Failed { request } => Some(format!(
            "Failed request, elapsed time > {} minutes; Request: {}: '{}'",
            fail_minutes, request.requester, request.text
        )),
        Outcome::Resolved {
            request,
            elapsed,
            admin,
            reply,
        } => {
            let Some(dur) = elapsed_text(*elapsed) else {
                error!(
                    requester = %request.requester,
                    elapsed_s = elapsed.num_seconds(),
                    "negative elapsed time on resolved request; line skipped"
                );
                return None;
            };
            Some(format!(
                "Response Time: {}; {}: '{}'; Request - {}: '{}'; {}",
                dur,
                admin,
                reply,
                request.requester,
                request.text,
                round_note(snapshot)
            ))
        }
    }
}

/// Humanize a non-negative duration: minutes omitted when zero, seconds
/// omitted only when minutes are present and seconds are zero. `None` for a
/// negative duration.
pub fn elapsed_text(elapsed: TimeDelta) -> Option<String> {
    if elapsed < TimeDelta::zero() {
        return None;
    }
    let minutes = elapsed.num_seconds() / 60;
    let seconds = elapsed.num_seconds() % 60;

    let mut out = String::new();
    if minutes > 0 {
        out.push_str(&format!("{minutes} minute{}", plural(minutes)));
    }
    if seconds > 0 || minutes == 0 {
        if !out.is_empty() {
            out.push_str(" and ");
        }
        out.push_str(&format!("{seconds} second{}", plural(seconds)));
    }
    Some(out)
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Append one line to the log file named by the folder and file templates.
///
/// UTF-8, newline-terminated. The handle is opened, written, flushed, and
/// closed within this call on every path.
pub fn append_line(
    folder_template: &str,
    file_template: &str,
    now: DateTime<Utc>,
    line: &str,
) -> anyhow::Result<()> {
    let dir = PathBuf::from(expand_template(folder_template, now));
    let path = dir.join(expand_template(file_template, now));

    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create log dir {}", dir.display()))?;
    }

    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;
    f.write_all(line.as_bytes())?;
    if !line.ends_with('\n') {
        f.write_all(b"\n")?;
    }
    f.flush()?;
    Ok(())
}
