//! `[now]` and `[now:format]` rendering.

use chrono::{DateTime, Datelike, Local, Timelike};

/// Format rendered with fixed zero-padded fields, independent of the token table.
pub const PARITY_FORMAT: &str = "YYYY-MM-DD HH:mm:ss";

// Longest tokens first so `MMMM` wins over `MM` and `M`.
const TOKENS: &[&str] = &[
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "DD", "D", "dddd", "ddd", "dd", "d", "HH", "H",
    "hh", "h", "mm", "m", "ss", "s", "SSS", "A", "a", "ZZ", "Z", "X", "x",
];

/// Current Unix time in whole seconds.
pub fn unix_seconds(now: &DateTime<Local>) -> String {
    now.timestamp().to_string()
}

/// Renders local time with a dayjs-style format string.
///
/// Falls back to the default locale timestamp when `format` contains no
/// recognised token; never fails.
pub fn format_local(now: &DateTime<Local>, format: &str) -> String {
    if format == PARITY_FORMAT {
        return format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second()
        );
    }
    format_tokens(now, format).unwrap_or_else(|| default_locale(now))
}

/// Default timestamp used when a format string is not understood (`1/5/2024, 7:08:09 AM`).
pub fn default_locale(now: &DateTime<Local>) -> String {
    now.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

fn format_tokens(now: &DateTime<Local>, format: &str) -> Option<String> {
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;
    let mut matched = false;

    'scan: while !rest.is_empty() {
        for token in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(&render_token(now, token));
                rest = tail;
                matched = true;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    matched.then_some(out)
}

fn render_token(now: &DateTime<Local>, token: &str) -> String {
    match token {
        "YYYY" => format!("{:04}", now.year()),
        "YY" => format!("{:02}", now.year().rem_euclid(100)),
        "MMMM" => now.format("%B").to_string(),
        "MMM" => now.format("%b").to_string(),
        "MM" => format!("{:02}", now.month()),
        "M" => now.month().to_string(),
        "DD" => format!("{:02}", now.day()),
        "D" => now.day().to_string(),
        "dddd" => now.format("%A").to_string(),
        "ddd" => now.format("%a").to_string(),
        "dd" => now.format("%a").to_string().chars().take(2).collect(),
        "d" => now.weekday().num_days_from_sunday().to_string(),
        "HH" => format!("{:02}", now.hour()),
        "H" => now.hour().to_string(),
        "hh" => format!("{:02}", now.hour12().1),
        "h" => now.hour12().1.to_string(),
        "mm" => format!("{:02}", now.minute()),
        "m" => now.minute().to_string(),
        "ss" => format!("{:02}", now.second()),
        "s" => now.second().to_string(),
        "SSS" => format!("{:03}", now.timestamp_subsec_millis().min(999)),
        "A" => now.format("%p").to_string(),
        "a" => now.format("%p").to_string().to_lowercase(),
        "ZZ" => now.format("%z").to_string(),
        "Z" => now.format("%:z").to_string(),
        "X" => now.timestamp().to_string(),
        "x" => now.timestamp_millis().to_string(),
        _ => token.to_string(),
    }
}
