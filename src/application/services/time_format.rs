use chrono::{DateTime, Utc};

const UNITS: [(&str, f64); 6] = [
    ("year", 31_536_000.0),
    ("month", 2_628_000.0),
    ("day", 86_400.0),
    ("hour", 3_600.0),
    ("minute", 60.0),
    ("second", 1.0),
];

/// Two most significant units, e.g. `4 months and 24 days`
pub fn human_duration(seconds: i64) -> String {
    let seconds = seconds.max(0) as f64;
    let values = [
        (seconds / UNITS[0].1).trunc(),
        (seconds / UNITS[1].1 % 12.0).trunc(),
        (seconds / UNITS[2].1 % 30.416_666_666_666_67).trunc(),
        (seconds / UNITS[3].1 % 24.0).trunc(),
        (seconds / UNITS[4].1 % 60.0).trunc(),
        (seconds % 60.0).trunc(),
    ];

    let parts: Vec<String> = values
        .iter()
        .zip(UNITS.iter())
        .filter(|(value, _)| **value > 0.0)
        .take(2)
        .map(|(value, (unit, _))| {
            let value = *value as i64;
            format!("{} {}{}", value, unit, if value > 1 { "s" } else { "" })
        })
        .collect();

    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" and ")
    }
}

/// Duration between `since` and `now` in [`human_duration`] form
pub fn time_since(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    human_duration((now - since).num_seconds())
}

/// Absolute timestamp, e.g. `04 March 2015, 07:02:01 UTC`
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%d %B %Y, %H:%M:%S UTC").to_string()
}
