use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::application::errors::BotError;
use crate::domain::entities::User;

static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)([km]?)$").expect("valid point amount pattern")
});

/// Parse a point amount typed by `source`.
///
/// Accepts plain numbers, `k`/`m` suffixes, `all` and a percentage of the
/// source's own points.
pub fn parse_points_amount(source: &User, input: &str) -> Result<i64, BotError> {
    let input = input.trim().to_lowercase();

    let amount = if input == "all" {
        source.points
    } else if let Some(percent) = input.strip_suffix('%') {
        let percent: f64 = percent
            .parse()
            .map_err(|_| invalid("Invalid percentage"))?;
        if !(percent > 0.0 && percent <= 100.0) {
            return Err(invalid("Percentage must be between 0 and 100"));
        }
        (source.points as f64 * percent / 100.0).floor() as i64
    } else {
        let caps = AMOUNT.captures(&input).ok_or_else(|| invalid("Invalid amount of points"))?;
        let number: f64 = caps[1].parse().map_err(|_| invalid("Invalid amount of points"))?;
        let multiplier = match &caps[2] {
            "k" => 1_000.0,
            "m" => 1_000_000.0,
            _ => 1.0,
        };
        let value = number * multiplier;
        if value > i64::MAX as f64 {
            return Err(invalid("Amount of points is too large"));
        }
        value.floor() as i64
    };

    if amount <= 0 {
        return Err(invalid("Amount of points must be greater than 0"));
    }
    Ok(amount)
}

fn invalid(msg: &str) -> BotError {
    BotError::InvalidInput(msg.to_string())
}
