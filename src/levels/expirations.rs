use super::config;
use super::error::MalformedExpirationDate;
use chrono::NaiveDate;
use tracing::warn;

/// Expirations chosen for a symbol plus the entries that could not be parsed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpirationSelection {
    pub selected: Vec<NaiveDate>,
    pub malformed: Vec<MalformedExpirationDate>,
}

pub fn parse_expiration(raw: &str) -> Result<NaiveDate, MalformedExpirationDate> {
    NaiveDate::parse_from_str(raw.trim(), config::DATE_FORMAT).map_err(|e| MalformedExpirationDate {
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Absolute distance in days between an expiration and the target
pub fn days_from_target(expiration: NaiveDate, target: NaiveDate) -> i64 {
    (expiration - target).num_days().abs()
}

/// Order expirations by proximity to `target` and keep the closest `limit`.
///
/// The sort is stable: expirations at the same distance keep the order the
/// source listed them in. Unparsable entries are dropped and reported.
pub fn select_expirations<S: AsRef<str>>(
    available: &[S],
    target: NaiveDate,
    limit: usize,
) -> ExpirationSelection {
    let mut selection = ExpirationSelection::default();

    for raw in available {
        match parse_expiration(raw.as_ref()) {
            Ok(date) => selection.selected.push(date),
            Err(e) => {
                warn!(raw = %e.raw, reason = %e.reason, "Dropping malformed expiration date");
                selection.malformed.push(e);
            }
        }
    }

    selection
        .selected
        .sort_by_key(|date| days_from_target(*date, target));
    selection.selected.truncate(limit);

    selection
}
