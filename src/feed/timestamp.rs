//! Publication date normalization for feed items.
//!
//! RSS publishers disagree about date formats. `pubDate` is supposed to be
//! RFC 822, but real feeds carry RFC 3339, SQL datetimes, bare dates and
//! human-readable forms. [`normalize_timestamp`] tries an ordered list of
//! layouts and returns the first successful parse. The order is
//! load-bearing: when an input matches more than one layout, the earlier
//! layout wins.
//!
//! Inputs without zone information are interpreted as UTC. Alphabetic zone
//! abbreviations use the RFC 822 table (`GMT`, `EST`, `PDT`, ...); any other
//! abbreviation is accepted with a zero offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use thiserror::Error;

/// No known layout accepted the input string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no known timestamp layout matches {input:?}")]
pub struct TimestampError {
    pub input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// Trailing `-0700` / `+07:00`, parsed by `%z`.
    Numeric,
    /// Trailing alphabetic abbreviation such as `MST` or `GMT`.
    Abbreviation,
    /// Full RFC 3339, delegated to chrono.
    Rfc3339,
    /// Date and time with no zone (UTC).
    Naive,
    /// Date with no time of day (midnight UTC).
    DateOnly,
}

struct Layout {
    format: &'static str,
    /// Input starts with `Mon, ` which is checked for syntax and then ignored.
    weekday: bool,
    zone: Zone,
}

const LAYOUTS: &[Layout] = &[
    // Mon, 02 Jan 2006 15:04:05 -0700
    Layout {
        format: "%d %b %Y %H:%M:%S %z",
        weekday: true,
        zone: Zone::Numeric,
    },
    // Mon, 02 Jan 2006 15:04:05 MST
    Layout {
        format: "%d %b %Y %H:%M:%S",
        weekday: true,
        zone: Zone::Abbreviation,
    },
    // 2006-01-02T15:04:05Z07:00
    Layout {
        format: "",
        weekday: false,
        zone: Zone::Rfc3339,
    },
    // 02 Jan 06 15:04 -0700
    Layout {
        format: "%d %b %y %H:%M %z",
        weekday: false,
        zone: Zone::Numeric,
    },
    // 02 Jan 06 15:04 MST
    Layout {
        format: "%d %b %y %H:%M",
        weekday: false,
        zone: Zone::Abbreviation,
    },
    // 2006-01-02 15:04:05
    Layout {
        format: "%Y-%m-%d %H:%M:%S",
        weekday: false,
        zone: Zone::Naive,
    },
    // 2006-01-02T15:04:05
    Layout {
        format: "%Y-%m-%dT%H:%M:%S",
        weekday: false,
        zone: Zone::Naive,
    },
    // Mon, 2 Jan 2006 15:04:05 -0700
    Layout {
        format: "%e %b %Y %H:%M:%S %z",
        weekday: true,
        zone: Zone::Numeric,
    },
    // Mon, 2 Jan 2006 15:04:05 MST
    Layout {
        format: "%e %b %Y %H:%M:%S",
        weekday: true,
        zone: Zone::Abbreviation,
    },
    // 2006-01-02
    Layout {
        format: "%Y-%m-%d",
        weekday: false,
        zone: Zone::DateOnly,
    },
    // Jan 2, 2006
    Layout {
        format: "%b %e, %Y",
        weekday: false,
        zone: Zone::DateOnly,
    },
    // January 2, 2006
    Layout {
        format: "%B %e, %Y",
        weekday: false,
        zone: Zone::DateOnly,
    },
];

/// Converts a feed-supplied date string into an instant.
///
/// Surrounding whitespace is ignored. Fails with [`TimestampError`] only
/// when every layout rejects the input; a default instant is never
/// returned in place of an error.
pub fn normalize_timestamp(input: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let trimmed = input.trim();

    LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(trimmed))
        .ok_or_else(|| TimestampError {
            input: input.to_string(),
        })
}

impl Layout {
    fn parse(&self, input: &str) -> Option<DateTime<FixedOffset>> {
        let body = if self.weekday {
            strip_weekday(input)?
        } else {
            input
        };

        match self.zone {
            Zone::Numeric => DateTime::parse_from_str(body, self.format).ok(),
            Zone::Abbreviation => {
                let (local, abbreviation) = body.rsplit_once(' ')?;
                let offset = abbreviation_offset(abbreviation)?;
                let naive = NaiveDateTime::parse_from_str(local.trim_end(), self.format).ok()?;
                offset.from_local_datetime(&naive).single()
            }
            Zone::Rfc3339 => DateTime::parse_from_rfc3339(body).ok(),
            Zone::Naive => {
                let naive = NaiveDateTime::parse_from_str(body, self.format).ok()?;
                Some(naive.and_utc().fixed_offset())
            }
            Zone::DateOnly => {
                let date = NaiveDate::parse_from_str(body, self.format).ok()?;
                Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset())
            }
        }
    }
}

/// Strips a leading `Mon, ` and returns the rest. The day name must be
/// valid but is not cross-checked against the date.
fn strip_weekday(input: &str) -> Option<&str> {
    let (day, rest) = input.split_once(',')?;
    day.trim().parse::<Weekday>().ok()?;
    Some(rest.trim_start())
}

fn abbreviation_offset(abbreviation: &str) -> Option<FixedOffset> {
    if abbreviation.is_empty()
        || abbreviation.len() > 5
        || !abbreviation.chars().all(|c| c.is_ascii_alphabetic())
    {
        return None;
    }

    let hours = match abbreviation.to_ascii_uppercase().as_str() {
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        // UT, UTC, GMT, Z and unknown abbreviations
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}
