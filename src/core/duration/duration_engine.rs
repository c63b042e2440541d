// Duration parsing and formatting for moderation commands.
//
// Ban and timeout commands accept free-form strings like "1w 2d" or "90m" and
// report lengths back as "1 week 2 days". Everything here is pure: no Discord
// types, no clocks, no storage.

use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// UNIT TABLE
// ============================================================================

/// One unit class of the duration table.
///
/// Every alias of a unit resolves to the same canonical millisecond value,
/// so there is exactly one place where the length of "a day" lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// Approximated as 30 days.
    Month,
    /// Approximated as 365 days.
    Year,
}

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

impl DurationUnit {
    /// Largest unit first - the order used when formatting.
    pub const DESCENDING: [DurationUnit; 7] = [
        DurationUnit::Year,
        DurationUnit::Month,
        DurationUnit::Week,
        DurationUnit::Day,
        DurationUnit::Hour,
        DurationUnit::Minute,
        DurationUnit::Second,
    ];

    pub const fn millis(self) -> u64 {
        match self {
            DurationUnit::Second => SECOND_MS,
            DurationUnit::Minute => MINUTE_MS,
            DurationUnit::Hour => HOUR_MS,
            DurationUnit::Day => DAY_MS,
            DurationUnit::Week => 7 * DAY_MS,
            DurationUnit::Month => 30 * DAY_MS,
            DurationUnit::Year => 365 * DAY_MS,
        }
    }

    /// Textual aliases accepted by the parser.
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            DurationUnit::Second => &["s", "sec", "second", "seconds"],
            DurationUnit::Minute => &["m", "min", "minute", "minutes"],
            DurationUnit::Hour => &["h", "hr", "hour", "hours"],
            DurationUnit::Day => &["d", "day", "days"],
            DurationUnit::Week => &["w", "week", "weeks"],
            DurationUnit::Month => &["M", "month", "months"],
            DurationUnit::Year => &["y", "year", "years"],
        }
    }

    fn singular(self) -> &'static str {
        match self {
            DurationUnit::Second => "second",
            DurationUnit::Minute => "minute",
            DurationUnit::Hour => "hour",
            DurationUnit::Day => "day",
            DurationUnit::Week => "week",
            DurationUnit::Month => "month",
            DurationUnit::Year => "year",
        }
    }

    fn short(self) -> &'static str {
        self.aliases()[0]
    }

    /// Resolve a unit token.
    ///
    /// `M` is the only case-sensitive token (month vs. minute); everything
    /// else is matched case-insensitively so "1H" and "2 Days" work.
    pub fn from_token(token: &str) -> Option<DurationUnit> {
        if token == "M" {
            return Some(DurationUnit::Month);
        }

        let lowered = token.to_ascii_lowercase();
        Self::DESCENDING.into_iter().find(|unit| {
            unit.aliases()
                .iter()
                .any(|alias| *alias != "M" && *alias == lowered)
        })
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// How unit aliases are honoured inside a duration string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasPolicy {
    /// Every alias in the unit table counts, in any position.
    #[default]
    AllAliases,
    /// Legacy behaviour: only a single `s`/`m`/`h`/`d`/`w` letter glued to its
    /// number contributes. Longer aliases collapse to their first letter and
    /// `y`, `M` or a space before the unit fail the whole string.
    SingleLetter,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown duration alias policy `{0}` (expected `all` or `single-letter`)")]
pub struct UnknownAliasPolicy(String);

impl FromStr for AliasPolicy {
    type Err = UnknownAliasPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all-aliases" => Ok(AliasPolicy::AllAliases),
            "single-letter" | "single_letter" | "legacy" => Ok(AliasPolicy::SingleLetter),
            _ => Err(UnknownAliasPolicy(s.to_string())),
        }
    }
}

/// Parse a compound duration like `"1w 2d 3h"` into milliseconds.
///
/// Returns `None` for anything that is not a duration; malformed user input
/// is routine, not an error.
pub fn parse_duration(input: &str, policy: AliasPolicy) -> Option<u64> {
    match policy {
        AliasPolicy::AllAliases => parse_all_aliases(input),
        AliasPolicy::SingleLetter => parse_single_letter(input),
    }
}

/// Single tokenizer pass: `(<digits> <ws>* <letters>) (<ws>* ...)*`.
fn parse_all_aliases(input: &str) -> Option<u64> {
    let bytes = input.as_bytes();
    let mut cursor = 0;
    let mut total_ms = 0_u64;
    let mut saw_pair = false;

    loop {
        cursor = skip_whitespace(bytes, cursor);
        if cursor >= bytes.len() {
            break;
        }

        let number_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if number_start == cursor {
            return None;
        }
        let amount = input[number_start..cursor].parse::<u64>().ok()?;

        cursor = skip_whitespace(bytes, cursor);

        let unit_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_alphabetic() {
            cursor += 1;
        }
        if unit_start == cursor {
            return None;
        }
        let unit = DurationUnit::from_token(&input[unit_start..cursor])?;

        total_ms = total_ms.checked_add(amount.checked_mul(unit.millis())?)?;
        saw_pair = true;
    }

    saw_pair.then_some(total_ms)
}

/// Reproduces the old scanner: find every `<digits><ws>*<unit>` segment, then
/// require each one to be `<digits>[smhdw]` with nothing in between.
fn parse_single_letter(input: &str) -> Option<u64> {
    let bytes = input.as_bytes();
    let mut cursor = 0;
    let mut total_ms = 0_u64;
    let mut matched_any = false;

    while cursor < bytes.len() {
        if !bytes[cursor].is_ascii_digit() {
            cursor += 1;
            continue;
        }

        let number_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        let number_end = cursor;
        let unit_at = skip_whitespace(bytes, number_end);

        let Some(&unit_byte) = bytes.get(unit_at) else {
            break;
        };
        if !matches!(
            unit_byte.to_ascii_lowercase(),
            b's' | b'm' | b'h' | b'd' | b'w' | b'y'
        ) {
            continue;
        }

        // Segment matched; only a glued lowercase smhdw letter survives.
        matched_any = true;
        cursor = unit_at + 1;
        if unit_at != number_end {
            return None;
        }
        let unit = match unit_byte {
            b's' => DurationUnit::Second,
            b'm' => DurationUnit::Minute,
            b'h' => DurationUnit::Hour,
            b'd' => DurationUnit::Day,
            b'w' => DurationUnit::Week,
            _ => return None,
        };
        let amount = input[number_start..number_end].parse::<u64>().ok()?;
        total_ms = total_ms.checked_add(amount.checked_mul(unit.millis())?)?;
    }

    matched_any.then_some(total_ms)
}

fn skip_whitespace(bytes: &[u8], mut cursor: usize) -> usize {
    while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
        cursor += 1;
    }
    cursor
}

// ============================================================================
// FORMATTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationStyle {
    /// `1 week 2 days`
    Long,
    /// `1w 2d`
    Compact,
}

/// Format milliseconds as `"1 week 2 days 3 hours"`.
///
/// Non-positive input yields `"0s"`. A positive value below one second has
/// no unit to show and yields `None`.
pub fn format_human_duration(ms: i64) -> Option<String> {
    format_with_style(ms, DurationStyle::Long)
}

/// Same decomposition as [`format_human_duration`], short tokens: `"1m 30s"`.
pub fn format_compact_duration(ms: i64) -> Option<String> {
    format_with_style(ms, DurationStyle::Compact)
}

fn format_with_style(ms: i64, style: DurationStyle) -> Option<String> {
    if ms <= 0 {
        return Some("0s".to_string());
    }

    let mut remaining = ms as u64;
    let mut parts = Vec::new();

    for unit in DurationUnit::DESCENDING {
        let value = remaining / unit.millis();
        if value == 0 {
            continue;
        }
        remaining -= value * unit.millis();

        parts.push(match style {
            DurationStyle::Long if value == 1 => format!("1 {}", unit.singular()),
            DurationStyle::Long => format!("{} {}s", value, unit.singular()),
            DurationStyle::Compact => format!("{}{}", value, unit.short()),
        });
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
