use time::{macros::format_description, Date, PrimitiveDateTime};

const MISSING_MARKERS: [&str; 3] = ["nan", "none", "null"];

/// Parse a measurement cell. Never fails: anything that is not a finite
/// number becomes `None`.
///
/// A comma is accepted as decimal separator (`"1,5"` is `1.5`).
pub fn parse_optional_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || MISSING_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
        return None;
    }

    s.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Trimmed text, or `None` when nothing is left.
pub fn parse_optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a timestamp cell into wall-clock time.
///
/// Offsets (`Z`, `+02:00`, `+0200`, ` -05`) are accepted but discarded; the
/// local time as written is kept. Month and day may be unpadded. Slash dates
/// are read month-first, falling back to day-first when that is not a valid
/// date. Returns `None` for anything unrecognised.
pub fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let s = strip_offset(raw.trim());
    if s.is_empty() {
        return None;
    }
    // Date and time may be separated by `T` or a space.
    let s = s.replacen('T', " ", 1);

    let date_times = [
        format_description!(
            "[year]-[month padding:none]-[day padding:none] [hour padding:none]:[minute]:[second].[subsecond]"
        ),
        format_description!(
            "[year]-[month padding:none]-[day padding:none] [hour padding:none]:[minute]:[second]"
        ),
        format_description!(
            "[year]-[month padding:none]-[day padding:none] [hour padding:none]:[minute]"
        ),
        format_description!(
            "[year]/[month padding:none]/[day padding:none] [hour padding:none]:[minute]:[second]"
        ),
        format_description!(
            "[year]/[month padding:none]/[day padding:none] [hour padding:none]:[minute]"
        ),
        format_description!(
            "[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]:[second]"
        ),
        format_description!(
            "[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]"
        ),
        format_description!(
            "[day padding:none]/[month padding:none]/[year] [hour padding:none]:[minute]:[second]"
        ),
        format_description!(
            "[day padding:none]/[month padding:none]/[year] [hour padding:none]:[minute]"
        ),
    ];
    for format in date_times {
        if let Ok(dt) = PrimitiveDateTime::parse(&s, format) {
            return Some(dt);
        }
    }

    let dates = [
        format_description!("[year]-[month padding:none]-[day padding:none]"),
        format_description!("[year]/[month padding:none]/[day padding:none]"),
        format_description!("[month padding:none]/[day padding:none]/[year]"),
        format_description!("[day padding:none]/[month padding:none]/[year]"),
    ];
    dates
        .into_iter()
        .find_map(|format| Date::parse(&s, format).ok())
        .map(Date::midnight)
}

/// Drop a trailing UTC designator or numeric offset from a date-time.
///
/// Only text after the first `:` is searched, so the dashes of a date are
/// never mistaken for a negative offset.
fn strip_offset(s: &str) -> &str {
    let s = s.strip_suffix(|c: char| c == 'Z' || c == 'z').unwrap_or(s);

    let Some(colon) = s.find(':') else {
        return s;
    };
    let Some(sign) = s[colon..]
        .rfind(|c: char| c == '+' || c == '-')
        .map(|pos| colon + pos)
    else {
        return s;
    };

    let offset = s[sign + 1..].as_bytes();
    let is_offset = match offset.len() {
        2 | 4 => offset.iter().all(u8::is_ascii_digit),
        5 => {
            offset[2] == b':'
                && offset[..2]
                    .iter()
                    .chain(&offset[3..])
                    .all(u8::is_ascii_digit)
        }
        _ => false,
    };

    if is_offset {
        s[..sign].trim_end()
    } else {
        s
    }
}
