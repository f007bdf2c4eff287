//! ISO 9660 date/time decoding.
//!
//! Two encodings appear on disc:
//!
//! ## 7-byte binary form (directory records)
//! ```text
//! [0] Years since 1900
//! [1] Month (1-12)
//! [2] Day (1-31)
//! [3] Hour (0-23)
//! [4] Minute (0-59)
//! [5] Second (0-59)
//! [6] UTC offset in 15-minute intervals (i8, -48..=52)
//! ```
//!
//! ## 17-byte digit form (volume descriptors)
//! ```text
//! [0..4]   Year        "YYYY"
//! [4..6]   Month       "MM"
//! [6..8]   Day         "DD"
//! [8..10]  Hour        "hh"
//! [10..12] Minute      "mm"
//! [12..14] Second      "ss"
//! [14..16] Centisecond "cc"
//! [16]     UTC offset in 15-minute intervals (i8)
//! ```
//!
//! A zero year, month or day means the date is not recorded; this is common
//! for expiration and effective dates and decodes to [`None`]. UTC offsets
//! are applied in whole hours (interval count / 4, rounded).

use chrono::{DateTime, FixedOffset, NaiveDate};
use log::warn;

use crate::Result;
use crate::utils::ByteCursor;

/// Timestamp type produced by the date decoders.
pub type IsoDateTime = DateTime<FixedOffset>;

/// Decode a 7-byte binary date, advancing the cursor by 7.
pub fn read_date7(c: &mut ByteCursor<'_>) -> Result<Option<IsoDateTime>> {
    let [year, month, day, hour, minute, second, offset] = c.bytesa::<7>()?;
    if year == 0 || month == 0 || day == 0 {
        return Ok(None);
    }
    Ok(build(
        1900 + year as i32,
        month as u32,
        day as u32,
        hour as u32,
        minute as u32,
        second as u32,
        0,
        offset as i8,
    ))
}

/// Decode a 17-byte digit date, advancing the cursor by 17.
pub fn read_date17(c: &mut ByteCursor<'_>) -> Result<Option<IsoDateTime>> {
    let digits = c.bytes(16)?;
    let offset = c.u8()? as i8;

    let year = digits_value(&digits[0..4]);
    let month = digits_value(&digits[4..6]);
    let day = digits_value(&digits[6..8]);
    if year == 0 || month == 0 || day == 0 {
        return Ok(None);
    }
    let hour = digits_value(&digits[8..10]);
    let minute = digits_value(&digits[10..12]);
    let second = digits_value(&digits[12..14]);
    let centis = digits_value(&digits[14..16]);

    Ok(build(
        year as i32,
        month,
        day,
        hour,
        minute,
        second,
        centis * 10,
        offset,
    ))
}

/// Value of the leading ASCII digits in `raw`; anything else reads as 0.
fn digits_value(raw: &[u8]) -> u32 {
    raw.iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0, |acc, b| acc * 10 + (b - b'0') as u32)
}

#[allow(clippy::too_many_arguments)]
fn build(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    milli: u32,
    offset_quarters: i8,
) -> Option<IsoDateTime> {
    let hours = (offset_quarters as f64 / 4.0).round() as i32;
    let Some(tz) = FixedOffset::east_opt(hours * 3600) else {
        warn!("ignoring date with out-of-range UTC offset {offset_quarters} (x15 min)");
        return None;
    };
    let local = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_milli_opt(hour, minute, second, milli));
    match local {
        Some(local) => local.and_local_timezone(tz).single(),
        None => {
            warn!("ignoring out-of-range date {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}");
            None
        }
    }
}
