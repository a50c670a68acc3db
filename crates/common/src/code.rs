//! Human-readable business codes (`PED20250101` + suffix and friends).

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use rand::Rng;

/// Range the random suffix of a business code is drawn from.
pub const SUFFIX_RANGE: RangeInclusive<u16> = 1000..=9999;

/// Formats `<prefix><YYYYMMDD><suffix>`.
///
/// Uniqueness is not checked here: codes generated on the same day share the
/// prefix and date and only differ by the 4-digit suffix.
pub fn business_code(prefix: &str, date: NaiveDate, suffix: u16) -> String {
    format!("{prefix}{}{suffix:04}", date.format("%Y%m%d"))
}

/// Draws a suffix uniformly from [`SUFFIX_RANGE`].
pub fn random_suffix() -> u16 {
    rand::thread_rng().gen_range(SUFFIX_RANGE)
}
