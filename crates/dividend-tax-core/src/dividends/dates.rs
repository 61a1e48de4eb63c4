use chrono::NaiveDate;

/// Canonical date form used on every transaction.
pub const DATE_FORMAT_DISPLAY: &str = "%Y-%m-%d";

/// Date form of OFX timestamps (first 8 characters) and of rate queries.
pub const DATE_FORMAT_OFX: &str = "%Y%m%d";

/// Date form returned by the exchange-rate service.
pub const DATE_FORMAT_API: &str = "%d.%m.%Y";

/// Reformat an OFX timestamp (`YYYYMMDD[HHMMSS[.XXX][TZ]]`) to `YYYY-MM-DD`.
/// Only the first 8 characters are significant.
pub fn ofx_to_iso(timestamp: &str) -> Option<String> {
    let day = timestamp.trim().get(..8)?;
    NaiveDate::parse_from_str(day, DATE_FORMAT_OFX)
        .ok()
        .map(|date| date.format(DATE_FORMAT_DISPLAY).to_string())
}

/// `YYYY-MM-DD` to the `YYYYMMDD` form the rate service is queried with.
pub fn iso_to_ofx(date: &str) -> Option<String> {
    parse_iso(date).map(|date| date.format(DATE_FORMAT_OFX).to_string())
}

/// `DD.MM.YYYY` from the rate service to `YYYY-MM-DD`.
pub fn api_to_iso(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT_API)
        .ok()
        .map(|date| date.format(DATE_FORMAT_DISPLAY).to_string())
}

/// Strict `YYYY-MM-DD`; unpadded months or days are rejected.
pub fn parse_iso(date: &str) -> Option<NaiveDate> {
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT_DISPLAY).ok()
}

/// `YYYY-MM` bucket of a valid `YYYY-MM-DD` date.
pub fn month_key(date: &str) -> Option<&str> {
    parse_iso(date)?;
    date.get(..7)
}
