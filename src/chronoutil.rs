//! RFC 1123 HTTP date parsing and formatting.

use {
    crate::constants::ISO8601_COMPACT_FORMAT,
    chrono::{
        format::{ParseError, ParseResult},
        naive::{NaiveDate, NaiveTime},
        DateTime, Datelike, FixedOffset, TimeZone, Utc, Weekday,
    },
    lazy_static::lazy_static,
    regex::Regex,
    std::str::FromStr,
};

/// `strftime` pattern that produces an RFC 1123 date in GMT.
pub(crate) const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

lazy_static! {
    /// RFC 1123 date format, e.g. `Tue, 15 Nov 1994 08:12:31 GMT`. The weekday is optional and the zone may be
    /// `GMT`, `UT`, `UTC`, `Z`, or a numeric `+HHMM`/`-HHMM` offset.
    static ref RFC1123_REGEX: Regex = Regex::new(
        r"(?x)^
        (?:(?P<weekday>Mon|Tue|Wed|Thu|Fri|Sat|Sun),\s*)?
        (?P<day>\d{1,2})\s+
        (?P<month>Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+
        (?P<year>\d{4})\s+
        (?P<hour>[01][0-9]|2[0-3]):
        (?P<minute>[0-5][0-9])
        (?::(?P<second>[0-5][0-9]|60))?\s+
        (?P<zone>GMT|UTC|UT|Z|[-+][0-9]{4})$").unwrap();

    static ref INVALID: ParseError = DateTime::<FixedOffset>::from_str("").unwrap_err();
}

/// Parse an RFC 1123 date (`Tue, 25 Apr 2017 14:30:00 GMT`), as sent in the `Date` and `X-SN-Date` headers.
pub trait ParseRfc1123<T> {
    /// Parse `s`, ignoring surrounding whitespace.
    fn parse_from_rfc1123(s: &str) -> ParseResult<T>;
}

impl ParseRfc1123<DateTime<Utc>> for DateTime<Utc> {
    fn parse_from_rfc1123(s: &str) -> ParseResult<DateTime<Utc>> {
        let Some(cap) = RFC1123_REGEX.captures(s.trim()) else {
            return Err(*INVALID);
        };

        // The regex guarantees each numeric group is all digits and small enough to parse.
        let num = |name: &str| cap.name(name).map(|m| u32::from_str(m.as_str()).unwrap_or(0));

        let day = num("day").unwrap_or(0);
        let year = num("year").unwrap_or(0) as i32;
        let month = match &cap["month"] {
            "Jan" => 1,
            "Feb" => 2,
            "Mar" => 3,
            "Apr" => 4,
            "May" => 5,
            "Jun" => 6,
            "Jul" => 7,
            "Aug" => 8,
            "Sep" => 9,
            "Oct" => 10,
            "Nov" => 11,
            _ => 12,
        };

        let naive_date = NaiveDate::from_ymd_opt(year, month, day).ok_or(*INVALID)?;

        if let Some(weekday) = cap.name("weekday") {
            let weekday = Weekday::from_str(weekday.as_str()).map_err(|_| *INVALID)?;
            if naive_date.weekday() != weekday {
                return Err(*INVALID);
            }
        }

        let hour = num("hour").unwrap_or(0);
        let minute = num("minute").unwrap_or(0);
        // Leap seconds are folded into the last second of the minute.
        let second = num("second").unwrap_or(0).min(59);
        let naive_time = NaiveTime::from_hms_opt(hour, minute, second).ok_or(*INVALID)?;

        let zone = &cap["zone"];
        let offset_secs = match zone {
            "GMT" | "UTC" | "UT" | "Z" => 0,
            _ => {
                let (sign_str, hm) = zone.split_at(1);
                let (hour_off_str, minute_off_str) = hm.split_at(2);
                let sign = if sign_str == "-" {
                    -1
                } else {
                    1
                };
                let hour = i32::from_str(hour_off_str).map_err(|_| *INVALID)?;
                let min = i32::from_str(minute_off_str).map_err(|_| *INVALID)?;
                sign * (hour * 3600 + min * 60)
            }
        };

        let offset = FixedOffset::east_opt(offset_secs).ok_or(*INVALID)?;
        let local = offset.from_local_datetime(&naive_date.and_time(naive_time)).single().ok_or(*INVALID)?;
        Ok(local.with_timezone(&Utc))
    }
}

/// Format a timestamp as an RFC 1123 HTTP date, e.g. `Tue, 15 Nov 1994 08:12:31 GMT`.
pub fn format_rfc1123(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(RFC1123_FORMAT).to_string()
}

/// Format a timestamp in the compact ISO 8601 form used by the SNWS2 string to sign, e.g. `20170425T143000Z`.
pub(crate) fn format_iso8601_compact(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(ISO8601_COMPACT_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use {
        super::{format_iso8601_compact, format_rfc1123, ParseRfc1123},
        chrono::{DateTime, Datelike, TimeZone, Timelike, Utc},
    };

    #[test_log::test]
    fn check_rfc1123_error_handling() {
        assert!(DateTime::<Utc>::parse_from_rfc1123("blatantly-wrong").is_err());
        assert!(DateTime::<Utc>::parse_from_rfc1123("").is_err());
        assert!(DateTime::<Utc>::parse_from_rfc1123("2017-04-25T14:30:00Z").is_err());
        // February 30th does not exist.
        assert!(DateTime::<Utc>::parse_from_rfc1123("30 Feb 2017 14:30:00 GMT").is_err());
        // 25 April 2017 was a Tuesday, not a Wednesday.
        assert!(DateTime::<Utc>::parse_from_rfc1123("Wed, 25 Apr 2017 14:30:00 GMT").is_err());
        assert!(DateTime::<Utc>::parse_from_rfc1123("Tue, 25 Apr 2017 24:30:00 GMT").is_err());
    }

    #[test_log::test]
    fn check_rfc1123_formats() {
        let dt = DateTime::<Utc>::parse_from_rfc1123("Tue, 25 Apr 2017 14:30:00 GMT").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2017, 4, 25));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (14, 30, 0));

        let dt2 = DateTime::<Utc>::parse_from_rfc1123("  25 Apr 2017 14:30:00 GMT ").unwrap();
        assert_eq!(dt, dt2);

        let dt3 = DateTime::<Utc>::parse_from_rfc1123("Tue, 25 Apr 2017 16:30:00 +0200").unwrap();
        assert_eq!(dt, dt3);

        let dt4 = DateTime::<Utc>::parse_from_rfc1123("Tue, 25 Apr 2017 09:00:00 -0530").unwrap();
        assert_eq!(dt, dt4);

        let dt5 = DateTime::<Utc>::parse_from_rfc1123("Tue, 5 Apr 2016 14:30 UTC").unwrap();
        assert_eq!((dt5.year(), dt5.month(), dt5.day()), (2016, 4, 5));
        assert_eq!(dt5.second(), 0);
    }

    #[test_log::test]
    fn check_formatting() {
        let dt = Utc.with_ymd_and_hms(2017, 4, 25, 14, 30, 0).unwrap();
        assert_eq!(format_rfc1123(&dt), "Tue, 25 Apr 2017 14:30:00 GMT");
        assert_eq!(format_iso8601_compact(&dt), "20170425T143000Z");
        assert_eq!(DateTime::<Utc>::parse_from_rfc1123(&format_rfc1123(&dt)).unwrap(), dt);
    }
}
