//! Request date selection and clock-skew validation.

use {
    crate::{
        chronoutil::ParseRfc1123,
        constants::{HDR_DATE, HDR_X_SN_DATE, MSG_AUTH_HEADER_REQ_DATE},
        SignatureError,
    },
    chrono::{DateTime, Utc},
    http::header::HeaderMap,
    log::trace,
    std::fmt::{Debug, Formatter, Result as FmtResult},
};

/// A source of the current time.
///
/// Date-skew checks are performed against a `Clock` rather than the system clock directly so they can be pinned in
/// tests. Any `Fn() -> DateTime<Utc>` is also a clock.
pub trait Clock {
    /// Return the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc>,
{
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

/// The header a request date was taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateHeader {
    /// The vendor `X-SN-Date` header.
    XSnDate,

    /// The standard HTTP `Date` header.
    Date,
}

impl DateHeader {
    /// The lower-case header name.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::XSnDate => HDR_X_SN_DATE,
            Self::Date => HDR_DATE,
        }
    }
}

/// The date of a request along with where it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestDate {
    timestamp: DateTime<Utc>,
    header: DateHeader,
    raw: String,
}

impl RequestDate {
    /// The parsed request timestamp.
    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The header that supplied the timestamp.
    #[inline]
    pub fn header(&self) -> DateHeader {
        self.header
    }

    /// The header value exactly as it was sent. SNWS1 signs this value rather than a reformatted date.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Debug for RequestDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RequestDate")
            .field("timestamp", &self.timestamp)
            .field("header", &self.header.header_name())
            .field("raw", &self.raw)
            .finish()
    }
}

/// Parse an RFC 1123 HTTP date header value.
pub fn parse_http_date(value: &str) -> Result<DateTime<Utc>, SignatureError> {
    DateTime::<Utc>::parse_from_rfc1123(value).map_err(|_| {
        SignatureError::MissingOrInvalidDate(format!("Date must be in RFC 1123 format. Got '{}'.", value))
    })
}

/// Select and parse the request date from the headers.
///
/// `X-SN-Date` takes precedence over `Date`. If the preferred header is present but unparseable, this fails rather
/// than falling back to `Date`.
pub fn request_date(headers: &HeaderMap) -> Result<RequestDate, SignatureError> {
    let (header, value) = if let Some(value) = headers.get(HDR_X_SN_DATE) {
        (DateHeader::XSnDate, value)
    } else if let Some(value) = headers.get(HDR_DATE) {
        (DateHeader::Date, value)
    } else {
        trace!("request_date: neither x-sn-date nor date header present");
        return Err(SignatureError::MissingOrInvalidDate(MSG_AUTH_HEADER_REQ_DATE.to_string()));
    };

    let raw = value.to_str().map_err(|_| {
        SignatureError::MissingOrInvalidDate(format!("{} header is not a valid ASCII string.", header.header_name()))
    })?;
    let timestamp = parse_http_date(raw)?;

    Ok(RequestDate {
        timestamp,
        header,
        raw: raw.to_string(),
    })
}

/// Returns true if the request timestamp is within `max_skew_millis` milliseconds of `now`, in either direction.
pub fn is_within_skew(request_timestamp: DateTime<Utc>, now: DateTime<Utc>, max_skew_millis: i64) -> bool {
    let diff = now.signed_duration_since(request_timestamp).num_milliseconds();
    diff.checked_abs().is_some_and(|diff| diff <= max_skew_millis)
}

#[cfg(test)]
mod tests {
    use {
        super::{is_within_skew, request_date, Clock, DateHeader, FixedClock, SystemClock},
        crate::SignatureError,
        chrono::{Duration, TimeZone, Utc},
        http::header::{HeaderMap, HeaderValue},
    };

    #[test_log::test]
    fn test_skew_boundaries() {
        let ts = Utc.with_ymd_and_hms(2017, 4, 25, 14, 30, 0).unwrap();

        assert!(is_within_skew(ts, ts, 900_000));
        assert!(is_within_skew(ts, ts + Duration::milliseconds(899_999), 900_000));
        assert!(is_within_skew(ts, ts - Duration::milliseconds(899_999), 900_000));
        assert!(is_within_skew(ts, ts + Duration::milliseconds(900_000), 900_000));
        assert!(!is_within_skew(ts, ts + Duration::milliseconds(900_001), 900_000));
        assert!(!is_within_skew(ts, ts + Duration::minutes(16), 900_000));
        assert!(!is_within_skew(ts, ts - Duration::minutes(16), 900_000));
    }

    #[test_log::test]
    fn test_date_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("Date", HeaderValue::from_static("Tue, 25 Apr 2017 14:30:00 GMT"));
        let rd = request_date(&headers).unwrap();
        assert_eq!(rd.header(), DateHeader::Date);
        assert_eq!(rd.timestamp(), Utc.with_ymd_and_hms(2017, 4, 25, 14, 30, 0).unwrap());

        headers.insert("X-SN-Date", HeaderValue::from_static("Wed, 26 Apr 2017 09:00:00 GMT"));
        let rd = request_date(&headers).unwrap();
        assert_eq!(rd.header(), DateHeader::XSnDate);
        assert_eq!(rd.header().header_name(), "x-sn-date");
        assert_eq!(rd.raw(), "Wed, 26 Apr 2017 09:00:00 GMT");
        assert_eq!(rd.timestamp(), Utc.with_ymd_and_hms(2017, 4, 26, 9, 0, 0).unwrap());
        let _ = format!("{:?}", rd);
    }

    #[test_log::test]
    fn test_missing_or_invalid() {
        let headers = HeaderMap::new();
        let e = request_date(&headers).unwrap_err();
        assert!(matches!(e, SignatureError::MissingOrInvalidDate(_)));
        assert_eq!(
            e.to_string(),
            "Authorization header requires existence of either a 'X-SN-Date' or a 'Date' header."
        );

        // A bad X-SN-Date is not rescued by a good Date.
        let mut headers = HeaderMap::new();
        headers.insert("Date", HeaderValue::from_static("Tue, 25 Apr 2017 14:30:00 GMT"));
        headers.insert("X-SN-Date", HeaderValue::from_static("20170425T143000Z"));
        let e = request_date(&headers).unwrap_err();
        assert!(matches!(e, SignatureError::MissingOrInvalidDate(_)));
        assert_eq!(e.to_string(), "Date must be in RFC 1123 format. Got '20170425T143000Z'.");
    }

    #[test_log::test]
    fn test_clocks() {
        let ts = Utc.with_ymd_and_hms(2017, 4, 25, 14, 30, 0).unwrap();
        assert_eq!(FixedClock(ts).now(), ts);
        assert_eq!((move || ts).now(), ts);
        assert!(SystemClock.now() > ts);
    }
}
