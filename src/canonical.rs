//! Canonicalization functionality for signature generation and validation.
//!
//! This includes query-string decoding and RFC 3986 encoding, header canonicalization, and the ability to create the
//! SNWS2 canonical request and the SNWS1 string to sign.
//!
//! **Stability of this module is not guaranteed except for items exposed at the crate root**.
//! The functions and types are subject to change in minor/patch versions. This is exposed for
//! testing purposes only.

use {
    crate::{
        chronoutil::format_iso8601_compact,
        constants::{
            HDR_CONTENT_MD5, HDR_CONTENT_TYPE, HEX_DIGITS_UPPER, ISO8601_UTC_LENGTH, MSG_ILLEGAL_HEX_CHAR,
            MSG_INCOMPLETE_TRAILING_ESCAPE, SHA256_EMPTY, SHA256_HEX_LENGTH, SHA256_OUTPUT_LEN, SNWS2_HMAC_SHA256,
        },
        crypto::{sha256, sha256_hex},
        date::{request_date, RequestDate},
        BufferedBody, SignatureError,
    },
    http::{
        header::HeaderMap,
        method::Method,
        request::{Parts, Request},
        uri::Uri,
    },
    log::trace,
    qualifier_attr::qualifiers,
    std::fmt::{Debug, Formatter, Result as FmtResult},
};

/// The signable view of one HTTP request.
///
/// This is mainly used internally for generating the canonical request for signing, but is
/// exposed for testing and debugging purposes.
///
/// **The stability of this struct is not guaranteed.** The fields and methods are subject to
/// change in minor/patch versions.
#[derive(Clone)]
pub struct SigningContext {
    /// The HTTP method for the request (e.g., "GET", "POST", etc.)
    method: String,

    /// The request path, exactly as received.
    path: String,

    /// Decoded query parameters, in the order they appeared in the URL.
    query_params: Vec<(String, String)>,

    /// Headers from the HTTP request. Lookups are case-insensitive.
    headers: HeaderMap,

    /// The buffered request body.
    body: BufferedBody,

    /// The SHA-256 hash of the body, or `None` if the body exceeded the buffer capacity.
    body_sha256: Option<[u8; SHA256_OUTPUT_LEN]>,
}

impl SigningContext {
    /// Create a `SigningContext` from an HTTP request [Parts] and an optional buffered body.
    pub fn from_request_parts(parts: &Parts, body: Option<&BufferedBody>) -> Result<Self, SignatureError> {
        Self::from_components(&parts.method, &parts.uri, &parts.headers, body)
    }

    /// Create a `SigningContext` from an HTTP [Request] whose body has been buffered separately.
    pub fn from_request<B>(request: &Request<B>, body: Option<&BufferedBody>) -> Result<Self, SignatureError> {
        Self::from_components(request.method(), request.uri(), request.headers(), body)
    }

    fn from_components(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Option<&BufferedBody>,
    ) -> Result<Self, SignatureError> {
        let query_params = query_string_to_params(uri.query().unwrap_or(""))?;
        let body = body.cloned().unwrap_or_else(|| BufferedBody::empty(0));
        let body_sha256 = if body.is_overflowed() {
            None
        } else {
            Some(sha256(body.as_slice()))
        };

        Ok(Self {
            method: method.to_string(),
            path: uri.path().to_string(),
            query_params,
            headers: headers.clone(),
            body,
            body_sha256,
        })
    }

    /// Retrieve the HTTP request method.
    #[inline(always)]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Retrieve the request path.
    #[inline(always)]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Retrieve the decoded query parameters, in the order they appeared in the URL.
    #[inline(always)]
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// Retrieve the request headers.
    #[inline(always)]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Retrieve the buffered request body.
    #[inline(always)]
    pub fn body(&self) -> &BufferedBody {
        &self.body
    }

    /// Select and parse the request date. `X-SN-Date` takes precedence over `Date`.
    #[inline]
    pub fn request_date(&self) -> Result<RequestDate, SignatureError> {
        request_date(&self.headers)
    }

    /// Retrieve the lowercase hex SHA-256 of the request body. An empty body yields the SHA-256 of the empty string.
    #[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
    #[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
    fn body_sha256_hex(&self) -> Result<String, SignatureError> {
        if self.body.is_empty() && !self.body.is_overflowed() {
            return Ok(SHA256_EMPTY.to_string());
        }

        match self.body_sha256 {
            Some(digest) => Ok(hex::encode(digest)),
            None => self.body.complete_bytes().map(sha256_hex),
        }
    }

    /// Get the canonical query string from the request.
    #[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
    #[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
    fn canonical_query_string(&self) -> String {
        canonicalize_query_to_string(&self.query_params)
    }

    /// The first value of a header, with surrounding whitespace removed. Absent headers yield an empty value.
    #[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
    #[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
    fn header_value(&self, name: &str) -> &[u8] {
        self.headers.get(name).map(|value| value.as_bytes().trim_ascii()).unwrap_or_default()
    }

    /// Get the SNWS2 canonical request for the given signed headers.
    ///
    /// `signed_headers` must already be lower-cased and sorted. This fails only if the body exceeded the buffer
    /// capacity, since its hash is then unknown.
    pub fn canonical_request(&self, signed_headers: &[String]) -> Result<Vec<u8>, SignatureError> {
        let body_sha256 = self.body_sha256_hex()?;

        let mut result = Vec::with_capacity(1024);
        result.extend(self.method.as_bytes());
        result.push(b'\n');
        result.extend(self.path.as_bytes());
        result.push(b'\n');
        result.extend(self.canonical_query_string().as_bytes());
        result.push(b'\n');

        for header in signed_headers {
            result.extend(header.as_bytes());
            result.push(b':');
            result.extend(self.header_value(header));
            result.push(b'\n');
        }

        result.extend(signed_headers.join(";").as_bytes());
        result.push(b'\n');
        result.extend(body_sha256.as_bytes());

        trace!("Canonical request:\n{}", String::from_utf8_lossy(&result));

        Ok(result)
    }

    /// Get the SHA-256 hash of the canonical request.
    pub fn canonical_request_sha256(
        &self,
        signed_headers: &[String],
    ) -> Result<[u8; SHA256_OUTPUT_LEN], SignatureError> {
        Ok(sha256(&self.canonical_request(signed_headers)?))
    }

    /// Get the SNWS2 string to sign: the algorithm, the compact ISO 8601 request timestamp, and the hex SHA-256 of
    /// the canonical request, joined by newlines.
    pub fn v2_string_to_sign(&self, date: &RequestDate, signed_headers: &[String]) -> Result<Vec<u8>, SignatureError> {
        let hashed_canonical_request = hex::encode(self.canonical_request_sha256(signed_headers)?);

        let mut result = Vec::with_capacity(SNWS2_HMAC_SHA256.len() + 1 + ISO8601_UTC_LENGTH + 1 + SHA256_HEX_LENGTH);
        result.extend(SNWS2_HMAC_SHA256.as_bytes());
        result.push(b'\n');
        result.extend(format_iso8601_compact(&date.timestamp()).as_bytes());
        result.push(b'\n');
        result.extend(hashed_canonical_request.as_bytes());

        trace!("SNWS2 string to sign:\n{}", String::from_utf8_lossy(&result));
        Ok(result)
    }

    /// Get the SNWS1 string to sign for the given request date.
    ///
    /// The date is the header value exactly as sent. Query parameters are appended unescaped, sorted by key, only if
    /// any are present.
    pub fn v1_string_to_sign(&self, date: &RequestDate) -> Vec<u8> {
        let mut result = Vec::with_capacity(256);
        result.extend(self.method.as_bytes());
        result.push(b'\n');
        result.extend(self.header_value(HDR_CONTENT_MD5));
        result.push(b'\n');
        result.extend(self.header_value(HDR_CONTENT_TYPE));
        result.push(b'\n');
        result.extend(date.raw().as_bytes());
        result.push(b'\n');
        result.extend(self.path.as_bytes());

        if !self.query_params.is_empty() {
            let mut params: Vec<&(String, String)> = self.query_params.iter().collect();
            params.sort();
            let joined = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&");
            result.push(b'?');
            result.extend(joined.as_bytes());
        }

        trace!("SNWS1 string to sign:\n{}", String::from_utf8_lossy(&result));
        result
    }
}

impl Debug for SigningContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SigningContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query_params", &self.query_params)
            .field("headers", &debug_headers(&self.headers))
            .field("body", &self.body)
            .finish()
    }
}

/// Convert decoded query parameters to a string for the canonical request.
///
/// Keys and values are RFC 3986 encoded, then the pairs are sorted by key and by value for duplicate keys, so the
/// result does not depend on input order.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn canonicalize_query_to_string(query_params: &[(String, String)]) -> String {
    let mut results: Vec<(String, String)> =
        query_params.iter().map(|(key, value)| (percent_encode(key), percent_encode(value))).collect();
    results.sort_unstable();
    results.into_iter().map(|(key, value)| format!("{}={}", key, value)).collect::<Vec<_>>().join("&")
}

/// Formats HTTP headers suitable for debugging.
fn debug_headers(headers: &HeaderMap) -> String {
    let mut result = Vec::new();
    for (key, value) in headers.iter() {
        match value.to_str() {
            Ok(s) => result.push(format!("{}: {}", key, s)),
            Err(_) => result.push(format!("{}: {:?}", key, value.as_bytes())),
        }
    }

    result.join("\n")
}

/// Indicates whether the specified byte is RFC3986 unreserved -- i.e., can be represented without being
/// percent-encoded, e.g. '?' -> '%3F'.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
#[inline(always)]
fn is_rfc3986_unreserved(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'.' || c == b'_' || c == b'~'
}

/// Percent-encode a string according to RFC 3986. Unreserved characters are left alone; every other byte of the UTF-8
/// encoding is written as `%XX` with upper-case hex digits.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn percent_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.bytes() {
        if is_rfc3986_unreserved(c) {
            result.push(c as char);
        } else {
            let [hi, lo] = u8_to_upper_hex(c);
            result.push('%');
            result.push(hi as char);
            result.push(lo as char);
        }
    }
    result
}

/// Decode a percent-encoded query string element. `+` is decoded as a space.
///
/// Incomplete or non-hex escapes, and escapes that decode to invalid UTF-8, yield
/// [`SignatureError::MalformedQueryString`].
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn percent_decode(element: &str) -> Result<String, SignatureError> {
    let bytes = element.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                if i + 2 >= bytes.len() {
                    // % encoding would go beyond end of string.
                    return Err(SignatureError::MalformedQueryString(MSG_INCOMPLETE_TRAILING_ESCAPE.to_string()));
                }

                let hex_digits = &bytes[i + 1..i + 3];
                match hex::decode(hex_digits) {
                    Ok(value) => result.push(value[0]),
                    Err(_) => {
                        return Err(SignatureError::MalformedQueryString(format!(
                            "{}{}{}",
                            MSG_ILLEGAL_HEX_CHAR, hex_digits[0] as char, hex_digits[1] as char
                        )))
                    }
                }
                i += 3;
            }
            b'+' => {
                result.push(b' ');
                i += 1;
            }
            c => {
                result.push(c);
                i += 1;
            }
        }
    }

    String::from_utf8(result).map_err(|_| {
        SignatureError::MalformedQueryString(format!("Query string element is not valid UTF-8: {}", element))
    })
}

/// Decode a raw query string into an ordered list of key/value pairs. Keys may repeat; empty components are skipped,
/// and a component with no `=` has an empty value.
pub fn query_string_to_params(query_string: &str) -> Result<Vec<(String, String)>, SignatureError> {
    let mut result = Vec::new();

    for component in query_string.split('&') {
        if component.is_empty() {
            continue;
        }

        let (key, value) = component.split_once('=').unwrap_or((component, ""));
        result.push((percent_decode(key)?, percent_decode(value)?));
    }

    Ok(result)
}

/// Convert a byte to uppercase hex representation.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
#[inline(always)]
const fn u8_to_upper_hex(b: u8) -> [u8; 2] {
    [HEX_DIGITS_UPPER[((b >> 4) & 0xf) as usize], HEX_DIGITS_UPPER[(b & 0xf) as usize]]
}
