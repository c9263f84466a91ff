//! Common constants used throughout the crate.
//!
//! This was consolidated here so the entire crate is on the same page about these constant values. If a value
//! is spelled incorrectly, at least it can be fixed in one spot.
//!
//! Tests that are testing the content of an error code or message should not use these constants;
//! they should use hard-coded strings so the tests are also testing for misspellings.
//!
//! Please keep this file organized alphabetically. (This can be a bit hard with comments, etc.)

/// Default allowed timestamp mismatch in minutes.
pub(crate) const ALLOWED_MISMATCH_MINUTES: i64 = 15;

/// Default maximum number of request body bytes buffered for digest computation.
pub(crate) const DEFAULT_MAX_BODY_SIZE: usize = 65535;

/// Digest algorithm token for SHA-256 in the `Digest` header (compared case-insensitively).
pub(crate) const DIGEST_ALG_SHA256: &str = "sha-256";

/// Error code: ContentDigestMismatch
pub(crate) const ERR_CODE_CONTENT_DIGEST_MISMATCH: &str = "ContentDigestMismatch";

/// Error code: ContentTooLarge
pub(crate) const ERR_CODE_CONTENT_TOO_LARGE: &str = "ContentTooLarge";

/// Error code: DateSkewExceeded
pub(crate) const ERR_CODE_DATE_SKEW_EXCEEDED: &str = "DateSkewExceeded";

/// Error code: InternalFailure
pub(crate) const ERR_CODE_INTERNAL_FAILURE: &str = "InternalFailure";

/// Error code: InvalidTokenId
pub(crate) const ERR_CODE_INVALID_TOKEN_ID: &str = "InvalidTokenId";

/// Error code: MalformedAuthorization
pub(crate) const ERR_CODE_MALFORMED_AUTHORIZATION: &str = "MalformedAuthorization";

/// Error code: MalformedQueryString
pub(crate) const ERR_CODE_MALFORMED_QUERY_STRING: &str = "MalformedQueryString";

/// Error code: MissingOrInvalidDate
pub(crate) const ERR_CODE_MISSING_OR_INVALID_DATE: &str = "MissingOrInvalidDate";

/// Error code: SignatureMismatch
pub(crate) const ERR_CODE_SIGNATURE_MISMATCH: &str = "SignatureMismatch";

/// Header for `authorization`
pub(crate) const HDR_AUTHORIZATION: &str = "authorization";

/// Header for `content-md5`
pub(crate) const HDR_CONTENT_MD5: &str = "content-md5";

/// Header for `content-type`
pub(crate) const HDR_CONTENT_TYPE: &str = "content-type";

/// Header for `date`
pub(crate) const HDR_DATE: &str = "date";

/// Header for `digest`
pub(crate) const HDR_DIGEST: &str = "digest";

/// Header for `host`
pub(crate) const HDR_HOST: &str = "host";

/// Header for delivering the alternate date
pub(crate) const HDR_X_SN_DATE: &str = "x-sn-date";

/// Uppercase hex digits.
pub(crate) const HEX_DIGITS_UPPER: [u8; 16] =
    [b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'A', b'B', b'C', b'D', b'E', b'F'];

/// Compact ISO8601 format used for the string to sign.
pub(crate) const ISO8601_COMPACT_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Short date format used for signing key scope dates.
pub(crate) const ISO8601_DATE_FORMAT: &str = "%Y%m%d";

/// Length of an ISO8601 date string in the UTC time zone.
pub(crate) const ISO8601_UTC_LENGTH: usize = 16;

/// Length of an MD5 hex string.
pub(crate) const MD5_HEX_LENGTH: usize = 32;

/// The length of an MD5 digest in bytes.
pub(crate) const MD5_OUTPUT_LEN: usize = 16;

/// Error message: `"Authorization header requires 'Credential' parameter."`
pub(crate) const MSG_AUTH_HEADER_REQ_CREDENTIAL: &str = "Authorization header requires 'Credential' parameter.";

/// Error message: `"Authorization header requires existence of either a 'X-SN-Date' or a 'Date' header."`
pub(crate) const MSG_AUTH_HEADER_REQ_DATE: &str =
    "Authorization header requires existence of either a 'X-SN-Date' or a 'Date' header.";

/// Error message: `"Authorization header requires 'Signature' parameter."`
pub(crate) const MSG_AUTH_HEADER_REQ_SIGNATURE: &str = "Authorization header requires 'Signature' parameter.";

/// Error message: `"Authorization header requires 'SignedHeaders' parameter."`
pub(crate) const MSG_AUTH_HEADER_REQ_SIGNED_HEADERS: &str = "Authorization header requires 'SignedHeaders' parameter.";

/// Error message: `"The request body exceeds the maximum size that can be verified."`
pub(crate) const MSG_CONTENT_TOO_LARGE: &str = "The request body exceeds the maximum size that can be verified.";

/// Error message: `"'Host' must be a 'SignedHeader' in the SNWS2 Authorization."`
pub(crate) const MSG_HOST_MUST_BE_SIGNED: &str = "'Host' must be a 'SignedHeader' in the SNWS2 Authorization.";

/// Error message: `"Illegal hex character in escape % pattern: %"`
pub(crate) const MSG_ILLEGAL_HEX_CHAR: &str = "Illegal hex character in escape % pattern: %";

/// Error message: `"Incomplete trailing escape % sequence"`
pub(crate) const MSG_INCOMPLETE_TRAILING_ESCAPE: &str = "Incomplete trailing escape % sequence";

/// Error message: `"Request is missing the Authorization header."`
pub(crate) const MSG_REQUEST_MISSING_AUTHORIZATION: &str = "Request is missing the Authorization header.";

/// Error message: `"The request signature we calculated does not match the signature you provided."`
pub(crate) const MSG_REQUEST_SIGNATURE_MISMATCH: &str =
    "The request signature we calculated does not match the signature you provided. Check your token secret \
     and signing method.";

/// Error message: `"Unsupported authorization scheme: "`
pub(crate) const MSG_UNSUPPORTED_SCHEME: &str = "Unsupported authorization scheme: ";

/// SHA-256 of an empty string.
pub(crate) const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Length of a SHA-256 hex string.
pub(crate) const SHA256_HEX_LENGTH: usize = SHA256_EMPTY.len();

/// The length of a SHA-256 digest in bytes.
pub(crate) const SHA256_OUTPUT_LEN: usize = 32;

/// Number of days, beyond the request date itself, that an SNWS2 signing key remains valid.
pub(crate) const SIGNING_KEY_VALIDITY_DAYS: u32 = 7;

/// Authorization header parameter for the token identifier
pub(crate) const SNWS2_CREDENTIAL: &str = "Credential";

/// Algorithm line of the SNWS2 string to sign
pub(crate) const SNWS2_HMAC_SHA256: &str = "SNWS2-HMAC-SHA256";

/// Prefix applied to the raw secret before deriving the SNWS2 date key
pub(crate) const SNWS2_KEY_PREFIX: &[u8] = b"SNWS2";

/// String included at the end of the SNWS2 signing key derivation
pub(crate) const SNWS2_REQUEST: &str = "snws2_request";

/// Authorization header parameter for the signature itself
pub(crate) const SNWS2_SIGNATURE: &str = "Signature";

/// Authorization header parameter specifying the signed headers
pub(crate) const SNWS2_SIGNED_HEADERS: &str = "SignedHeaders";

/// Scheme token for SNWS version 1 authorization headers
pub(crate) const SNWS_SCHEME_V1: &str = "SNWS1";

/// Scheme token for SNWS version 2 authorization headers
pub(crate) const SNWS_SCHEME_V2: &str = "SNWS2";
