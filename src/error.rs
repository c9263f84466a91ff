use {
    crate::constants::*,
    http::status::StatusCode,
    scratchstack_errors::ServiceError,
    std::{
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
        io::Error as IOError,
    },
};

/// Error returned when an attempt at validating an SNWS signature fails.
///
/// None of these errors ever carry the token secret or a key derived from it.
#[derive(Debug)]
#[non_exhaustive]
pub enum SignatureError {
    /// The declared `Content-MD5` or `Digest` value does not match the request body.
    ContentDigestMismatch(/* message */ String),

    /// The request body exceeded the configured buffer capacity, so it could not be digested.
    ContentTooLarge(/* message */ String),

    /// The request date is present and valid, but too far from the server's clock. Sample messages:
    /// `Request date expired: 20210502T144040Z is now earlier than 20210502T173143Z (20210502T174643Z - 15 min.)`
    /// `Request date not yet current: 20210502T183640Z is still later than 20210502T175140Z (20210502T173640Z + 15 min.)`
    DateSkewExceeded(/* message */ String),

    /// Validation failed due to an underlying I/O error.
    IO(IOError),

    /// Validation failed due to an internal service error.
    InternalServiceError(Box<dyn Error + Send + Sync>),

    /// The token identifier provided does not exist in our records.
    InvalidTokenId(/* message */ String),

    /// The `Authorization` header is absent, uses an unsupported scheme, or is missing required parameters. Sample
    /// messages:
    /// `Authorization header requires 'Credential' parameter. Authorization=SNWS2`
    /// `Unsupported authorization scheme: 'Bearer'.`
    MalformedAuthorization(/* message */ String),

    /// A query parameter was malformed -- e.g. it contains an incomplete or illegal percent escape.
    ///
    /// `Incomplete trailing escape % sequence`
    MalformedQueryString(/* message */ String),

    /// Neither an `X-SN-Date` nor a `Date` header is present, or the selected header is not an RFC 1123 date.
    MissingOrInvalidDate(/* message */ String),

    /// Signature did not match the calculated signature value.
    SignatureMismatch(/* message */ String),
}

impl SignatureError {
    /// Returns the short error code for this error, suitable for an API error response.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ContentDigestMismatch(_) => ERR_CODE_CONTENT_DIGEST_MISMATCH,
            Self::ContentTooLarge(_) => ERR_CODE_CONTENT_TOO_LARGE,
            Self::DateSkewExceeded(_) => ERR_CODE_DATE_SKEW_EXCEEDED,
            Self::IO(_) | Self::InternalServiceError(_) => ERR_CODE_INTERNAL_FAILURE,
            Self::InvalidTokenId(_) => ERR_CODE_INVALID_TOKEN_ID,
            Self::MalformedAuthorization(_) => ERR_CODE_MALFORMED_AUTHORIZATION,
            Self::MalformedQueryString(_) => ERR_CODE_MALFORMED_QUERY_STRING,
            Self::MissingOrInvalidDate(_) => ERR_CODE_MISSING_OR_INVALID_DATE,
            Self::SignatureMismatch(_) => ERR_CODE_SIGNATURE_MISMATCH,
        }
    }

    /// Returns the HTTP status code that best describes this error.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::ContentDigestMismatch(_)
            | Self::MalformedAuthorization(_)
            | Self::MalformedQueryString(_)
            | Self::MissingOrInvalidDate(_) => StatusCode::BAD_REQUEST,
            Self::ContentTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::IO(_) | Self::InternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FORBIDDEN,
        }
    }
}

impl ServiceError for SignatureError {
    fn error_code(&self) -> &'static str {
        SignatureError::error_code(self)
    }

    fn http_status(&self) -> StatusCode {
        SignatureError::http_status(self)
    }
}

impl Display for SignatureError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::ContentDigestMismatch(msg) => f.write_str(msg),
            Self::ContentTooLarge(msg) => f.write_str(msg),
            Self::DateSkewExceeded(msg) => f.write_str(msg),
            Self::IO(ref e) => Display::fmt(e, f),
            Self::InternalServiceError(ref e) => Display::fmt(e, f),
            Self::InvalidTokenId(msg) => f.write_str(msg),
            Self::MalformedAuthorization(msg) => f.write_str(msg),
            Self::MalformedQueryString(msg) => f.write_str(msg),
            Self::MissingOrInvalidDate(msg) => f.write_str(msg),
            Self::SignatureMismatch(msg) => f.write_str(msg),
        }
    }
}

impl Error for SignatureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IO(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<IOError> for SignatureError {
    fn from(e: IOError) -> SignatureError {
        SignatureError::IO(e)
    }
}

impl From<Box<dyn Error + Send + Sync>> for SignatureError {
    fn from(e: Box<dyn Error + Send + Sync>) -> SignatureError {
        match e.downcast::<SignatureError>() {
            Ok(sig_err) => *sig_err,
            Err(e) => SignatureError::InternalServiceError(e),
        }
    }
}
