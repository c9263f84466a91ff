//! SNWS `Authorization` header parsing and signature computation.
//!
//! This implements the server side of the SNWS1 (HMAC-SHA1) and SNWS2 (HMAC-SHA256 with date-scoped signing keys)
//! request signing schemes. Comparing the computed signature against the provided one is left to the caller (or to
//! [`snws_validate_request`][crate::snws_validate_request]).
//!
//! **Stability of this module is not guaranteed except for items exposed at the crate root**.
//! The functions and types are subject to change in minor/patch versions. This is exposed for
//! testing purposes only.

use {
    crate::{
        canonical::SigningContext,
        chronoutil::format_iso8601_compact,
        constants::{
            HDR_HOST, MSG_AUTH_HEADER_REQ_CREDENTIAL, MSG_AUTH_HEADER_REQ_SIGNATURE, MSG_AUTH_HEADER_REQ_SIGNED_HEADERS,
            MSG_HOST_MUST_BE_SIGNED, MSG_UNSUPPORTED_SCHEME, SIGNING_KEY_VALIDITY_DAYS, SNWS2_CREDENTIAL,
            SNWS2_SIGNATURE, SNWS2_SIGNED_HEADERS, SNWS_SCHEME_V1, SNWS_SCHEME_V2,
        },
        content_digest,
        date::{is_within_skew, Clock, RequestDate},
        Secret, SignatureError,
    },
    chrono::{DateTime, Days, Duration, Utc},
    derive_builder::Builder,
    log::{debug, trace},
    qualifier_attr::qualifiers,
    std::fmt::{Debug, Display, Formatter, Result as FmtResult},
    subtle::ConstantTimeEq,
};

/// The SNWS protocol version named by an `Authorization` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemeKind {
    /// `SNWS1`: HMAC-SHA1, Base64 signature.
    V1,

    /// `SNWS2`: HMAC-SHA256 with date-scoped signing keys, hex signature.
    V2,
}

impl SchemeKind {
    /// The scheme token as it appears in the `Authorization` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => SNWS_SCHEME_V1,
            Self::V2 => SNWS_SCHEME_V2,
        }
    }
}

impl Display for SchemeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// The parsed scheme of an `Authorization` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthScheme {
    /// `SNWS1 <tokenId>:<signature>`
    V1,

    /// `SNWS2 Credential=<tokenId>,SignedHeaders=<names>,Signature=<hex>`
    V2 {
        /// The signed header names: lower-cased, sorted, and de-duplicated.
        signed_headers: Vec<String>,
    },
}

impl AuthScheme {
    /// Determine whether an `Authorization` header value uses an SNWS scheme.
    ///
    /// Returns `None` if the leading token is not exactly `SNWS1` or `SNWS2`, in which case the header belongs to
    /// some other authentication mechanism.
    pub fn detect(header: &str) -> Option<SchemeKind> {
        match split_scheme(header).0 {
            SNWS_SCHEME_V1 => Some(SchemeKind::V1),
            SNWS_SCHEME_V2 => Some(SchemeKind::V2),
            _ => None,
        }
    }

    /// The protocol version of this scheme.
    pub fn kind(&self) -> SchemeKind {
        match self {
            Self::V1 => SchemeKind::V1,
            Self::V2 {
                ..
            } => SchemeKind::V2,
        }
    }

    /// The signed header names. SNWS1 does not sign arbitrary headers, so this is empty for it.
    pub fn signed_headers(&self) -> &[String] {
        match self {
            Self::V1 => &[],
            Self::V2 {
                signed_headers,
            } => signed_headers,
        }
    }
}

/// The fields of an SNWS `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct ParsedAuthorization {
    scheme: AuthScheme,
    token_id: String,
    signature: String,
}

impl ParsedAuthorization {
    /// The scheme, including the signed headers for SNWS2.
    #[inline]
    pub fn scheme(&self) -> &AuthScheme {
        &self.scheme
    }

    /// The token identifier the request claims to be signed by.
    #[inline]
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// The signature provided by the client. SNWS2 signatures are normalized to lower case.
    #[inline]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl Debug for ParsedAuthorization {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ParsedAuthorization")
            .field("scheme", &self.scheme)
            .field("token_id", &self.token_id)
            .field("signature", &self.signature)
            .finish()
    }
}

/// Split an `Authorization` header into its scheme token and the remaining parameters.
fn split_scheme(header: &str) -> (&str, &str) {
    let header = header.trim_start();
    match header.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&header[..pos], header[pos..].trim()),
        None => (header.trim_end(), ""),
    }
}

fn parse_v1(header: &str, params: &str) -> Result<ParsedAuthorization, SignatureError> {
    match params.split_once(':') {
        Some((token_id, signature)) if !token_id.is_empty() && !signature.is_empty() => Ok(ParsedAuthorization {
            scheme: AuthScheme::V1,
            token_id: token_id.to_string(),
            signature: signature.to_string(),
        }),
        _ => {
            debug!("parse_v1: malformed SNWS1 parameters");
            Err(SignatureError::MalformedAuthorization(format!(
                "Authorization header must be in the form 'SNWS1 <tokenId>:<signature>'. Authorization={}",
                split_scheme(header).0
            )))
        }
    }
}

fn parse_v2(header: &str, params: &str) -> Result<ParsedAuthorization, SignatureError> {
    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;

    for entry in params.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let Some((key, value)) = entry.split_once('=') else {
            trace!("parse_v2: parameter without '=': {:?}", entry);
            return Err(SignatureError::MalformedAuthorization(format!(
                "Authorization header parameter must be in the form key=value, not '{}'.",
                entry
            )));
        };

        // Later duplicates replace earlier ones; unrecognized keys are ignored.
        match key.trim() {
            SNWS2_CREDENTIAL => credential = Some(value.trim()),
            SNWS2_SIGNED_HEADERS => signed_headers = Some(value.trim()),
            SNWS2_SIGNATURE => signature = Some(value.trim()),
            other => trace!("parse_v2: ignoring unknown parameter {:?}", other),
        }
    }

    let credential = credential.filter(|s| !s.is_empty());
    let signature = signature.filter(|s| !s.is_empty());
    let mut signed_headers: Vec<String> = signed_headers
        .unwrap_or_default()
        .split(';')
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    signed_headers.sort();
    signed_headers.dedup();

    let mut missing_messages = Vec::new();
    if credential.is_none() {
        missing_messages.push(MSG_AUTH_HEADER_REQ_CREDENTIAL);
    }

    if signed_headers.is_empty() {
        missing_messages.push(MSG_AUTH_HEADER_REQ_SIGNED_HEADERS);
    }

    if signature.is_none() {
        missing_messages.push(MSG_AUTH_HEADER_REQ_SIGNATURE);
    }

    match (credential, signature) {
        (Some(credential), Some(signature)) if missing_messages.is_empty() => {
            if !signature.bytes().all(|c| c.is_ascii_hexdigit()) {
                return Err(SignatureError::MalformedAuthorization(
                    "Authorization header 'Signature' parameter must be a hex string.".to_string(),
                ));
            }

            Ok(ParsedAuthorization {
                scheme: AuthScheme::V2 {
                    signed_headers,
                },
                token_id: credential.to_string(),
                signature: signature.to_ascii_lowercase(),
            })
        }
        _ => {
            debug!("parse_v2: missing parameters: {:?}", missing_messages);
            Err(SignatureError::MalformedAuthorization(format!(
                "{} Authorization={}",
                missing_messages.join(" "),
                split_scheme(header).0
            )))
        }
    }
}

/// Make sure the signed headers cover `host` and the date header, and that every signed header was sent.
fn check_signed_headers(
    signed_headers: &[String],
    context: &SigningContext,
    date: &RequestDate,
) -> Result<(), SignatureError> {
    if !signed_headers.iter().any(|name| name == HDR_HOST) {
        return Err(SignatureError::MalformedAuthorization(MSG_HOST_MUST_BE_SIGNED.to_string()));
    }

    let date_header = date.header().header_name();
    if !signed_headers.iter().any(|name| name == date_header) {
        return Err(SignatureError::MalformedAuthorization(format!(
            "'{}' must be a signed header when it supplies the request date.",
            date_header
        )));
    }

    if let Some(absent) = signed_headers.iter().find(|name| !context.headers().contains_key(name.as_str())) {
        return Err(SignatureError::MalformedAuthorization(format!(
            "Header '{}' is signed but not present in the request.",
            absent
        )));
    }

    Ok(())
}

/// Low-level structure for computing SNWS signatures once the `Authorization` header has been parsed.
#[derive(Clone)]
pub struct SnwsAuthenticator {
    /// The parsed `Authorization` header.
    authorization: ParsedAuthorization,

    /// The request being verified.
    context: SigningContext,

    /// The request date, from either `X-SN-Date` or `Date`.
    request_date: RequestDate,
}

impl SnwsAuthenticator {
    /// Parse an `Authorization` header value for the given request.
    ///
    /// The request date is resolved before the scheme parameters are examined, so a request with no usable date
    /// always fails with [`SignatureError::MissingOrInvalidDate`].
    pub fn parse(header: &str, context: SigningContext) -> Result<Self, SignatureError> {
        let Some(kind) = AuthScheme::detect(header) else {
            debug!("parse: unsupported authorization scheme");
            return Err(SignatureError::MalformedAuthorization(format!(
                "{}'{}'.",
                MSG_UNSUPPORTED_SCHEME,
                split_scheme(header).0
            )));
        };

        let request_date = context.request_date()?;
        let params = split_scheme(header).1;

        let authorization = match kind {
            SchemeKind::V1 => parse_v1(header, params)?,
            SchemeKind::V2 => {
                let authorization = parse_v2(header, params)?;
                check_signed_headers(authorization.scheme.signed_headers(), &context, &request_date)?;
                authorization
            }
        };

        trace!("parse: {:?} using {:?}", authorization, request_date);

        Ok(Self {
            authorization,
            context,
            request_date,
        })
    }

    /// Retrieve the parsed `Authorization` header.
    #[inline]
    pub fn authorization(&self) -> &ParsedAuthorization {
        &self.authorization
    }

    /// Retrieve the protocol version.
    #[inline]
    pub fn scheme_kind(&self) -> SchemeKind {
        self.authorization.scheme.kind()
    }

    /// Retrieve the token identifier.
    #[inline]
    pub fn token_id(&self) -> &str {
        &self.authorization.token_id
    }

    /// Retrieve the signature provided by the client.
    #[inline]
    pub fn signature(&self) -> &str {
        &self.authorization.signature
    }

    /// Retrieve the request date and the header it came from.
    #[inline]
    pub fn request_date(&self) -> &RequestDate {
        &self.request_date
    }

    /// Retrieve the timestamp of the request.
    #[inline]
    pub fn request_timestamp(&self) -> DateTime<Utc> {
        self.request_date.timestamp()
    }

    /// Retrieve the request being verified.
    #[inline]
    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    /// Returns true if the request date is within `max_skew_millis` of the clock's current time.
    pub fn is_date_valid<C: Clock + ?Sized>(&self, clock: &C, max_skew_millis: i64) -> bool {
        self.is_date_valid_at(clock.now(), max_skew_millis)
    }

    /// Returns true if the request date is within `max_skew_millis` of `now`.
    pub fn is_date_valid_at(&self, now: DateTime<Utc>, max_skew_millis: i64) -> bool {
        is_within_skew(self.request_timestamp(), now, max_skew_millis)
    }

    /// Verify the request timestamp is within `allowed_mismatch` of `server_timestamp`, describing the failure if
    /// not.
    #[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
    #[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
    fn check_date_skew(
        &self,
        server_timestamp: DateTime<Utc>,
        allowed_mismatch: Duration,
    ) -> Result<(), SignatureError> {
        let req_ts = self.request_timestamp();
        let min_ts = server_timestamp.checked_sub_signed(allowed_mismatch).unwrap_or(server_timestamp);
        let max_ts = server_timestamp.checked_add_signed(allowed_mismatch).unwrap_or(server_timestamp);

        if req_ts < min_ts {
            trace!("check_date_skew: request timestamp {} is before minimum timestamp {}", req_ts, min_ts);
            return Err(SignatureError::DateSkewExceeded(format!(
                "Request date expired: {} is now earlier than {} ({} - {}.)",
                format_iso8601_compact(&req_ts),
                format_iso8601_compact(&min_ts),
                format_iso8601_compact(&server_timestamp),
                duration_to_string(allowed_mismatch)
            )));
        }

        if req_ts > max_ts {
            trace!("check_date_skew: request timestamp {} is after maximum timestamp {}", req_ts, max_ts);
            return Err(SignatureError::DateSkewExceeded(format!(
                "Request date not yet current: {} is still later than {} ({} + {}.)",
                format_iso8601_compact(&req_ts),
                format_iso8601_compact(&max_ts),
                format_iso8601_compact(&server_timestamp),
                duration_to_string(allowed_mismatch)
            )));
        }

        Ok(())
    }

    /// Validate any `Content-MD5` or `Digest` header against the buffered body.
    pub fn validate_content_digest(&self) -> Result<(), SignatureError> {
        content_digest::validate_content_digest(self.context.headers(), self.context.body())
    }

    /// Compute the signature the client should have sent, using the default signing key validity window.
    ///
    /// For SNWS2, signing keys scoped to the request's UTC day and each of the previous seven days are tried in
    /// turn; the first whose signature matches the provided one is returned. If none match, the signature for the
    /// request's own day is returned so the caller's comparison fails. This fails only if an SNWS2 request body
    /// exceeded the buffer capacity.
    pub fn compute_signature_digest(&self, secret: &Secret) -> Result<String, SignatureError> {
        self.compute_signature_digest_with_validity(secret, SIGNING_KEY_VALIDITY_DAYS)
    }

    /// Compute the expected signature, trying SNWS2 signing keys up to `validity_days` days older than the request.
    pub fn compute_signature_digest_with_validity(
        &self,
        secret: &Secret,
        validity_days: u32,
    ) -> Result<String, SignatureError> {
        match self.scheme_kind() {
            SchemeKind::V1 => Ok(secret.sign_v1(&self.context.v1_string_to_sign(&self.request_date))),
            SchemeKind::V2 => {
                let string_to_sign =
                    self.context.v2_string_to_sign(&self.request_date, self.authorization.scheme.signed_headers())?;
                let request_day = self.request_timestamp().date_naive();
                let mut first = None;

                for days_back in 0..=validity_days {
                    let Some(scope_date) = request_day.checked_sub_days(Days::new(u64::from(days_back))) else {
                        break;
                    };

                    let candidate = secret.to_signing_key(scope_date).sign(&string_to_sign);
                    if self.signature_matches(&candidate) {
                        trace!("compute_signature_digest: matched signing key scoped to {}", scope_date);
                        return Ok(candidate);
                    }

                    trace!("compute_signature_digest: signing key scoped to {} does not match", scope_date);
                    first.get_or_insert(candidate);
                }

                Ok(first.unwrap_or_default())
            }
        }
    }

    /// Compare a computed signature against the one provided by the client in constant time.
    pub fn signature_matches(&self, digest: &str) -> bool {
        self.authorization.signature.as_bytes().ct_eq(digest.as_bytes()).into()
    }
}

impl Debug for SnwsAuthenticator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SnwsAuthenticator")
            .field("authorization", &self.authorization)
            .field("request_date", &self.request_date)
            .finish()
    }
}

/// Upon successful authentication of a signature, this is returned to convey who signed the request and how.
///
/// SnwsAuthenticatorResponse structs are immutable. Use [SnwsAuthenticatorResponseBuilder] to construct a new
/// response.
#[derive(Builder, Clone, Debug, PartialEq, Eq)]
pub struct SnwsAuthenticatorResponse {
    /// The token that signed the request.
    #[builder(setter(into))]
    token_id: String,

    /// The protocol version used.
    scheme: SchemeKind,

    /// The request timestamp.
    request_timestamp: DateTime<Utc>,
}

impl SnwsAuthenticatorResponse {
    /// Create a [SnwsAuthenticatorResponseBuilder] to construct a [SnwsAuthenticatorResponse].
    #[inline]
    pub fn builder() -> SnwsAuthenticatorResponseBuilder {
        SnwsAuthenticatorResponseBuilder::default()
    }

    /// Retrieve the token that signed the request.
    #[inline]
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Retrieve the protocol version used.
    #[inline]
    pub fn scheme(&self) -> SchemeKind {
        self.scheme
    }

    /// Retrieve the request timestamp.
    #[inline]
    pub fn request_timestamp(&self) -> DateTime<Utc> {
        self.request_timestamp
    }
}

impl From<&SnwsAuthenticator> for SnwsAuthenticatorResponse {
    fn from(auth: &SnwsAuthenticator) -> Self {
        Self {
            token_id: auth.token_id().to_string(),
            scheme: auth.scheme_kind(),
            request_timestamp: auth.request_timestamp(),
        }
    }
}

fn duration_to_string(duration: Duration) -> String {
    let secs = duration.num_seconds();
    if secs % 60 == 0 {
        format!("{} min", duration.num_minutes())
    } else {
        format!("{} sec", secs)
    }
}
