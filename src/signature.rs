//! One-call validation of SNWS1 and SNWS2 signed requests.

use {
    crate::{
        auth::{SnwsAuthenticator, SnwsAuthenticatorResponse},
        canonical::SigningContext,
        constants::{
            ALLOWED_MISMATCH_MINUTES, DEFAULT_MAX_BODY_SIZE, HDR_AUTHORIZATION, MSG_REQUEST_MISSING_AUTHORIZATION,
            MSG_REQUEST_SIGNATURE_MISMATCH, SIGNING_KEY_VALIDITY_DAYS,
        },
        date::Clock,
        BufferedBody, GetSecretRequest, GetSecretResponse, SignatureError,
    },
    chrono::Duration,
    http::request::{Parts, Request},
    http_body::Body,
    log::{debug, trace},
    std::future::Future,
    tower::{BoxError, Service, ServiceExt},
};

/// Options that can be used to configure request validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureOptions {
    /// The largest allowed difference between the request date and the server clock, in either direction.
    pub max_date_skew: Duration,

    /// The maximum number of body bytes buffered. Requests with larger bodies are rejected with
    /// [`SignatureError::ContentTooLarge`], since the body could not be handed on intact.
    pub max_body_size: usize,

    /// The number of days before the request date for which SNWS2 signing keys are still accepted.
    pub signing_key_validity_days: u32,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            max_date_skew: Duration::minutes(ALLOWED_MISMATCH_MINUTES),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            signing_key_validity_days: SIGNING_KEY_VALIDITY_DAYS,
        }
    }
}

impl SignatureOptions {
    /// Return these options with a different body buffer capacity.
    pub const fn with_max_body_size(self, max_body_size: usize) -> Self {
        Self {
            max_body_size,
            ..self
        }
    }

    /// Return these options with a different allowed date skew.
    pub const fn with_max_date_skew(self, max_date_skew: Duration) -> Self {
        Self {
            max_date_skew,
            ..self
        }
    }

    /// Return these options with a different SNWS2 signing key validity window.
    pub const fn with_signing_key_validity_days(self, signing_key_validity_days: u32) -> Self {
        Self {
            signing_key_validity_days,
            ..self
        }
    }
}

/// Look up the secret for the token that signed the request.
async fn get_secret<G, F>(auth: &SnwsAuthenticator, get_secret: &mut G) -> Result<GetSecretResponse, SignatureError>
where
    G: Service<GetSecretRequest, Response = GetSecretResponse, Error = BoxError, Future = F> + Send,
    F: Future<Output = Result<GetSecretResponse, BoxError>> + Send,
{
    let req = GetSecretRequest::builder()
        .token_id(auth.token_id())
        .request_timestamp(auth.request_timestamp())
        .build()
        .map_err(|e| SignatureError::InternalServiceError(Box::new(e)))?;

    match get_secret.oneshot(req).await {
        Ok(response) => {
            trace!("get_secret: got secret");
            Ok(response)
        }
        Err(e) => {
            debug!("get_secret: error getting secret: {}", e);
            Err(SignatureError::from(e))
        }
    }
}

/// Validate an SNWS1 or SNWS2 signed request.
///
/// This takes in an HTTP [`Request`] and buffers its body up to `options.max_body_size` bytes. If the validation is
/// successful (i.e. the request is properly signed by a known token), this returns:
/// * The request headers (as HTTP [`Parts`]).
/// * The buffered request body, which can be replayed downstream with
///   [`BufferedBody::replay_body`][crate::BufferedBody::replay_body].
/// * The [response from the authenticator][SnwsAuthenticatorResponse], naming the token and scheme.
///
/// # Parameters
/// * `request` - The HTTP [`Request`] to validate.
/// * `get_secret` - A service that can provide the secret for a token. It should fail with
///   [`SignatureError::InvalidTokenId`] for unknown tokens.
/// * `clock` - The source of the server's current time.
/// * `options` - [`SignatureOptions`] that affect the behavior of the signature validation. For most services, use
///   `SignatureOptions::default()`.
///
/// # Errors
/// Checks are made in this order: the `Authorization` header is present and well formed and the request has a
/// usable date; the date is within the allowed skew; declared body digests match; the whole body fit in the
/// buffer; the token is known; and the signature matches.
pub async fn snws_validate_request<B, G, F, C>(
    request: Request<B>,
    get_secret_service: &mut G,
    clock: &C,
    options: &SignatureOptions,
) -> Result<(Parts, BufferedBody, SnwsAuthenticatorResponse), SignatureError>
where
    B: Body,
    B::Error: Into<BoxError>,
    G: Service<GetSecretRequest, Response = GetSecretResponse, Error = BoxError, Future = F> + Send,
    F: Future<Output = Result<GetSecretResponse, BoxError>> + Send,
    C: Clock + ?Sized,
{
    let (parts, body) = request.into_parts();
    let body = BufferedBody::from_body(body, options.max_body_size).await?;

    let Some(header) = parts.headers.get(HDR_AUTHORIZATION) else {
        debug!("Request has no Authorization header");
        return Err(SignatureError::MalformedAuthorization(MSG_REQUEST_MISSING_AUTHORIZATION.to_string()));
    };
    let header = header.to_str().map_err(|_| {
        SignatureError::MalformedAuthorization("Authorization header is not a valid ASCII string.".to_string())
    })?;

    let context = SigningContext::from_request_parts(&parts, Some(&body))?;
    trace!("Created signing context: {:?}", context);
    let auth = SnwsAuthenticator::parse(header, context)?;
    trace!("Created authenticator: {:?}", auth);

    auth.check_date_skew(clock.now(), options.max_date_skew)?;
    auth.validate_content_digest()?;

    // The returned body must be replayable in full, whatever the scheme.
    if body.is_overflowed() {
        debug!("Request body exceeds {} bytes", options.max_body_size);
        body.complete_bytes()?;
    }

    let response = get_secret(&auth, get_secret_service).await?;
    let expected_signature =
        auth.compute_signature_digest_with_validity(response.secret(), options.signing_key_validity_days)?;

    if !auth.signature_matches(&expected_signature) {
        debug!("Signature mismatch for token {}", auth.token_id());
        return Err(SignatureError::SignatureMismatch(MSG_REQUEST_SIGNATURE_MISMATCH.to_string()));
    }

    Ok((parts, body, SnwsAuthenticatorResponse::from(&auth)))
}
