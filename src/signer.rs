//! Client-side request signing.
//!
//! [`SnwsSigner`] produces `Authorization` header values for outgoing requests. SNWS2 signing keys are derived once
//! per scope date and cached, so a long-lived signer only pays the key derivation cost when the UTC day changes.

use {
    crate::{
        auth::SchemeKind,
        canonical::SigningContext,
        chronoutil::format_rfc1123,
        constants::{
            HDR_AUTHORIZATION, HDR_CONTENT_MD5, HDR_CONTENT_TYPE, HDR_DATE, HDR_DIGEST, HDR_HOST, HDR_X_SN_DATE,
            SNWS2_CREDENTIAL, SNWS2_SIGNATURE, SNWS2_SIGNED_HEADERS,
        },
        date::Clock,
        BufferedBody, Secret, SignatureError, SigningKey,
    },
    chrono::NaiveDate,
    derive_builder::Builder,
    http::{
        header::{HeaderName, HeaderValue},
        request::Request,
    },
    log::trace,
    std::fmt::{Debug, Formatter, Result as FmtResult},
};

/// Signs outgoing requests on behalf of one token.
///
/// SnwsSigner structs are built with [SnwsSignerBuilder].
#[derive(Builder, Clone)]
pub struct SnwsSigner {
    /// The token identifier placed in the `Authorization` header.
    #[builder(setter(into))]
    token_id: String,

    /// The token secret.
    #[builder(setter(into))]
    secret: Secret,

    /// Headers to sign under SNWS2 in addition to `host`, the date header, and any of `content-md5`,
    /// `content-type`, and `digest` present on the request.
    #[builder(setter(each(name = "sign_header", into)), default)]
    additional_signed_headers: Vec<String>,

    /// The most recently derived SNWS2 signing key and its scope date.
    #[builder(setter(skip))]
    cached_key: Option<(NaiveDate, SigningKey)>,
}

impl SnwsSigner {
    /// Create a [SnwsSignerBuilder] to construct a [SnwsSigner].
    #[inline]
    pub fn builder() -> SnwsSignerBuilder {
        SnwsSignerBuilder::default()
    }

    /// Retrieve the token identifier.
    #[inline]
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Return the SNWS2 signing key for `date`, deriving it only if the cached key is for another day.
    fn signing_key(&mut self, date: NaiveDate) -> SigningKey {
        match self.cached_key {
            Some((cached_date, key)) if cached_date == date => key,
            _ => {
                trace!("Deriving signing key for {}", date);
                let key = self.secret.to_signing_key(date);
                self.cached_key = Some((date, key));
                key
            }
        }
    }

    /// The header names to sign for a request under SNWS2: lower-cased, sorted, and de-duplicated.
    fn signed_headers(&self, context: &SigningContext, date_header: &str) -> Vec<String> {
        let mut names = vec![HDR_HOST.to_string(), date_header.to_string()];
        for optional in [HDR_CONTENT_MD5, HDR_CONTENT_TYPE, HDR_DIGEST] {
            if context.headers().contains_key(optional) {
                names.push(optional.to_string());
            }
        }

        names.extend(
            self.additional_signed_headers
                .iter()
                .map(|name| name.to_ascii_lowercase())
                .filter(|name| context.headers().contains_key(name.as_str())),
        );
        names.sort();
        names.dedup();
        names
    }

    /// Compute the `Authorization` header value for a request described by `context`.
    ///
    /// The request must already carry an `X-SN-Date` or `Date` header.
    pub fn authorization(&mut self, context: &SigningContext, scheme: SchemeKind) -> Result<String, SignatureError> {
        let date = context.request_date()?;

        match scheme {
            SchemeKind::V1 => {
                let signature = self.secret.sign_v1(&context.v1_string_to_sign(&date));
                Ok(format!("{} {}:{}", scheme, self.token_id, signature))
            }
            SchemeKind::V2 => {
                let signed_headers = self.signed_headers(context, date.header().header_name());
                let string_to_sign = context.v2_string_to_sign(&date, &signed_headers)?;
                let signature = self.signing_key(date.timestamp().date_naive()).sign(&string_to_sign);
                Ok(format!(
                    "{} {}={},{}={},{}={}",
                    scheme,
                    SNWS2_CREDENTIAL,
                    self.token_id,
                    SNWS2_SIGNED_HEADERS,
                    signed_headers.join(";"),
                    SNWS2_SIGNATURE,
                    signature
                ))
            }
        }
    }

    /// Sign a request in place.
    ///
    /// If the request has neither an `X-SN-Date` nor a `Date` header, an `X-SN-Date` header is added from `clock`.
    /// If it has no `Host` header and its URI has an authority, a `Host` header is added from the URI. Any existing
    /// `Authorization` header is replaced.
    pub fn sign_request<B, C>(
        &mut self,
        request: &mut Request<B>,
        scheme: SchemeKind,
        clock: &C,
    ) -> Result<(), SignatureError>
    where
        B: AsRef<[u8]>,
        C: Clock + ?Sized,
    {
        if !request.headers().contains_key(HDR_X_SN_DATE) && !request.headers().contains_key(HDR_DATE) {
            let now = format_rfc1123(&clock.now());
            request.headers_mut().insert(HeaderName::from_static(HDR_X_SN_DATE), header_value(&now)?);
        }

        if !request.headers().contains_key(HDR_HOST) {
            if let Some(authority) = request.uri().authority().map(|a| a.to_string()) {
                request.headers_mut().insert(HeaderName::from_static(HDR_HOST), header_value(&authority)?);
            }
        }

        let body = BufferedBody::from_bytes(request.body().as_ref().to_vec(), usize::MAX);
        let context = SigningContext::from_request(request, Some(&body))?;
        let authorization = self.authorization(&context, scheme)?;
        request.headers_mut().insert(HeaderName::from_static(HDR_AUTHORIZATION), header_value(&authorization)?);
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, SignatureError> {
    HeaderValue::from_str(value).map_err(|e| SignatureError::InternalServiceError(Box::new(e)))
}

impl Debug for SnwsSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SnwsSigner")
            .field("token_id", &self.token_id)
            .field("additional_signed_headers", &self.additional_signed_headers)
            .finish()
    }
}
