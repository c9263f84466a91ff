use {
    crate::{
        constants::{ISO8601_DATE_FORMAT, SHA256_OUTPUT_LEN, SNWS2_KEY_PREFIX, SNWS2_REQUEST},
        crypto::{hmac_sha1, hmac_sha256},
    },
    base64::{engine::general_purpose::STANDARD as BASE64, Engine},
    chrono::{DateTime, NaiveDate, Utc},
    derive_builder::Builder,
    std::{
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        future::Future,
    },
    tower::{service_fn, util::ServiceFn, BoxError},
};

/// A raw token secret shared between a client and the credential store.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    /// The secret bytes.
    value: Vec<u8>,
}

/// The intermediate date key: `HMAC_SHA256("SNWS2" + Secret, "YYYYMMDD")`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DateKey {
    /// The raw key.
    key: [u8; SHA256_OUTPUT_LEN],
}

/// The SNWS2 signing key: a [`DateKey`], HMAC-SHA256 hashed with the "snws2_request" string.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SigningKey {
    /// The resulting raw signing key.
    key: [u8; SHA256_OUTPUT_LEN],
}

impl Secret {
    /// Wrap raw secret bytes.
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Create a new `DateKey` from this `Secret` and a scope date.
    pub fn to_date_key(&self, date: NaiveDate) -> DateKey {
        let date = date.format(ISO8601_DATE_FORMAT).to_string();
        let mut prefixed_key = Vec::with_capacity(SNWS2_KEY_PREFIX.len() + self.value.len());
        prefixed_key.extend_from_slice(SNWS2_KEY_PREFIX);
        prefixed_key.extend_from_slice(&self.value);

        DateKey {
            key: hmac_sha256(&prefixed_key, date.as_bytes()),
        }
    }

    /// Create a new `SigningKey` from this `Secret` and a scope date.
    pub fn to_signing_key(&self, date: NaiveDate) -> SigningKey {
        self.to_date_key(date).to_signing_key()
    }

    /// Produce an SNWS1 signature: the Base64-encoded HMAC-SHA1 of the string to sign, keyed directly by the
    /// secret.
    pub fn sign_v1(&self, string_to_sign: &[u8]) -> String {
        BASE64.encode(hmac_sha1(&self.value, string_to_sign))
    }
}

impl DateKey {
    /// Create a new `SigningKey` from this `DateKey`.
    pub fn to_signing_key(&self) -> SigningKey {
        SigningKey {
            key: hmac_sha256(self.key.as_slice(), SNWS2_REQUEST.as_bytes()),
        }
    }
}

impl SigningKey {
    /// Produce an SNWS2 signature: the lowercase hex HMAC-SHA256 of the string to sign.
    pub fn sign(&self, string_to_sign: &[u8]) -> String {
        hex::encode(hmac_sha256(self.key.as_slice(), string_to_sign))
    }
}

impl AsRef<[u8]> for Secret {
    fn as_ref(&self) -> &[u8] {
        &self.value
    }
}

impl AsRef<[u8; SHA256_OUTPUT_LEN]> for DateKey {
    fn as_ref(&self) -> &[u8; SHA256_OUTPUT_LEN] {
        &self.key
    }
}

impl AsRef<[u8; SHA256_OUTPUT_LEN]> for SigningKey {
    fn as_ref(&self) -> &[u8; SHA256_OUTPUT_LEN] {
        &self.key
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<Vec<u8>> for Secret {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Secret")
    }
}

impl Debug for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("DateKey")
    }
}

impl Debug for SigningKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("SigningKey")
    }
}

impl Display for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Secret")
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("DateKey")
    }
}

impl Display for SigningKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("SigningKey")
    }
}

/// A request for the secret belonging to a token.
///
/// GetSecretRequest structs are immutable. Use [`GetSecretRequestBuilder`] to programmatically construct a request.
#[derive(Builder, Clone, Debug)]
#[non_exhaustive]
pub struct GetSecretRequest {
    /// The token identifier from the `Authorization` header.
    #[builder(setter(into))]
    token_id: String,

    /// The date the request claims to have been made.
    request_timestamp: DateTime<Utc>,
}

impl GetSecretRequest {
    /// Create a [GetSecretRequestBuilder] to construct a [GetSecretRequest].
    #[inline]
    pub fn builder() -> GetSecretRequestBuilder {
        GetSecretRequestBuilder::default()
    }

    /// Retrieve the token identifier used in the request.
    #[inline]
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Retrieve the timestamp of the request.
    #[inline]
    pub fn request_timestamp(&self) -> DateTime<Utc> {
        self.request_timestamp
    }
}

/// A response from the secret provider.
///
/// GetSecretResponse structs are immutable. Use [GetSecretResponseBuilder] to programmatically construct a response.
#[derive(Builder, Clone, Debug)]
pub struct GetSecretResponse {
    /// The token secret.
    #[builder(setter(into))]
    pub(crate) secret: Secret,
}

impl GetSecretResponse {
    /// Create a [GetSecretResponseBuilder] to construct a [GetSecretResponse].
    #[inline]
    pub fn builder() -> GetSecretResponseBuilder {
        GetSecretResponseBuilder::default()
    }

    /// Retrieve the token secret.
    #[inline]
    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

/// Create a Service that wraps a function that can look up a token secret.
///
/// The function should fail with [`SignatureError::InvalidTokenId`][crate::SignatureError::InvalidTokenId] when the
/// token does not exist.
pub fn service_for_secret_fn<F, Fut>(f: F) -> ServiceFn<F>
where
    F: FnOnce(GetSecretRequest) -> Fut + Send + 'static,
    Fut: Future<Output = Result<GetSecretResponse, BoxError>> + Send + 'static,
{
    service_fn(f)
}
