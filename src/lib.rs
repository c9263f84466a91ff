//! The `snws_signature` crate provides SolarNetwork web service (SNWS) request signing and _verification_ routines.
//!
//! Two authorization schemes are supported:
//! * `SNWS1`: the Base64 encoded HMAC-SHA1 of a short string to sign, keyed directly by the token secret.
//! * `SNWS2`: the hex encoded HMAC-SHA256 of a canonical request digest, keyed by a signing key derived from the
//!   token secret and the request date. Signing keys remain valid for 7 days.
//!
//! # Workflow
//! Verification requires the complete HTTP request, headers _and_ body. SNWS2 signatures cover a digest of the body,
//! so the body is buffered (up to a configurable limit) and handed back for downstream processing.
//!
//! The typical workflow is:
//! 1. Wrap your credential store in a [tower Service][tower::Service] using [`service_for_secret_fn`].
//! 2. Call [`snws_validate_request`] with the incoming request.
//! 3. On success, continue with the returned request parts and [`BufferedBody`].
//!
//! Clients sign outgoing requests with [`SnwsSigner`].
//!
//! ## Example
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use http::Request;
//! use http_body_util::Full;
//! use snws_signature::{
//!     service_for_secret_fn, snws_validate_request, FixedClock, GetSecretRequest, GetSecretResponse, SchemeKind,
//!     SignatureError, SignatureOptions, SnwsSigner,
//! };
//! use tower::BoxError;
//!
//! const TOKEN_ID: &str = "a09sjds09wu9wjsd9uy2";
//! const SECRET: &str = "pass123";
//!
//! // This is a mock function that returns a static secret. For actual use, you would call out to a database or
//! // other service to obtain the secret for the token.
//! async fn get_secret(request: GetSecretRequest) -> Result<GetSecretResponse, BoxError> {
//!     if request.token_id() != TOKEN_ID {
//!         return Err(SignatureError::InvalidTokenId(request.token_id().to_string()).into());
//!     }
//!     Ok(GetSecretResponse::builder().secret(SECRET).build()?)
//! }
//!
//! # tokio_test::block_on(async {
//! let clock = FixedClock(Utc.with_ymd_and_hms(2017, 4, 25, 14, 30, 0).unwrap());
//!
//! // Client side: sign the request.
//! let mut request = Request::get("https://data.solarnetwork.net/solarquery/api/v1/sec/nodes")
//!     .body(Vec::new())
//!     .unwrap();
//! let mut signer = SnwsSigner::builder().token_id(TOKEN_ID).secret(SECRET).build().unwrap();
//! signer.sign_request(&mut request, SchemeKind::V2, &clock).unwrap();
//!
//! // Server side: normally this would come from your web framework, and you would use `SystemClock`.
//! let request = request.map(|body| Full::new(bytes::Bytes::from(body)));
//! let mut service = service_for_secret_fn(get_secret);
//! let (_parts, _body, auth) =
//!     snws_validate_request(request, &mut service, &clock, &SignatureOptions::default()).await.unwrap();
//! assert_eq!(auth.token_id(), TOKEN_ID);
//! # });
//! ```
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Authorization header parsing and signature verification.
///
/// This is not part of the stable public API.
pub mod auth;
mod buffered_body;

/// Canonical request construction.
///
/// This is not part of the stable public API.
pub mod canonical;
mod chronoutil;
mod constants;
mod content_digest;
mod crypto;
mod date;
mod error;
mod signature;
mod signer;
mod signing_key;

pub use {
    auth::{AuthScheme, ParsedAuthorization, SchemeKind, SnwsAuthenticator, SnwsAuthenticatorResponse},
    buffered_body::BufferedBody,
    canonical::{query_string_to_params, SigningContext},
    chronoutil::{format_rfc1123, ParseRfc1123},
    content_digest::validate_content_digest,
    date::{is_within_skew, parse_http_date, request_date, Clock, DateHeader, FixedClock, RequestDate, SystemClock},
    error::SignatureError,
    signature::{snws_validate_request, SignatureOptions},
    signer::{SnwsSigner, SnwsSignerBuilder},
    signing_key::{
        service_for_secret_fn, DateKey, GetSecretRequest, GetSecretRequestBuilder, GetSecretResponse,
        GetSecretResponseBuilder, Secret, SigningKey,
    },
};

#[cfg(test)]
mod unittest;
