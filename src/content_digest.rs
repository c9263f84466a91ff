//! Validation of the `Content-MD5` and `Digest` request headers against the buffered body.
//!
//! Declared digests may be given either as hex (either case) or as standard Base64. A value that decodes to the
//! wrong number of bytes, or not at all, is treated as a mismatch.

use {
    crate::{
        constants::{
            DIGEST_ALG_SHA256, HDR_CONTENT_MD5, HDR_DIGEST, MD5_HEX_LENGTH, MD5_OUTPUT_LEN, SHA256_HEX_LENGTH,
            SHA256_OUTPUT_LEN,
        },
        crypto::{md5, sha256},
        BufferedBody, SignatureError,
    },
    base64::{engine::general_purpose::STANDARD as BASE64, Engine},
    http::header::HeaderMap,
    log::{debug, trace},
    subtle::ConstantTimeEq,
};

/// Decode a declared digest value of `len` bytes, given as `hex_len` hex digits or as Base64.
fn decode_digest(value: &str, len: usize, hex_len: usize) -> Option<Vec<u8>> {
    let value = value.trim();
    let decoded = if value.len() == hex_len && value.bytes().all(|c| c.is_ascii_hexdigit()) {
        hex::decode(value).ok()?
    } else {
        BASE64.decode(value).ok()?
    };

    if decoded.len() == len {
        Some(decoded)
    } else {
        None
    }
}

/// Extract the `sha-256` entry of an RFC 3230 `Digest` header. Other algorithms are ignored.
fn sha256_digest_entry(header: &str) -> Option<&str> {
    header.split(',').find_map(|entry| {
        let (alg, value) = entry.trim().split_once('=')?;
        if alg.trim().eq_ignore_ascii_case(DIGEST_ALG_SHA256) {
            Some(value.trim())
        } else {
            None
        }
    })
}

fn check_digest(
    header: &str,
    declared: &str,
    expected_len: usize,
    hex_len: usize,
    actual: &[u8],
) -> Result<(), SignatureError> {
    let matches = match decode_digest(declared, expected_len, hex_len) {
        Some(declared) => bool::from(declared.as_slice().ct_eq(actual)),
        None => {
            debug!("{} value could not be decoded as hex or Base64: {:?}", header, declared);
            false
        }
    };

    if matches {
        trace!("{} matches the request body", header);
        Ok(())
    } else {
        debug!("{} does not match the request body", header);
        Err(SignatureError::ContentDigestMismatch(format!(
            "The {} you specified did not match what we received.",
            header
        )))
    }
}

/// Validate any declared body digests in `headers` against `body`.
///
/// If neither a `Content-MD5` header nor a `Digest` header with a `sha-256` entry is present, this does nothing. If
/// both are present, both are checked. A body that exceeded the buffer capacity cannot be digested, so any declared
/// digest on such a body fails with [`SignatureError::ContentTooLarge`].
pub fn validate_content_digest(headers: &HeaderMap, body: &BufferedBody) -> Result<(), SignatureError> {
    let content_md5 = headers.get(HDR_CONTENT_MD5).map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
    let digest_sha256 = headers
        .get(HDR_DIGEST)
        .and_then(|v| v.to_str().ok())
        .and_then(sha256_digest_entry)
        .map(|v| v.to_string());

    if content_md5.is_none() && digest_sha256.is_none() {
        return Ok(());
    }

    let bytes = body.complete_bytes()?;

    if let Some(declared) = content_md5 {
        check_digest("Content-MD5", &declared, MD5_OUTPUT_LEN, MD5_HEX_LENGTH, &md5(bytes))?;
    }

    if let Some(declared) = digest_sha256 {
        check_digest("Digest", &declared, SHA256_OUTPUT_LEN, SHA256_HEX_LENGTH, &sha256(bytes))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::{decode_digest, sha256_digest_entry, validate_content_digest},
        crate::{BufferedBody, SignatureError},
        http::header::{HeaderMap, HeaderValue},
    };

    const HELLO: &[u8] = b"Hello, world.";
    const HELLO_MD5_HEX: &str = "080aef839b95facf73ec599375e92d47";
    const HELLO_MD5_B64: &str = "CArvg5uV+s9z7FmTdektRw==";
    const HELLO_SHA256_HEX: &str = "f8c3bf62a9aa3e6fc1619c250e48abe7519373d3edf41be62eb5dc45199af2ef";
    const HELLO_SHA256_B64: &str = "+MO/YqmqPm/BYZwlDkir51GTc9Pt9BvmLrXcRRma8u8=";

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test_log::test]
    fn test_content_md5_forms() {
        let body = BufferedBody::from_bytes(HELLO, 1024);

        validate_content_digest(&headers(&[("Content-MD5", HELLO_MD5_HEX)]), &body).unwrap();
        validate_content_digest(&headers(&[("Content-MD5", &HELLO_MD5_HEX.to_uppercase())]), &body).unwrap();
        validate_content_digest(&headers(&[("Content-MD5", HELLO_MD5_B64)]), &body).unwrap();

        // Flip one character in each form.
        let e = validate_content_digest(&headers(&[("Content-MD5", "180aef839b95facf73ec599375e92d47")]), &body)
            .unwrap_err();
        assert!(matches!(e, SignatureError::ContentDigestMismatch(_)));
        assert_eq!(e.to_string(), "The Content-MD5 you specified did not match what we received.");

        let e = validate_content_digest(&headers(&[("Content-MD5", "DArvg5uV+s9z7FmTdektRw==")]), &body).unwrap_err();
        assert!(matches!(e, SignatureError::ContentDigestMismatch(_)));

        let e = validate_content_digest(&headers(&[("Content-MD5", "not a digest!")]), &body).unwrap_err();
        assert!(matches!(e, SignatureError::ContentDigestMismatch(_)));
    }

    #[test_log::test]
    fn test_digest_sha256_forms() {
        let body = BufferedBody::from_bytes(HELLO, 1024);
        let sha_hex = format!("sha-256={}", HELLO_SHA256_HEX);
        let sha_b64 = format!("SHA-256={}", HELLO_SHA256_B64);
        let multi = format!("md5={}, sha-256={}", HELLO_MD5_B64, HELLO_SHA256_B64);

        validate_content_digest(&headers(&[("Digest", &sha_hex)]), &body).unwrap();
        validate_content_digest(&headers(&[("Digest", &sha_b64)]), &body).unwrap();
        validate_content_digest(&headers(&[("Digest", &multi)]), &body).unwrap();

        let e = validate_content_digest(&headers(&[("Digest", &sha_hex.replace("f8c3", "f8c4"))]), &body).unwrap_err();
        assert!(matches!(e, SignatureError::ContentDigestMismatch(_)));
        assert_eq!(e.to_string(), "The Digest you specified did not match what we received.");

        // A Digest header with no sha-256 entry is ignored.
        validate_content_digest(&headers(&[("Digest", "md5=bogus")]), &body).unwrap();
    }

    #[test_log::test]
    fn test_both_headers_validated() {
        let body = BufferedBody::from_bytes(HELLO, 1024);
        let sha = format!("sha-256={}", HELLO_SHA256_HEX);
        validate_content_digest(&headers(&[("Content-MD5", HELLO_MD5_HEX), ("Digest", &sha)]), &body).unwrap();

        let e = validate_content_digest(
            &headers(&[("Content-MD5", HELLO_MD5_HEX), ("Digest", "sha-256=AAAA")]),
            &body,
        )
        .unwrap_err();
        assert!(matches!(e, SignatureError::ContentDigestMismatch(_)));
    }

    #[test_log::test]
    fn test_no_headers_and_overflow() {
        let body = BufferedBody::from_bytes(HELLO, 4);
        validate_content_digest(&HeaderMap::new(), &body).unwrap();

        let e = validate_content_digest(&headers(&[("Content-MD5", HELLO_MD5_HEX)]), &body).unwrap_err();
        assert!(matches!(e, SignatureError::ContentTooLarge(_)));
        assert_eq!(e.http_status(), 413);
    }

    #[test_log::test]
    fn test_helpers() {
        assert_eq!(sha256_digest_entry("sha-256=abc"), Some("abc"));
        assert_eq!(sha256_digest_entry(" md5=x ,  Sha-256 = abc "), Some("abc"));
        assert_eq!(sha256_digest_entry("md5=x"), None);
        assert_eq!(sha256_digest_entry("garbage"), None);

        assert_eq!(decode_digest(HELLO_MD5_HEX, 16, 32), decode_digest(HELLO_MD5_B64, 16, 32));
        assert!(decode_digest(HELLO_SHA256_B64, 16, 32).is_none());
    }
}
