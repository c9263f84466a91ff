use {
    crate::{
        service_for_secret_fn, snws_validate_request, BufferedBody, DateHeader, FixedClock, GetSecretRequest,
        GetSecretResponse, SchemeKind, Secret, SignatureError, SignatureOptions, SigningContext, SnwsAuthenticator,
        SnwsSigner,
    },
    bytes::Bytes,
    chrono::{DateTime, Duration, TimeZone, Utc},
    http::request::Request,
    http_body_util::{BodyExt, Full},
    tower::BoxError,
};

const TOKEN_ID: &str = "test-token";
const SECRET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdef";
const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

fn test_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 4, 25, 14, 30, 0).unwrap()
}

async fn get_secret(req: GetSecretRequest) -> Result<GetSecretResponse, BoxError> {
    if req.token_id() == TOKEN_ID {
        Ok(GetSecretResponse::builder().secret(SECRET).build()?)
    } else {
        Err(SignatureError::InvalidTokenId(req.token_id().to_string()).into())
    }
}

async fn run_validation(request: Request<Vec<u8>>, now: DateTime<Utc>) -> Result<SchemeKind, SignatureError> {
    let request = request.map(|body| Full::new(Bytes::from(body)));
    let mut service = service_for_secret_fn(get_secret);
    let (_, _, response) =
        snws_validate_request(request, &mut service, &FixedClock(now), &SignatureOptions::default()).await?;
    Ok(response.scheme())
}

fn signer() -> SnwsSigner {
    SnwsSigner::builder().token_id(TOKEN_ID).secret(SECRET).build().unwrap()
}

/// Build an SNWS2 header for a request, signing with a key scoped `days_back` days before the request date.
fn v2_header_with_key_age(request: &Request<()>, days_back: i64) -> String {
    let context = SigningContext::from_request(request, None).unwrap();
    let date = context.request_date().unwrap();
    let signed_headers = vec!["host".to_string(), "x-sn-date".to_string()];
    let string_to_sign = context.v2_string_to_sign(&date, &signed_headers).unwrap();
    let scope = (date.timestamp() - Duration::days(days_back)).date_naive();
    let signature = Secret::from(SECRET).to_signing_key(scope).sign(&string_to_sign);
    format!("SNWS2 Credential={},SignedHeaders=host;x-sn-date,Signature={}", TOKEN_ID, signature)
}

#[test_log::test]
fn check_key_rotation_window() {
    let request = Request::get("/api/v1/sec/nodes")
        .header("Host", "data.example.com")
        .header("X-SN-Date", "Tue, 25 Apr 2017 14:30:00 GMT")
        .body(())
        .unwrap();
    let secret = Secret::from(SECRET);

    for days_back in 0..=7 {
        let header = v2_header_with_key_age(&request, days_back);
        let context = SigningContext::from_request(&request, None).unwrap();
        let auth = SnwsAuthenticator::parse(&header, context).unwrap();
        let expected = auth.compute_signature_digest(&secret).unwrap();
        assert!(auth.signature_matches(&expected), "key {} days old should be accepted", days_back);
    }

    let header = v2_header_with_key_age(&request, 8);
    let context = SigningContext::from_request(&request, None).unwrap();
    let auth = SnwsAuthenticator::parse(&header, context).unwrap();
    let expected = auth.compute_signature_digest(&secret).unwrap();
    assert!(!auth.signature_matches(&expected));

    // With no match, the day-0 signature is reported.
    let day0 = v2_header_with_key_age(&request, 0);
    assert!(day0.ends_with(&format!("Signature={}", expected)));
}

#[test_log::test]
fn check_date_header_precedence() {
    let mut request = Request::get("https://data.example.com/api/v1/sec/nodes")
        .header("Date", "Mon, 24 Apr 2017 23:59:59 GMT")
        .header("X-SN-Date", "Tue, 25 Apr 2017 14:30:00 GMT")
        .body(Vec::new())
        .unwrap();
    signer().sign_request(&mut request, SchemeKind::V2, &FixedClock(test_timestamp())).unwrap();

    let header = request.headers().get("authorization").unwrap().to_str().unwrap().to_string();
    assert!(header.contains("SignedHeaders=host;x-sn-date,"));

    let body = BufferedBody::empty(0);
    let context = SigningContext::from_request(&request, Some(&body)).unwrap();
    let auth = SnwsAuthenticator::parse(&header, context).unwrap();
    assert_eq!(auth.request_date().header(), DateHeader::XSnDate);
    assert_eq!(auth.request_timestamp(), test_timestamp());

    // The key is scoped to the X-SN-Date day, not the Date day.
    let secret = Secret::from(SECRET);
    assert!(auth.signature_matches(&auth.compute_signature_digest_with_validity(&secret, 0).unwrap()));
}

#[test_log::test(tokio::test)]
async fn check_skew_boundary() {
    let ts = test_timestamp();

    for (offset_millis, accepted) in [(0, true), (899_999, true), (-899_999, true), (960_000, false), (-960_000, false)]
    {
        let mut request = Request::get("https://data.example.com/api/v1/sec/nodes").body(Vec::new()).unwrap();
        signer().sign_request(&mut request, SchemeKind::V2, &FixedClock(ts)).unwrap();
        let result = run_validation(request, ts + Duration::milliseconds(offset_millis)).await;

        if accepted {
            assert_eq!(result.unwrap(), SchemeKind::V2, "offset {}", offset_millis);
        } else {
            assert!(matches!(result, Err(SignatureError::DateSkewExceeded(_))), "offset {}", offset_millis);
        }
    }
}

#[test_log::test]
fn check_query_order_independence() {
    let make = |uri: &str| {
        Request::get(uri)
            .header("Host", "data.example.com")
            .header("X-SN-Date", "Tue, 25 Apr 2017 14:30:00 GMT")
            .body(())
            .unwrap()
    };
    let signed_headers = vec!["host".to_string(), "x-sn-date".to_string()];

    let a = SigningContext::from_request(&make("/q?b=2&a=1&a=0&c=%7E"), None).unwrap();
    let b = SigningContext::from_request(&make("/q?c=~&a=0&b=2&a=1"), None).unwrap();
    let cr_a = a.canonical_request(&signed_headers).unwrap();
    let cr_b = b.canonical_request(&signed_headers).unwrap();
    assert_eq!(cr_a, cr_b);
    assert!(String::from_utf8(cr_a).unwrap().contains("\na=0&a=1&b=2&c=~\n"));
}

#[test_log::test(tokio::test)]
async fn check_digest_encodings_equivalent() {
    for content_md5 in ["080aef839b95facf73ec599375e92d47", "CArvg5uV+s9z7FmTdektRw=="] {
        let mut request = Request::post("https://data.example.com/api/v1/sec/datum")
            .header("Content-MD5", content_md5)
            .header("Digest", "sha-256=+MO/YqmqPm/BYZwlDkir51GTc9Pt9BvmLrXcRRma8u8=")
            .body(b"Hello, world.".to_vec())
            .unwrap();
        signer().sign_request(&mut request, SchemeKind::V2, &FixedClock(test_timestamp())).unwrap();
        assert_eq!(run_validation(request, test_timestamp()).await.unwrap(), SchemeKind::V2);
    }
}

#[test_log::test]
fn check_empty_body_placeholder() {
    let request = Request::get("/api/v1/sec/nodes")
        .header("Host", "data.example.com")
        .header("X-SN-Date", "Tue, 25 Apr 2017 14:30:00 GMT")
        .body(())
        .unwrap();
    let signed_headers = vec!["host".to_string(), "x-sn-date".to_string()];

    let without_body = SigningContext::from_request(&request, None).unwrap();
    let empty = BufferedBody::empty(16);
    let with_empty_body = SigningContext::from_request(&request, Some(&empty)).unwrap();

    let cr1 = String::from_utf8(without_body.canonical_request(&signed_headers).unwrap()).unwrap();
    let cr2 = String::from_utf8(with_empty_body.canonical_request(&signed_headers).unwrap()).unwrap();
    assert_eq!(cr1, cr2);
    assert!(cr1.ends_with(SHA256_EMPTY));
}

#[test_log::test(tokio::test)]
async fn check_large_body_rejected_for_both_schemes() {
    for scheme in [SchemeKind::V1, SchemeKind::V2] {
        let mut request = Request::put("https://data.example.com/api/v1/sec/datum")
            .header("Content-Type", "application/octet-stream")
            .body(vec![b'x'; 2000])
            .unwrap();
        signer().sign_request(&mut request, scheme, &FixedClock(test_timestamp())).unwrap();

        let mut service = service_for_secret_fn(get_secret);
        let options = SignatureOptions::default().with_max_body_size(1024);
        let small = request.clone().map(|body| Full::new(Bytes::from(body)));
        let result = snws_validate_request(small, &mut service, &FixedClock(test_timestamp()), &options).await;
        assert!(matches!(result, Err(SignatureError::ContentTooLarge(_))), "{:?}", scheme);

        // With room for the whole body, downstream code gets every byte back.
        let options = options.with_max_body_size(4096);
        let request = request.map(|body| Full::new(Bytes::from(body)));
        let (_, body, response) =
            snws_validate_request(request, &mut service, &FixedClock(test_timestamp()), &options).await.unwrap();
        assert_eq!(response.scheme(), scheme);
        assert!(!body.is_overflowed());
        let replayed = body.replay_body().unwrap().collect().await.unwrap().to_bytes();
        assert_eq!(replayed.len(), 2000);
        assert!(replayed.iter().all(|b| *b == b'x'));
    }
}

#[test_log::test(tokio::test)]
async fn check_missing_date() {
    let request = Request::get("https://data.example.com/api/v1/sec/nodes")
        .header("Host", "data.example.com")
        .header("Authorization", "SNWS1 test-token:pvtaXgu56gIgQDqUsMxiM0KFi6E=")
        .body(Vec::new())
        .unwrap();
    assert!(matches!(
        run_validation(request, test_timestamp()).await,
        Err(SignatureError::MissingOrInvalidDate(_))
    ));
}
