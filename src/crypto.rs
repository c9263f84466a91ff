use {
    crate::constants::{MD5_OUTPUT_LEN, SHA256_OUTPUT_LEN},
    hmac::{Hmac, Mac},
    md5::Md5,
    sha1::Sha1,
    sha2::{Digest, Sha256},
};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Wrapper function to form a HMAC-SHA1 operation.
#[inline(always)]
pub(crate) fn hmac_sha1(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(value);
    mac.finalize().into_bytes().to_vec()
}

/// Wrapper function to form a HMAC-SHA256 operation.
#[inline(always)]
pub(crate) fn hmac_sha256(key: &[u8], value: &[u8]) -> [u8; SHA256_OUTPUT_LEN] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(value);
    mac.finalize().into_bytes().into()
}

#[inline(always)]
pub(crate) fn md5(value: &[u8]) -> [u8; MD5_OUTPUT_LEN] {
    Md5::digest(value).into()
}

#[inline(always)]
pub(crate) fn sha256(value: &[u8]) -> [u8; SHA256_OUTPUT_LEN] {
    Sha256::digest(value).into()
}

#[inline(always)]
pub(crate) fn sha256_hex(value: &[u8]) -> String {
    hex::encode(sha256(value))
}

#[cfg(test)]
mod tests {
    use super::{hmac_sha1, hmac_sha256, md5, sha256_hex};

    #[test_log::test]
    fn test_known_digests() {
        assert_eq!(sha256_hex(b""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
        assert_eq!(hex::encode(md5(b"Hello, world.")), "080aef839b95facf73ec599375e92d47");
    }

    #[test_log::test]
    fn test_rfc2202_hmac_sha1() {
        // RFC 2202, test case 2.
        assert_eq!(
            hex::encode(hmac_sha1(b"Jefe", b"what do ya want for nothing?")),
            "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79"
        );
    }

    #[test_log::test]
    fn test_rfc4231_hmac_sha256() {
        // RFC 4231, test case 2.
        assert_eq!(
            hex::encode(hmac_sha256(b"Jefe", b"what do ya want for nothing?")),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
