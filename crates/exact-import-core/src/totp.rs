//! Time-based one-time passwords (RFC 6238) for the second login factor.

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use url::Url;

/// HMAC hash used for code derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotpAlgorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl FromStr for TotpAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SHA1" => Ok(TotpAlgorithm::Sha1),
            "SHA256" => Ok(TotpAlgorithm::Sha256),
            "SHA512" => Ok(TotpAlgorithm::Sha512),
            other => Err(format!("unsupported TOTP algorithm '{}'", other)),
        }
    }
}

/// A shared TOTP secret with its generation parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpSecret {
    key: Vec<u8>,
    pub digits: u32,
    pub period: u64,
    pub algorithm: TotpAlgorithm,
}

impl fmt::Debug for OtpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpSecret")
            .field("key", &"***")
            .field("digits", &self.digits)
            .field("period", &self.period)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl OtpSecret {
    /// Raw key bytes with the usual defaults (6 digits, 30 s, SHA1).
    pub fn from_key(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            digits: 6,
            period: 30,
            algorithm: TotpAlgorithm::Sha1,
        }
    }

    /// Parse an `otpauth://totp/...` URI or a bare base32 secret.
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if input.starts_with("otpauth://") {
            Self::parse_uri(input)
        } else {
            Ok(Self::from_key(decode_base32(input)?))
        }
    }

    fn parse_uri(input: &str) -> Result<Self, String> {
        let url = Url::parse(input).map_err(|e| format!("invalid otpauth URI: {}", e))?;
        if url.host_str() != Some("totp") {
            return Err(format!(
                "otpauth URI must be of type totp, got '{}'",
                url.host_str().unwrap_or("")
            ));
        }

        let mut secret = None;
        let mut otp = Self::from_key(Vec::new());
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "secret" => secret = Some(decode_base32(&value)?),
                "digits" => {
                    otp.digits = value
                        .parse()
                        .ok()
                        .filter(|d| (6..=9).contains(d))
                        .ok_or_else(|| format!("invalid digits '{}'", value))?;
                }
                "period" => {
                    otp.period = value
                        .parse()
                        .ok()
                        .filter(|p| *p > 0)
                        .ok_or_else(|| format!("invalid period '{}'", value))?;
                }
                "algorithm" => otp.algorithm = value.parse()?,
                _ => {}
            }
        }

        otp.key = secret.ok_or_else(|| "otpauth URI has no secret".to_string())?;
        Ok(otp)
    }

    /// Code for the given Unix time in seconds.
    pub fn code_at(&self, unix_seconds: u64) -> Result<String, String> {
        let counter = (unix_seconds / self.period).to_be_bytes();
        let digest = match self.algorithm {
            TotpAlgorithm::Sha1 => hmac_digest::<Hmac<Sha1>>(&self.key, &counter)?,
            TotpAlgorithm::Sha256 => hmac_digest::<Hmac<Sha256>>(&self.key, &counter)?,
            TotpAlgorithm::Sha512 => hmac_digest::<Hmac<Sha512>>(&self.key, &counter)?,
        };

        // RFC 4226 dynamic truncation.
        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = u32::from_be_bytes([
            digest[offset] & 0x7f,
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);
        let code = binary % 10u32.pow(self.digits);
        Ok(format!("{:0width$}", code, width = self.digits as usize))
    }

    /// Code for the current wall-clock time.
    pub fn current_code(&self) -> Result<String, String> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.code_at(now)
    }
}

fn hmac_digest<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, String> {
    let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|e| format!("invalid TOTP key: {}", e))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn decode_base32(input: &str) -> Result<Vec<u8>, String> {
    let normalized: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=' && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if normalized.is_empty() {
        return Err("empty TOTP secret".to_string());
    }
    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|e| format!("TOTP secret is not valid base32: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfc_secret(algorithm: TotpAlgorithm) -> OtpSecret {
        let key: &[u8] = match algorithm {
            TotpAlgorithm::Sha1 => b"12345678901234567890",
            TotpAlgorithm::Sha256 => b"12345678901234567890123456789012",
            TotpAlgorithm::Sha512 => {
                b"1234567890123456789012345678901234567890123456789012345678901234"
            }
        };
        OtpSecret {
            digits: 8,
            algorithm,
            ..OtpSecret::from_key(key)
        }
    }

    #[test]
    fn test_rfc6238_vectors_sha1() {
        let otp = rfc_secret(TotpAlgorithm::Sha1);
        assert_eq!(otp.code_at(59).unwrap(), "94287082");
        assert_eq!(otp.code_at(1111111109).unwrap(), "07081804");
        assert_eq!(otp.code_at(1234567890).unwrap(), "89005924");
        assert_eq!(otp.code_at(20000000000).unwrap(), "65353130");
    }

    #[test]
    fn test_rfc6238_vectors_sha256() {
        let otp = rfc_secret(TotpAlgorithm::Sha256);
        assert_eq!(otp.code_at(59).unwrap(), "46119246");
        assert_eq!(otp.code_at(1111111109).unwrap(), "68084774");
    }

    #[test]
    fn test_rfc6238_vectors_sha512() {
        let otp = rfc_secret(TotpAlgorithm::Sha512);
        assert_eq!(otp.code_at(59).unwrap(), "90693936");
        assert_eq!(otp.code_at(1111111109).unwrap(), "25091201");
    }

    #[test]
    fn test_six_digit_truncation() {
        let otp = OtpSecret::from_key(&b"12345678901234567890"[..]);
        assert_eq!(otp.code_at(59).unwrap(), "287082");
    }

    #[test]
    fn test_parse_bare_base32() {
        // "12345678901234567890" in base32.
        let otp = OtpSecret::parse("gezd gnbv gy3t qojq gezd gnbv gy3t qojq").unwrap();
        assert_eq!(otp.code_at(59).unwrap(), "287082");
        assert_eq!(otp.digits, 6);
        assert_eq!(otp.period, 30);
    }

    #[test]
    fn test_parse_otpauth_uri() {
        let otp = OtpSecret::parse(
            "otpauth://totp/Exact:alice?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&issuer=Exact&digits=8&period=30&algorithm=SHA1",
        )
        .unwrap();
        assert_eq!(otp.digits, 8);
        assert_eq!(otp.algorithm, TotpAlgorithm::Sha1);
        assert_eq!(otp.code_at(59).unwrap(), "94287082");
    }

    #[test]
    fn test_parse_rejects_hotp_uri() {
        let err = OtpSecret::parse("otpauth://hotp/x?secret=GEZDGNBV&counter=1").unwrap_err();
        assert!(err.contains("totp"));
    }

    #[test]
    fn test_parse_rejects_missing_secret() {
        assert!(OtpSecret::parse("otpauth://totp/x?issuer=Exact").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_base32() {
        assert!(OtpSecret::parse("not base32 !!").is_err());
        assert!(OtpSecret::parse("").is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let otp = OtpSecret::from_key(&b"topsecret"[..]);
        assert!(!format!("{:?}", otp).contains("topsecret"));
    }
}
