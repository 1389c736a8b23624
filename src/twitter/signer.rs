//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! Twitter's OAuth endpoints accept only header-based OAuth 1.0a
//! authentication, never bearer tokens, so every call goes through this
//! signer. The construction must match the standard byte-for-byte:
//! percent-encoding per RFC 3986, lexical parameter sort, the
//! `METHOD&url&params` base string, and a base64 HMAC-SHA1 signature.

use anyhow::anyhow;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use sha1::Sha1;

use crate::error::{AppError, Result};

/// Characters that must be percent-encoded in OAuth signatures.
/// RFC 3986 unreserved characters: ALPHA / DIGIT / "-" / "." / "_" / "~"
const OAUTH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Token credentials used for signing: the request token during the
/// exchange, the access token afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    pub key: &'a str,
    pub secret: &'a str,
}

/// OAuth 1.0a signer bound to one consumer key pair.
#[derive(Debug, Clone)]
pub struct OauthSigner {
    consumer_key: String,
    consumer_secret: String,
}

impl OauthSigner {
    /// A missing consumer key is a programmer error, not a runtime
    /// condition, so the constructor asserts.
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        let consumer_key = consumer_key.into();
        let consumer_secret = consumer_secret.into();
        assert!(!consumer_key.is_empty(), "OAuth consumer key must be set");
        assert!(
            !consumer_secret.is_empty(),
            "OAuth consumer secret must be set"
        );
        Self {
            consumer_key,
            consumer_secret,
        }
    }

    /// Produce the `Authorization` header value for a request.
    ///
    /// `url` is the base URL without a query string; query and form
    /// parameters join the signature via `extra_params`.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        token: Option<Token<'_>>,
        extra_params: &[(String, String)],
    ) -> Result<String> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow!("system clock before epoch: {e}")))?
            .as_secs();
        let nonce = generate_nonce();

        self.authorization_header_at(method, url, token, extra_params, &nonce, timestamp)
    }

    /// Signing with a caller-supplied nonce and timestamp. The output is
    /// fully deterministic, which is what interoperability tests need.
    pub fn authorization_header_at(
        &self,
        method: &str,
        url: &str,
        token: Option<Token<'_>>,
        extra_params: &[(String, String)],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                "HMAC-SHA1".to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];
        if let Some(token) = token {
            oauth_params.push(("oauth_token".to_string(), token.key.to_string()));
        }

        // Percent-encode every key and value, then sort lexically by
        // encoded key and value.
        let mut encoded: Vec<(String, String)> = oauth_params
            .iter()
            .chain(extra_params.iter())
            .map(|(k, v)| (percent_encode(k), percent_encode(v)))
            .collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            percent_encode(url),
            percent_encode(&param_string)
        );

        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(token.map(|t| t.secret).unwrap_or(""))
        );

        let signature = hmac_sha1(&signing_key, &base_string)?;
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {header}"))
    }
}

fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Fresh random value per signed request; 32 hex chars.
pub fn generate_nonce() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hmac_sha1(key: &str, data: &str) -> Result<String> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| AppError::Internal(anyhow!("HMAC init failed: {e}")))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("foo=bar&baz"), "foo%3Dbar%26baz");
        assert_eq!(percent_encode("safe-chars_123.txt"), "safe-chars_123.txt");
        assert_eq!(percent_encode("~tilde"), "~tilde");
        assert_eq!(
            percent_encode("Ladies + Gentlemen"),
            "Ladies%20%2B%20Gentlemen"
        );
    }

    #[test]
    fn test_generate_nonce_shape() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    /// The worked example from Twitter's "Creating a signature"
    /// documentation, reproduced byte-for-byte with the documented nonce
    /// and timestamp.
    #[test]
    fn test_reference_signature() {
        let signer = OauthSigner::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
        );
        let token = Token {
            key: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        };
        let extra = vec![
            ("include_entities".to_string(), "true".to_string()),
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
        ];

        let header = signer
            .authorization_header_at(
                "POST",
                "https://api.twitter.com/1/statuses/update.json",
                Some(token),
                &extra,
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
                1318622958,
            )
            .unwrap();

        // Documented signature for this exact request
        assert!(
            header.contains("oauth_signature=\"tnnArxj06cWHq44gCs1OSKk%2FjLY%3D\""),
            "header was: {header}"
        );
    }

    #[test]
    fn test_signing_is_deterministic_for_fixed_inputs() {
        let signer = OauthSigner::new("key", "secret");
        let sign = || {
            signer
                .authorization_header_at(
                    "GET",
                    "https://api.twitter.com/1.1/account/verify_credentials.json",
                    None,
                    &[],
                    "fixednonce",
                    1700000000,
                )
                .unwrap()
        };
        assert_eq!(sign(), sign());
    }

    #[test]
    fn test_header_contains_protocol_params() {
        let signer = OauthSigner::new("ck", "cs");
        let header = signer
            .authorization_header("POST", "https://api.twitter.com/oauth/request_token", None, &[])
            .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"ck\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_signature="));
        assert!(header.contains("oauth_nonce="));
        assert!(header.contains("oauth_timestamp="));
        assert!(header.contains("oauth_version=\"1.0\""));
        // No token on the request-token leg
        assert!(!header.contains("oauth_token="));
    }

    #[test]
    #[should_panic(expected = "consumer key")]
    fn test_empty_consumer_key_is_a_precondition() {
        OauthSigner::new("", "secret");
    }
}
