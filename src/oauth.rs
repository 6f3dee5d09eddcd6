//! OAuth 1.0a request signing and token persistence.
//!
//! Flickr signs every request with HMAC-SHA1 over the method, the URL and
//! the sorted, percent-encoded parameters. Signed parameters are sent in
//! the query string.

use std::{collections::HashMap, fs, path::Path};

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as they are, everything else is encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct Consumer {
    pub key: String,
    pub secret: String,
}

impl Consumer {
    pub fn new(key: &str, secret: &str) -> Consumer {
        Consumer {
            key: key.to_string(),
            secret: secret.to_string(),
        }
    }
}

/// Temporary credentials handed out before the user grants access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub oauth_token: String,
    pub oauth_token_secret: String,
}

/// Long lived credentials, stored in the token file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default)]
    pub user_nsid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl AccessToken {
    pub fn load(path: &Path) -> Result<AccessToken> {
        let contents = fs::read_to_string(path).map_err(|e| token_error(path, e))?;
        serde_json::from_str(&contents).map_err(|e| token_error(path, e))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|e| token_error(path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .map_err(|e| token_error(path, e))?;
        }

        Ok(())
    }
}

fn token_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Token {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// Computes the base64 HMAC-SHA1 signature of a request.
pub fn signature(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{method}&{url}&{params}",
        method = method.to_uppercase(),
        url = encode(url),
        params = encode(&param_string)
    );
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| Error::OAuth(format!("Invalid signing key: {e}")))?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Adds the `oauth_*` protocol parameters and the signature to `params`.
pub fn sign(
    method: &str,
    url: &str,
    mut params: Vec<(String, String)>,
    consumer: &Consumer,
    token: Option<(&str, &str)>,
) -> Result<Vec<(String, String)>> {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();

    params.push(("oauth_consumer_key".into(), consumer.key.clone()));
    params.push(("oauth_nonce".into(), nonce));
    params.push(("oauth_signature_method".into(), "HMAC-SHA1".into()));
    params.push(("oauth_timestamp".into(), timestamp));
    params.push(("oauth_version".into(), "1.0".into()));

    let token_secret = match token {
        Some((token, secret)) => {
            params.push(("oauth_token".into(), token.to_string()));
            secret
        }
        None => "",
    };

    let signature = signature(method, url, &params, &consumer.secret, token_secret)?;
    params.push(("oauth_signature".into(), signature));

    Ok(params)
}

/// Token endpoints answer with a form encoded body.
pub fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}

pub fn request_token_from(body: &str) -> Result<RequestToken> {
    let mut fields = parse_form(body);
    if let Some(problem) = fields.remove("oauth_problem") {
        return Err(Error::OAuth(problem));
    }

    match (
        fields.remove("oauth_token"),
        fields.remove("oauth_token_secret"),
    ) {
        (Some(oauth_token), Some(oauth_token_secret)) => Ok(RequestToken {
            oauth_token,
            oauth_token_secret,
        }),
        _ => Err(Error::OAuth(format!("Unexpected token response: {body}"))),
    }
}

pub fn access_token_from(body: &str) -> Result<AccessToken> {
    let request_token = request_token_from(body)?;
    let mut fields = parse_form(body);

    Ok(AccessToken {
        oauth_token: request_token.oauth_token,
        oauth_token_secret: request_token.oauth_token_secret,
        user_nsid: fields.remove("user_nsid"),
        username: fields.remove("username"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn signature_matches_published_example() {
        let params = pairs(&[
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            (
                "oauth_token",
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            ),
            ("oauth_version", "1.0"),
        ]);

        let signature = signature(
            "post",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
        .unwrap();

        assert_eq!("hCtSmYh+iHYCEqBWrE7C7hYmtUk=", signature);
    }

    #[test]
    fn encode_keeps_unreserved() {
        assert_eq!("a-b._~c", encode("a-b._~c"));
        assert_eq!("Ladies%20%2B%20Gentlemen%21", encode("Ladies + Gentlemen!"));
    }

    #[test]
    fn sign_adds_protocol_params() {
        let consumer = Consumer::new("key", "secret");
        let params = sign(
            "GET",
            "https://api.flickr.com/services/rest",
            pairs(&[("method", "flickr.test.login")]),
            &consumer,
            Some(("token", "token-secret")),
        )
        .unwrap();

        let names: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        for expected in [
            "method",
            "oauth_consumer_key",
            "oauth_nonce",
            "oauth_signature_method",
            "oauth_timestamp",
            "oauth_version",
            "oauth_token",
            "oauth_signature",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn access_token_response() {
        let body = "fullname=Jamal%20Fanaian&oauth_token=72157626318069415-087bfc7b5816092c\
                    &oauth_token_secret=a202d1f853ec69de&user_nsid=21207597%40N07&username=jamalfanaian";

        let token = access_token_from(body).unwrap();

        assert_eq!("72157626318069415-087bfc7b5816092c", token.oauth_token);
        assert_eq!("a202d1f853ec69de", token.oauth_token_secret);
        assert_eq!(Some("21207597@N07"), token.user_nsid.as_deref());
        assert_eq!(Some("jamalfanaian"), token.username.as_deref());
    }

    #[test]
    fn token_problem_is_an_error() {
        let result = request_token_from("oauth_problem=signature_invalid");
        assert!(matches!(result, Err(Error::OAuth(p)) if p == "signature_invalid"));
    }

    #[test]
    fn token_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token");
        let token = AccessToken {
            oauth_token: "t".into(),
            oauth_token_secret: "s".into(),
            user_nsid: Some("1@N00".into()),
            username: None,
        };

        token.save(&path).unwrap();

        assert_eq!(token, AccessToken::load(&path).unwrap());
    }

    #[test]
    fn broken_token_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(AccessToken::load(&path), Err(Error::Token { .. })));
    }
}
