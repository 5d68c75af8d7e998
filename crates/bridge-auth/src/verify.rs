//! Identity-token validation against the provider's published key set.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

use crate::error::{AuthError, Result};

/// A JSON Web Key Set as served from the provider's `jwks_uri`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

/// Claims extracted from a validated identity token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub exp: i64,
    pub iss: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Fetch the provider's key set.
pub async fn fetch_jwks(client: &reqwest::Client, jwks_uri: &str) -> Result<Jwks> {
    let response = client
        .get(jwks_uri)
        .send()
        .await
        .map_err(|e| AuthError::Discovery(format!("jwks fetch failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AuthError::Discovery(format!(
            "jwks endpoint returned {}",
            response.status()
        )));
    }

    let jwks: Jwks = response
        .json()
        .await
        .map_err(|e| AuthError::Discovery(format!("invalid jwks document: {}", e)))?;

    if jwks.keys.is_empty() {
        return Err(AuthError::Discovery("jwks contains no keys".to_string()));
    }

    Ok(jwks)
}

/// Whether the key set contains a key usable for the given token.
///
/// Lets the caller refetch the key set once on a signing-key rotation
/// before failing validation outright.
pub fn has_key_for(jwks: &Jwks, token: &str) -> bool {
    match decode_header(token) {
        Ok(header) => select_key(jwks, header.kid.as_deref()).is_some(),
        Err(_) => false,
    }
}

fn select_key<'a>(jwks: &'a Jwks, kid: Option<&str>) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .filter(|key| key.kty == "RSA")
        .find(|key| match kid {
            Some(kid) => key.kid.as_deref() == Some(kid),
            None => true,
        })
}

/// Validate an identity token's signature, issuer, audience, and expiry.
pub fn verify_id_token(
    jwks: &Jwks,
    token: &str,
    issuer: &str,
    client_id: &str,
) -> Result<IdTokenClaims> {
    let header =
        decode_header(token).map_err(|e| AuthError::InvalidToken(format!("bad header: {}", e)))?;

    let key = select_key(jwks, header.kid.as_deref())
        .ok_or_else(|| AuthError::InvalidToken("no matching signing key".to_string()))?;

    let (n, e) = match (&key.n, &key.e) {
        (Some(n), Some(e)) => (n, e),
        _ => {
            return Err(AuthError::InvalidToken(
                "signing key is missing RSA components".to_string(),
            ));
        }
    };

    let decoding_key = DecodingKey::from_rsa_components(n, e)
        .map_err(|e| AuthError::InvalidToken(format!("bad signing key: {}", e)))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[client_id]);

    let data = decode::<IdTokenClaims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_key(kid: Option<&str>) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: kid.map(String::from),
            alg: Some("RS256".to_string()),
            n: Some("AQAB".to_string()),
            e: Some("AQAB".to_string()),
        }
    }

    #[test]
    fn test_select_key_by_kid() {
        let jwks = Jwks {
            keys: vec![rsa_key(Some("old")), rsa_key(Some("new"))],
        };

        assert_eq!(
            select_key(&jwks, Some("new")).and_then(|k| k.kid.as_deref()),
            Some("new")
        );
        assert!(select_key(&jwks, Some("unknown")).is_none());
    }

    #[test]
    fn test_select_key_without_kid_takes_first_rsa() {
        let jwks = Jwks {
            keys: vec![
                Jwk {
                    kty: "EC".to_string(),
                    kid: None,
                    alg: None,
                    n: None,
                    e: None,
                },
                rsa_key(Some("rsa-1")),
            ],
        };

        assert_eq!(
            select_key(&jwks, None).and_then(|k| k.kid.as_deref()),
            Some("rsa-1")
        );
    }

    #[test]
    fn test_verify_rejects_garbage_token() {
        let jwks = Jwks {
            keys: vec![rsa_key(None)],
        };

        let err = verify_id_token(&jwks, "not-a-jwt", "https://idp", "client").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_has_key_for_garbage_token() {
        let jwks = Jwks {
            keys: vec![rsa_key(None)],
        };
        assert!(!has_key_for(&jwks, "not-a-jwt"));
    }
}
