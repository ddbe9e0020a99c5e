use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user id.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issue an HS256 identity token for `user_id`, valid for `ttl_secs`.
///
/// Fluxbox never logs users in itself; this exists for local tooling and
/// tests that need a token the server will accept.
pub fn encode_jwt(secret: &str, user_id: &str, ttl_secs: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("encode_jwt: {}", e))
}

/// Decode and validate a JWT token.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("decode_jwt: {}", e))?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_subject() {
        let token = encode_jwt("secret", "user_42", 60).expect("encode");
        let claims = decode_jwt(&token, "secret").expect("decode");
        assert_eq!(claims.sub, "user_42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let token = encode_jwt("secret", "user_42", 60).expect("encode");
        assert!(decode_jwt(&token, "other").is_err());

        // Well past the default 60s leeway.
        let expired = encode_jwt("secret", "user_42", -3600).expect("encode");
        assert!(decode_jwt(&expired, "secret").is_err());
    }
}
