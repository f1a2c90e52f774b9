//! Issuing and validating signed tokens which bind a caller to an account number.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

/// Name of the header carrying the token, both on responses and requests.
pub const TOKEN_HEADER: &str = "x-jwt-token";

const TOKEN_TTL: Duration = Duration::hours(24);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub secret: SecretString,
}

/// Claims of an issued token: the issuer is the decimal account number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("cannot sign token")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for the given account number, valid from now for 24 hours.
    pub fn issue(&self, account_number: i64) -> Result<String, TokenError> {
        self.issue_at(account_number, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        account_number: i64,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let iat = issued_at.unix_timestamp();
        let claims = Claims {
            iss: account_number.to_string(),
            iat,
            nbf: iat,
            exp: (issued_at + TOKEN_TTL).unix_timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Sign)
    }

    /// Verify signature, algorithm family and validity period of the given token and return its
    /// claims.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jsonwebtoken::errors::ErrorKind;

    fn token_service(secret: &str) -> TokenService {
        TokenService::new(&Config {
            secret: SecretString::new(secret.to_string()),
        })
    }

    #[test]
    fn test_issue_and_validate() {
        let token_service = token_service("secret");

        let before = OffsetDateTime::now_utc().unix_timestamp();
        let token = token_service.issue(4711).unwrap();
        let claims = token_service.validate(&token).unwrap();

        assert_eq!(claims.iss, "4711");
        assert!(claims.iat >= before);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_expired() {
        let token_service = token_service("secret");

        let issued_at = OffsetDateTime::now_utc() - Duration::hours(25);
        let token = token_service.issue_at(4711, issued_at).unwrap();
        let result = token_service.validate(&token);
        assert_matches!(
            result,
            Err(TokenError::Invalid(error)) if matches!(error.kind(), ErrorKind::ExpiredSignature)
        );
    }

    #[test]
    fn test_not_yet_valid() {
        let token_service = token_service("secret");

        let issued_at = OffsetDateTime::now_utc() + Duration::hours(1);
        let token = token_service.issue_at(4711, issued_at).unwrap();
        let result = token_service.validate(&token);
        assert_matches!(
            result,
            Err(TokenError::Invalid(error)) if matches!(error.kind(), ErrorKind::ImmatureSignature)
        );
    }

    #[test]
    fn test_wrong_secret() {
        let token = token_service("secret").issue(4711).unwrap();
        let result = token_service("other").validate(&token);
        assert_matches!(result, Err(TokenError::Invalid(_)));
    }

    #[test]
    fn test_asymmetric_algorithm_rejected() {
        // Header {"alg":"RS256","typ":"JWT"} with otherwise well-formed claims.
        let token = token_service("secret").issue(4711).unwrap();
        let mut parts = token.split('.');
        let _ = parts.next();
        let rest = parts.collect::<Vec<_>>().join(".");
        let token = format!("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{rest}");

        let result = token_service("secret").validate(&token);
        assert_matches!(
            result,
            Err(TokenError::Invalid(error)) if matches!(error.kind(), ErrorKind::InvalidAlgorithm)
        );
    }

    #[test]
    fn test_garbage() {
        let result = token_service("secret").validate("not-a-token");
        assert_matches!(result, Err(TokenError::Invalid(_)));
    }
}
