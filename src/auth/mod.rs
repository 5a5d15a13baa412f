//! Password hashing, JWT issuance, and the request extractors that
//! gate the storefront and admin surfaces.
//!
//! Customers and admins get separate tokens carrying a `kind` claim, so
//! a customer token can never be replayed against an admin route. Tokens
//! travel either in a cookie (browser clients) or a bearer header.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

pub const CUSTOMER_TOKEN_COOKIE: &str = "customer_token";
pub const ADMIN_TOKEN_COOKIE: &str = "admin_token";

/// Which surface a token was minted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Customer,
    Admin,
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,     // Subject (customer or admin ID)
    pub kind: TokenKind, // Surface the token is valid for
    pub email: String,
    pub jti: String, // Unique identifier for this token
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// A freshly minted token plus its lifetime, for the login response body
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Handles password hashing and token issuance/validation
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    customer_token_ttl: i64,
    admin_token_ttl: i64,
}

impl AuthService {
    pub fn new(
        jwt_secret: &str,
        issuer: String,
        audience: String,
        customer_token_ttl: i64,
        admin_token_ttl: i64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            issuer,
            audience,
            customer_token_ttl,
            admin_token_ttl,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.auth_issuer.clone(),
            config.auth_audience.clone(),
            config.jwt_expiration as i64,
            config.admin_jwt_expiration as i64,
        )
    }

    /// Hashes a password with Argon2id and a per-password salt
    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {}", e)))
    }

    /// Checks a candidate password against a stored hash. The error is
    /// deliberately the same for a malformed hash and a wrong password.
    pub fn verify_password(&self, password: &str, password_hash: &str) -> Result<(), ServiceError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|_| ServiceError::Unauthorized("Invalid email or password".into()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| ServiceError::Unauthorized("Invalid email or password".into()))
    }

    pub fn issue_token(
        &self,
        kind: TokenKind,
        subject: Uuid,
        email: &str,
    ) -> Result<IssuedToken, ServiceError> {
        let ttl = match kind {
            TokenKind::Customer => self.customer_token_ttl,
            TokenKind::Admin => self.admin_token_ttl,
        };
        let now = Utc::now();
        let expires_at = now + ChronoDuration::seconds(ttl);

        let claims = Claims {
            sub: subject.to_string(),
            kind,
            email: email.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("token creation failed: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_in: ttl,
        })
    }

    /// Validates a JWT and checks it was minted for the expected surface
    pub fn verify_token(&self, token: &str, expected: TokenKind) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ServiceError::Unauthorized("Token has expired".into())
                }
                _ => ServiceError::Unauthorized("Invalid authentication token".into()),
            })?
            .claims;

        if claims.kind != expected {
            return Err(ServiceError::Unauthorized(
                "Token not valid for this surface".into(),
            ));
        }
        Ok(claims)
    }
}

/// The authenticated customer behind a storefront request
#[derive(Debug, Clone)]
pub struct CustomerIdentity {
    pub id: Uuid,
    pub email: String,
}

impl CustomerIdentity {
    /// Actor string recorded in audit trails
    pub fn actor(&self) -> String {
        format!("customer:{}", self.id)
    }
}

/// The authenticated admin behind an administration request
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub email: String,
}

impl AdminIdentity {
    pub fn actor(&self) -> String {
        format!("admin:{}", self.id)
    }
}

/// Extractor requiring a valid customer token.
///
/// ```rust,ignore
/// async fn my_cart(CustomerAuth(customer): CustomerAuth) -> impl IntoResponse {
///     format!("cart of {}", customer.id)
/// }
/// ```
pub struct CustomerAuth(pub CustomerIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for CustomerAuth
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthService::from_ref(state);
        let token = token_from_parts(parts, CUSTOMER_TOKEN_COOKIE)
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))?;
        let claims = auth.verify_token(&token, TokenKind::Customer)?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid authentication token".into()))?;
        Ok(Self(CustomerIdentity {
            id,
            email: claims.email,
        }))
    }
}

/// Extractor requiring a valid admin token
pub struct AdminAuth(pub AdminIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthService::from_ref(state);
        let token = token_from_parts(parts, ADMIN_TOKEN_COOKIE)
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))?;
        let claims = auth.verify_token(&token, TokenKind::Admin)?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid authentication token".into()))?;
        Ok(Self(AdminIdentity {
            id,
            email: claims.email,
        }))
    }
}

/// Cookie first, then the Authorization header
fn token_from_parts(parts: &Parts, cookie_name: &str) -> Option<String> {
    cookie_value(parts, cookie_name).or_else(|| bearer_token(parts))
}

fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    let raw = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let mut kv = pair.trim().splitn(2, '=');
        if kv.next() == Some(name) {
            return kv.next().map(|v| v.trim().to_string());
        }
    }
    None
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    raw.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

/// Builds the Set-Cookie value carrying a session token
pub fn session_cookie(name: &str, token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the Set-Cookie value that clears a session cookie on logout
pub fn expired_cookie(name: &str, secure: bool) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn test_service() -> AuthService {
        AuthService::new(
            "test_secret_0123456789_0123456789_0123456789_0123456789_0123456789",
            "pharmahub-api".into(),
            "pharmahub".into(),
            3600,
            1800,
        )
    }

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/cart");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn password_hash_roundtrip() {
        let auth = test_service();
        let hash = auth.hash_password("S3cret-enough-for-tests").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(auth.verify_password("S3cret-enough-for-tests", &hash).is_ok());
        assert!(auth.verify_password("wrong-password", &hash).is_err());
    }

    #[test]
    fn malformed_hash_reads_as_wrong_password() {
        let auth = test_service();
        let err = auth
            .verify_password("anything", "not-a-phc-string")
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn issued_token_verifies_with_matching_kind() {
        let auth = test_service();
        let id = Uuid::new_v4();
        let issued = auth
            .issue_token(TokenKind::Customer, id, "pharmacy@example.com")
            .unwrap();
        assert_eq!(issued.expires_in, 3600);

        let claims = auth.verify_token(&issued.token, TokenKind::Customer).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.email, "pharmacy@example.com");
    }

    #[test]
    fn customer_token_is_rejected_on_admin_surface() {
        let auth = test_service();
        let issued = auth
            .issue_token(TokenKind::Customer, Uuid::new_v4(), "c@example.com")
            .unwrap();
        let err = auth.verify_token(&issued.token, TokenKind::Admin).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Negative TTL well past the validation leeway.
        let auth = AuthService::new(
            "test_secret_0123456789_0123456789_0123456789_0123456789_0123456789",
            "pharmahub-api".into(),
            "pharmahub".into(),
            -300,
            -300,
        );
        let issued = auth
            .issue_token(TokenKind::Customer, Uuid::new_v4(), "c@example.com")
            .unwrap();
        let err = auth
            .verify_token(&issued.token, TokenKind::Customer)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let auth = test_service();
        let other = AuthService::new(
            "different_secret_0123456789_0123456789_0123456789_0123456789_00",
            "pharmahub-api".into(),
            "pharmahub".into(),
            3600,
            1800,
        );
        let issued = other
            .issue_token(TokenKind::Customer, Uuid::new_v4(), "c@example.com")
            .unwrap();
        assert!(auth.verify_token(&issued.token, TokenKind::Customer).is_err());
    }

    #[test]
    fn cookie_wins_over_bearer_header() {
        let parts = parts_with_headers(&[
            ("cookie", "theme=dark; customer_token=from-cookie"),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(
            token_from_parts(&parts, CUSTOMER_TOKEN_COOKIE).as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn bearer_header_is_the_fallback() {
        let parts = parts_with_headers(&[("authorization", "Bearer from-header")]);
        assert_eq!(
            token_from_parts(&parts, CUSTOMER_TOKEN_COOKIE).as_deref(),
            Some("from-header")
        );
        assert_eq!(token_from_parts(&parts, ADMIN_TOKEN_COOKIE).as_deref(), Some("from-header"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let parts = parts_with_headers(&[]);
        assert!(token_from_parts(&parts, CUSTOMER_TOKEN_COOKIE).is_none());
    }

    #[test]
    fn session_cookie_flags() {
        let cookie = session_cookie(CUSTOMER_TOKEN_COOKIE, "tok", 3600, true);
        assert!(cookie.contains("customer_token=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=3600"));

        let cleared = expired_cookie(CUSTOMER_TOKEN_COOKIE, false);
        assert!(cleared.contains("Max-Age=0"));
        assert!(!cleared.contains("Secure"));
    }
}
