//! Request extractor for identities issued by the auth service.
//!
//! The HS256 token is taken from the identity cookie first, then from an
//! `Authorization: Bearer` header so API clients can call `/api` directly.

use std::future::{Ready, ready};

use actix_identity::IdentityExt;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{Error, FromRequest, HttpRequest, error, web};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::domain::auth::AuthenticatedUser;
use crate::models::config::ServerConfig;

/// Verifies `token` and returns its claims.
pub fn decode_token(token: &str, secret: &str) -> Result<AuthenticatedUser, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<AuthenticatedUser>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// Signs claims the same way the auth service does.
pub fn encode_token(
    user: &AuthenticatedUser,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        user,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, Error> {
    let config = req
        .app_data::<web::Data<ServerConfig>>()
        .ok_or_else(|| error::ErrorInternalServerError("server config missing"))?;

    let token = match req.get_identity().ok().and_then(|identity| identity.id().ok()) {
        Some(token) => token,
        None => bearer_token(req).ok_or_else(|| error::ErrorUnauthorized("not signed in"))?,
    };

    decode_token(&token, &config.secret).map_err(|err| {
        log::warn!("Rejected identity token: {err}");
        error::ErrorUnauthorized("invalid token")
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::PATIENT_ROLE;

    fn claims(exp: usize) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "7".into(),
            email: "patient@example.com".into(),
            name: "Pat".into(),
            roles: vec![PATIENT_ROLE.into()],
            exp,
        }
    }

    fn future_exp() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn tokens_round_trip_with_the_shared_secret() {
        let token = encode_token(&claims(future_exp()), "secret").unwrap();
        let decoded = decode_token(&token, "secret").unwrap();
        assert_eq!(decoded.email, "patient@example.com");
        assert!(decode_token(&token, "other").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = encode_token(&claims(1), "secret").unwrap();
        assert!(decode_token(&token, "secret").is_err());
    }

    #[test]
    fn bearer_header_is_read() {
        let req = actix_web::test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def"));
    }
}
