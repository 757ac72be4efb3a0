//! Request context extractors.
//!
//! `CurrentUser` guards API routes and rejects with a JSON 401. `PageUser`
//! guards browser pages and redirects to the sign-in page instead.
//! `FieldBag` flattens a form or JSON body into string fields ready for
//! schema validation. Handlers take what they need as arguments, so every
//! bit of request context is explicit in the signature.

use axum::async_trait;
use axum::extract::{Form, FromRef, FromRequest, FromRequestParts, Request};
use axum::http::{header, request::Parts, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::session::{self, AuthError, AuthUser};

/// Name of the browser session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// The resolved user plus the token that authenticated the request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = SqlitePool::from_ref(state);
        let token = request_token(&parts.headers).ok_or(AuthError::MissingSession)?;
        let user = session::resolve(&pool, &token).await?;
        Ok(CurrentUser { user, token })
    }
}

/// Page variant of [`CurrentUser`]: a missing or dead session redirects
/// to /sign-in rather than answering with JSON.
#[derive(Debug, Clone)]
pub struct PageUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for PageUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = SqlitePool::from_ref(state);

        let resolved = match request_token(&parts.headers) {
            Some(token) => session::resolve(&pool, &token).await,
            None => Err(AuthError::MissingSession),
        };

        match resolved {
            Ok(user) => Ok(PageUser(user)),
            Err(AuthError::Store(e)) => {
                tracing::error!("Session store error: {}", e);
                Err(ApiError::Internal.into_response())
            }
            Err(_) => Err(Redirect::to("/sign-in").into_response()),
        }
    }
}

/// Flat string fields from either an urlencoded form or a JSON object.
///
/// Consumes the request body, so it must be the last handler argument.
#[derive(Debug, Default)]
pub struct FieldBag(pub HashMap<String, String>);

#[async_trait]
impl<S> FromRequest<S> for FieldBag
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|_| ApiError::validation("body", "request body must be valid JSON"))?;
            let Value::Object(map) = value else {
                return Err(ApiError::validation("body", "request body must be a JSON object"));
            };

            let mut fields = HashMap::with_capacity(map.len());
            for (key, value) in map {
                let text = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null => continue,
                    _ => {
                        return Err(ApiError::validation(key, "must be a scalar value"));
                    }
                };
                fields.insert(key, text);
            }
            return Ok(FieldBag(fields));
        }

        let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|_| ApiError::validation("body", "request body must be form encoded"))?;
        Ok(FieldBag(fields))
    }
}

/// Bearer header first, then the session cookie.
fn request_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (name, token) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !token.is_empty() {
            Some(token.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn bearer_token_is_preferred_over_cookie() {
        let headers = headers(&[
            ("authorization", "Bearer abc123"),
            ("cookie", "sid=cookie-token"),
        ]);
        assert_eq!(request_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn cookie_token_found_among_other_cookies() {
        let headers = headers(&[("cookie", "theme=dark; sid=xyz789; lang=id")]);
        assert_eq!(request_token(&headers).as_deref(), Some("xyz789"));
    }

    #[test]
    fn malformed_authorization_yields_nothing() {
        assert_eq!(request_token(&headers(&[("authorization", "Token abc")])), None);
        assert_eq!(request_token(&headers(&[("authorization", "Bearer   ")])), None);
        assert_eq!(request_token(&headers(&[("cookie", "sid=")])), None);
        assert_eq!(request_token(&HeaderMap::new()), None);
    }
}
