use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use actix_web::http::header::LOCATION;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::DEFAULT_LOGIN_URL;
use crate::error::{AppError, Result as AppResult};
use crate::models::{AuthUser, Viewer};

/// Claims issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (UUID)
    pub sub: String,
    pub username: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// HS256 verifier for identity tokens.
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> AppResult<AuthUser> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| AppError::Forbidden(format!("Invalid token: {}", e)))?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Forbidden("Invalid user ID".to_string()))?;

        Ok(AuthUser {
            id,
            username: data.claims.username,
        })
    }

    /// Issue a token for `user` valid for `ttl_secs`.
    pub fn sign(&self, user: &AuthUser, ttl_secs: i64) -> AppResult<String> {
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            exp: Utc::now().timestamp() + ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

/// Sign a token with a one-hour lifetime.
pub fn sign_token(secret: &str, user: &AuthUser) -> AppResult<String> {
    JwtVerifier::new(secret).sign(user, 3600)
}

/// Where anonymous users are sent when an action needs a login.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub login_url: String,
}

impl Default for LoginRedirect {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

impl LoginRedirect {
    pub fn location_for(&self, next: &str) -> String {
        format!("{}?next={}", self.login_url, urlencoding::encode(next))
    }
}

/// Resolves the request's `Viewer` from an optional Bearer token.
///
/// Never rejects a request: a missing, malformed or expired token yields
/// `Viewer::Anonymous`.
#[derive(Clone)]
pub struct ViewerMiddleware {
    verifier: Arc<JwtVerifier>,
}

impl ViewerMiddleware {
    pub fn new(verifier: Arc<JwtVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ViewerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ViewerMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ViewerMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct ViewerMiddlewareService<S> {
    service: Rc<S>,
    verifier: Arc<JwtVerifier>,
}

impl<S, B> Service<ServiceRequest> for ViewerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let viewer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|token| match self.verifier.verify(token.trim()) {
                Ok(user) => Viewer::Authenticated(user),
                Err(e) => {
                    tracing::debug!("Ignoring bearer token: {}", e);
                    Viewer::Anonymous
                }
            })
            .unwrap_or_default();

        req.extensions_mut().insert(viewer);

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(req
            .extensions()
            .get::<Viewer>()
            .cloned()
            .unwrap_or_default()))
    }
}

/// Extracting `AuthUser` from an anonymous request redirects to the login page.
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(Viewer::Authenticated(user)) = req.extensions().get::<Viewer>() {
            return ready(Ok(user.clone()));
        }

        let redirect = req
            .app_data::<web::Data<LoginRedirect>>()
            .map(|data| data.get_ref().clone())
            .unwrap_or_default();

        let next = match req.uri().path_and_query() {
            Some(pq) => pq.as_str().to_string(),
            None => req.path().to_string(),
        };

        let response = HttpResponse::Found()
            .insert_header((LOCATION, redirect.location_for(&next)))
            .finish();

        ready(Err(
            InternalError::from_response(AppError::Unauthenticated, response).into(),
        ))
    }
}
