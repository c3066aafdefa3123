/// HTTP middleware utilities for blog-service
///
/// Provides viewer resolution from Bearer tokens, the `Viewer` / `AuthUser`
/// extractors and ownership checks used by the mutation handlers.
pub mod auth;
pub mod permissions;

pub use auth::{sign_token, Claims, JwtVerifier, LoginRedirect, ViewerMiddleware};
pub use permissions::*;
