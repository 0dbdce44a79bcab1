//! Token authentication and per-module authorization.
//!
//! `POST /auth/login` trades a username and password for an access/refresh
//! pair, `POST /auth/refresh` rotates the pair and `POST /auth/logout` revokes
//! the presented access token. API routers opt in through [`AuthRouterExt`].

use crate::config::AuthSettings;
use crate::db::DbPool;
use crate::entities::user;
use async_trait::async_trait;
use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

mod password;
mod permissions;

pub use password::*;
pub use permissions::*;

/// Login and refresh bodies are tiny
const AUTH_BODY_LIMIT: usize = 64 * 1024;

/// Refresh tokens can only mint new pairs; only access tokens reach the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload. Grants ride on access tokens only.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    /// `module:action` strings
    pub permissions: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

/// The caller, as established by [`auth_middleware`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub token_id: String,
}

pub type AuthenticatedUser = AuthUser;

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Admins pass every permission check
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin() || self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }

    fn satisfies(&self, requirement: &Requirement) -> bool {
        match requirement {
            Requirement::Permission(permission) => self.has_permission(permission),
            Requirement::Role(role) => self.has_role(role),
        }
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.kind != TokenKind::Access {
            return Err(AuthError::InvalidToken);
        }
        Ok(AuthUser {
            user_id: claims.sub.parse().map_err(|_| AuthError::InvalidToken)?,
            username: claims.name.unwrap_or_default(),
            roles: claims.roles,
            permissions: claims.permissions,
            token_id: claims.jti,
        })
    }
}

/// Issues, verifies and revokes tokens for ERP users
#[derive(Debug, Clone)]
pub struct AuthService {
    pub settings: AuthSettings,
    db: Arc<DbPool>,
    /// Revoked token ids and the moment each would have expired anyway
    revoked: Arc<RwLock<HashMap<String, i64>>>,
}

impl AuthService {
    pub fn new(settings: AuthSettings, db: Arc<DbPool>) -> Self {
        Self {
            settings,
            db,
            revoked: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        match found {
            Some(account) if verify_password(password, &account.password_hash) => {
                info!(user_id = account.id, "user logged in");
                self.generate_token(&account)
            }
            _ => {
                warn!(username, "failed login attempt");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    fn claims(&self, account: &user::Model, kind: TokenKind, ttl_secs: u64) -> Claims {
        let now = Utc::now().timestamp();
        let (name, roles, permissions) = match kind {
            TokenKind::Access => (
                Some(account.username.clone()),
                vec![account.role.clone()],
                flatten_permissions(&account.permissions),
            ),
            // Grants are reloaded from the database when the pair is refreshed
            TokenKind::Refresh => (None, Vec::new(), Vec::new()),
        };
        Claims {
            sub: account.id.to_string(),
            name,
            roles,
            permissions,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            kind,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn generate_token(&self, account: &user::Model) -> Result<TokenPair, AuthError> {
        let access = self.claims(account, TokenKind::Access, self.settings.access_ttl_secs);
        let refresh = self.claims(account, TokenKind::Refresh, self.settings.refresh_ttl_secs);

        Ok(TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: self.settings.access_ttl_secs as i64,
            refresh_expires_in: self.settings.refresh_ttl_secs as i64,
        })
    }

    /// Signature, issuer, audience, expiry and revocation are all checked
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        validation.set_audience(&[self.settings.audience.as_str()]);

        let key = DecodingKey::from_secret(self.settings.jwt_secret.as_bytes());
        let claims = match decode::<Claims>(token, &key, &validation) {
            Ok(data) => data.claims,
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                return Err(AuthError::TokenExpired)
            }
            Err(_) => return Err(AuthError::InvalidToken),
        };

        if self.revoked.read().await.contains_key(&claims.jti) {
            return Err(AuthError::RevokedToken);
        }
        Ok(claims)
    }

    /// Issues a fresh pair for a refresh token and retires the old one
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(refresh_token).await?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }

        let user_id: i32 = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        let pair = self.generate_token(&account)?;
        self.revoke(claims.jti, claims.exp).await;
        debug!(user_id, "refresh token rotated");
        Ok(pair)
    }

    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;
        self.revoke(claims.jti, claims.exp).await;
        Ok(())
    }

    async fn revoke(&self, jti: String, exp: i64) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti, exp);
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::MissingAuth)?;
        self.validate_token(token).await?.try_into()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginCredentials {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid authentication token")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Authentication token has been revoked")]
    RevokedToken,
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
    #[error("User not found")]
    UserNotFound,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions => StatusCode::FORBIDDEN,
            Self::TokenCreation(_) | Self::DatabaseError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable machine-readable code for clients
    fn code(&self) -> &'static str {
        match self {
            Self::MissingAuth => "AUTH_MISSING",
            Self::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            Self::InvalidToken => "AUTH_INVALID_TOKEN",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::RevokedToken => "AUTH_REVOKED_TOKEN",
            Self::TokenCreation(_) => "AUTH_TOKEN_CREATION_FAILED",
            Self::UserNotFound => "AUTH_USER_NOT_FOUND",
            Self::InsufficientPermissions => "AUTH_INSUFFICIENT_PERMISSIONS",
            Self::DatabaseError(_) => "AUTH_DATABASE_ERROR",
            Self::InternalError(_) => "AUTH_INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "authentication failure");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": { "code": self.code(), "message": message }
        });
        (status, Json(body)).into_response()
    }
}

/// Handlers behind `with_auth` take the caller as an extractor
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the bearer token into an [`AuthUser`] request extension
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, AuthError> {
    let service = request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or_else(|| AuthError::InternalError("authentication service not installed".into()))?;

    let caller = service.authenticate(request.headers()).await?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

#[derive(Debug, Clone)]
enum Requirement {
    Permission(String),
    Role(String),
}

async fn authorize(
    State(requirement): State<Requirement>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let caller = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !caller.satisfies(&requirement) {
        debug!(user_id = caller.user_id, ?requirement, "access denied");
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(next.run(request).await)
}

/// Guards for API routers. Each guard authenticates first.
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(middleware::from_fn_with_state(
            Requirement::Permission(permission.to_string()),
            authorize,
        ))
        .with_auth()
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(middleware::from_fn_with_state(
            Requirement::Role(role.to_string()),
            authorize,
        ))
        .with_auth()
    }
}

pub fn auth_routes() -> Router<Arc<AuthService>> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/refresh", post(refresh_token_handler))
        .route("/logout", post(logout_handler))
        .layer(DefaultBodyLimit::max(AUTH_BODY_LIMIT))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginCredentials,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth): State<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<TokenPair>, AuthError> {
    auth.login(&credentials.username, &credentials.password)
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    tag = "auth"
)]
pub async fn refresh_token_handler(
    State(auth): State<Arc<AuthService>>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    auth.refresh_token(&body.refresh_token).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Access token revoked"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout_handler(
    State(auth): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingAuth)?;
    auth.revoke_token(token).await?;
    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn caller(role: &str, permissions: &[&str]) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            roles: vec![role.into()],
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            token_id: "t".into(),
        }
    }

    fn planner(role: &str) -> user::Model {
        user::Model {
            id: 7,
            username: "planner".into(),
            password_hash: hash_password("pw").unwrap(),
            role: role.into(),
            permissions: json!({"planning": {"view": true, "edit": true}}),
            profile_picture: "placeholder_user.jpg".into(),
            created_at: Utc::now(),
        }
    }

    async fn service() -> AuthService {
        let db = crate::db::connect_url("sqlite::memory:")
            .await
            .unwrap();
        let mut settings = AuthSettings::new("x".repeat(64));
        settings.access_ttl_secs = 600;
        AuthService::new(settings, Arc::new(db))
    }

    #[test]
    fn admin_role_is_case_insensitive_and_grants_everything() {
        let admin = caller("Admin", &[]);
        assert!(admin.is_admin());
        assert!(admin.has_permission(consts::HR_DELETE));

        let clerk = caller("user", &[consts::ORDERS_VIEW]);
        assert!(clerk.has_permission(consts::ORDERS_VIEW));
        assert!(!clerk.has_permission(consts::ORDERS_EDIT));
        assert!(!clerk.satisfies(&Requirement::Role("admin".into())));
    }

    #[tokio::test]
    async fn access_token_carries_grants() {
        let svc = service().await;
        let pair = svc.generate_token(&planner("user")).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 600);

        let claims = svc.validate_token(&pair.access_token).await.unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.permissions.contains(&"planning:edit".to_string()));

        let refresh = svc.validate_token(&pair.refresh_token).await.unwrap();
        assert!(refresh.permissions.is_empty());
        assert!(AuthUser::try_from(refresh).is_err());
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let svc = service().await;
        let pair = svc.generate_token(&planner("user")).unwrap();
        svc.revoke_token(&pair.access_token).await.unwrap();
        assert!(matches!(
            svc.validate_token(&pair.access_token).await,
            Err(AuthError::RevokedToken)
        ));
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_invalid() {
        let svc = service().await;
        let mut other = svc.clone();
        other.settings.jwt_secret = "y".repeat(64);
        let pair = other.generate_token(&planner("user")).unwrap();
        assert!(matches!(
            svc.validate_token(&pair.access_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn access_token_cannot_be_used_to_refresh() {
        let svc = service().await;
        let pair = svc.generate_token(&planner("user")).unwrap();
        assert!(matches!(
            svc.refresh_token(&pair.access_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_none());
        headers.insert(header::AUTHORIZATION, "Bearer  abc ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
