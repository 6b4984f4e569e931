use axum::{
    TypedHeader,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use headers::{Authorization, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::AppState;
use crate::cache;
use crate::config::AuthConfig;
use crate::db::{self, models::AuthUser, models::UserInfo, repositories::users::UserRepo};
use crate::error::{AppError, AppResult};

pub const ACCESS_TOKEN_TYPE: &str = "access";
pub const REFRESH_TOKEN_TYPE: &str = "refresh";
/// 校验 exp 时容许的时钟偏差（秒）
pub const TOKEN_LEEWAY_SECS: u64 = 60;

/// 黑名单保留时长：令牌在校验宽限期内仍然有效，所以要多留一个宽限期
pub fn revocation_ttl(exp: u64, now: u64) -> u64 {
    exp.saturating_sub(now) + TOKEN_LEEWAY_SECS
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid, // user_id
    pub username: String,
    pub token_type: String,
    pub exp: u64,    // expiration time
    pub iat: u64,    // issued at
    pub jti: String, // JWT ID
}

impl Claims {
    pub fn revocation_ttl(&self, now: u64) -> u64 {
        revocation_ttl(self.exp, now)
    }
}

/// 签发与校验访问令牌、刷新令牌
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_ttl: u64,
    refresh_ttl: u64,
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_ttl: config.access_token_expires_in,
            refresh_ttl: config.refresh_token_expires_in,
        }
    }

    pub fn access_ttl(&self) -> u64 {
        self.access_ttl
    }

    fn issue(&self, user_id: Uuid, username: &str, token_type: &str, ttl: u64) -> AppResult<String> {
        let now = unix_now();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            token_type: token_type.to_string(),
            exp: now + ttl,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?)
    }

    pub fn generate_access_token(&self, user_id: Uuid, username: &str) -> AppResult<String> {
        self.issue(user_id, username, ACCESS_TOKEN_TYPE, self.access_ttl)
    }

    pub fn generate_refresh_token(&self, user_id: Uuid, username: &str) -> AppResult<String> {
        self.issue(user_id, username, REFRESH_TOKEN_TYPE, self.refresh_ttl)
    }

    /// 校验签名、过期时间以及令牌类型
    pub fn verify(&self, token: &str, expected_type: &str) -> AppResult<Claims> {
        let mut validation = Validation::default();
        validation.leeway = TOKEN_LEEWAY_SECS;
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )?;

        if token_data.claims.token_type != expected_type {
            return Err(AppError::auth("Invalid token type"));
        }
        Ok(token_data.claims)
    }
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request<axum::body::Body>,
    next: Next<axum::body::Body>,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::auth("Missing bearer token"))?;

    let claims = state.tokens.verify(bearer.token(), ACCESS_TOKEN_TYPE)?;

    match cache::is_token_revoked(&state.redis, &claims.jti).await {
        Ok(true) => return Err(AppError::auth("Token has been revoked")),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "Token revocation check skipped"),
    }

    let user_id = claims.sub;
    let (user, roles) = db::run(&state.db, move |conn| {
        let user = UserRepo::find_by_id(conn, user_id)?
            .ok_or_else(|| AppError::auth("User not found"))?;
        let roles = UserRepo::roles_for_user(conn, user_id)?;
        Ok((user, roles))
    })
    .await?;

    if !user.is_active {
        return Err(AppError::auth("Account is disabled"));
    }

    let info = UserInfo::from_user(&user, &roles);
    let auth_user = AuthUser {
        id: user.id,
        username: user.username,
        real_name: user.real_name,
        department_id: user.department_id,
        is_superuser: user.is_superuser,
        role_ids: roles.iter().map(|r| r.id).collect(),
        permissions: info.permissions,
        token_jti: claims.jti,
        token_exp: claims.exp,
    };

    // 将用户信息添加到请求扩展中
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: "unit-test-secret-0123456789".to_string(),
            access_token_expires_in: 60,
            refresh_token_expires_in: 600,
            bcrypt_cost: 4,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let token = tokens.generate_access_token(user_id, "zhangsan").unwrap();
        let claims = tokens.verify(&token, ACCESS_TOKEN_TYPE).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "zhangsan");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_type_is_enforced() {
        let tokens = service();
        let refresh = tokens.generate_refresh_token(Uuid::new_v4(), "lisi").unwrap();
        assert!(matches!(
            tokens.verify(&refresh, ACCESS_TOKEN_TYPE),
            Err(AppError::Auth { .. })
        ));
        assert!(tokens.verify(&refresh, REFRESH_TOKEN_TYPE).is_ok());
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let token = service()
            .generate_access_token(Uuid::new_v4(), "wangwu")
            .unwrap();
        let other = TokenService::new(&AuthConfig {
            jwt_secret: "a-completely-different-secret".to_string(),
            access_token_expires_in: 60,
            refresh_token_expires_in: 600,
            bcrypt_cost: 4,
        });
        assert!(matches!(
            other.verify(&token, ACCESS_TOKEN_TYPE),
            Err(AppError::Jwt(_))
        ));
    }

    #[test]
    fn test_claims_revocation_ttl_saturates() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "u".into(),
            token_type: ACCESS_TOKEN_TYPE.into(),
            exp: 100,
            iat: 0,
            jti: "j".into(),
        };
        assert_eq!(claims.revocation_ttl(40), 60 + TOKEN_LEEWAY_SECS);
        assert_eq!(claims.revocation_ttl(500), TOKEN_LEEWAY_SECS);
    }

    #[test]
    fn test_revocation_outlives_leeway() {
        // exp 已过 30 秒，仍在校验宽限期内，黑名单必须保留
        assert_eq!(revocation_ttl(100, 130), TOKEN_LEEWAY_SECS);
        assert!(revocation_ttl(100, 130) > 0);
        assert_eq!(revocation_ttl(100, 40), 60 + TOKEN_LEEWAY_SECS);
    }
}
