use bcrypt::{hash, verify};
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    db::models::auth::{ChangePasswordRequest, LoginRequest, LoginResponse, Role, User, UserInfo},
    db::repositories::users::UserRepo,
    error::{AppError, AppResult},
    middleware::auth::TokenService,
    services::context::RequestContext,
    validation::auth::{validate_change_password, validate_login_request},
};

pub struct AuthService;

impl AuthService {
    pub fn hash_password(password: &str, cost: u32) -> AppResult<String> {
        Ok(hash(password, cost)?)
    }

    /// 校验用户名密码，成功后记录最后登录时间
    pub fn authenticate(
        conn: &mut PgConnection,
        req: &LoginRequest,
    ) -> AppResult<(User, Vec<Role>)> {
        validate_login_request(&req.username, &req.password)?;

        let user = UserRepo::find_by_username(conn, req.username.trim())?
            .ok_or_else(|| AppError::auth("Invalid username or password"))?;

        if !verify(&req.password, &user.password_hash)? {
            return Err(AppError::auth("Invalid username or password"));
        }

        if !user.is_active {
            return Err(AppError::auth("Account is disabled"));
        }

        UserRepo::touch_last_login(conn, user.id, Utc::now())?;
        let roles = UserRepo::roles_for_user(conn, user.id)?;
        Ok((user, roles))
    }

    /// 刷新令牌时重新加载用户，停用账号不再签发
    pub fn load_active_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> AppResult<(User, Vec<Role>)> {
        let user = UserRepo::find_by_id(conn, user_id)?
            .ok_or_else(|| AppError::auth("User not found"))?;
        if !user.is_active {
            return Err(AppError::auth("Account is disabled"));
        }
        let roles = UserRepo::roles_for_user(conn, user.id)?;
        Ok((user, roles))
    }

    pub fn issue_tokens(
        tokens: &TokenService,
        user: &User,
        roles: &[Role],
    ) -> AppResult<LoginResponse> {
        Ok(LoginResponse {
            access_token: tokens.generate_access_token(user.id, &user.username)?,
            refresh_token: tokens.generate_refresh_token(user.id, &user.username)?,
            token_type: "Bearer".to_string(),
            expires_in: tokens.access_ttl(),
            user: UserInfo::from_user(user, roles),
        })
    }

    pub fn profile(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<UserInfo> {
        let user = UserRepo::find_by_id(conn, ctx.user_id)?
            .ok_or_else(|| AppError::not_found("user"))?;
        let roles = UserRepo::roles_for_user(conn, user.id)?;
        Ok(UserInfo::from_user(&user, &roles))
    }

    pub fn change_password(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &ChangePasswordRequest,
        cost: u32,
    ) -> AppResult<()> {
        validate_change_password(&req.old_password, &req.new_password)?;

        let user = UserRepo::find_by_id(conn, ctx.user_id)?
            .ok_or_else(|| AppError::not_found("user"))?;
        if !verify(&req.old_password, &user.password_hash)? {
            return Err(AppError::validation("Current password is incorrect"));
        }

        let new_hash = Self::hash_password(&req.new_password, cost)?;
        UserRepo::update_password(conn, user.id, &new_hash)?;
        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}
