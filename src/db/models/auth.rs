use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::validation::rules::{validate_password_strength, validate_username_format};

// User models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub real_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub username: String,
    pub real_name: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub is_superuser: bool,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::users)]
pub struct UpdateUser {
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Role models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub permissions: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn permission_list(&self) -> Vec<String> {
        permissions_from_json(&self.permissions)
    }
}

pub fn permissions_from_json(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::roles)]
pub struct NewRole {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub permissions: serde_json::Value,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::roles)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<serde_json::Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::user_roles)]
pub struct NewUserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RoleBrief {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

impl From<&Role> for RoleBrief {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            code: role.code.clone(),
        }
    }
}

/// 已认证的当前用户，由认证中间件放入请求扩展
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub real_name: String,
    pub department_id: Option<Uuid>,
    pub is_superuser: bool,
    pub role_ids: Vec<Uuid>,
    pub permissions: Vec<String>,
    #[serde(skip)]
    pub token_jti: String,
    #[serde(skip)]
    pub token_exp: u64,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::auth("Unauthorized"))
    }
}

// Authentication DTOs
#[derive(Deserialize, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserInfo,
}

#[derive(Deserialize, Serialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub old_password: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub new_password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub real_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub roles: Vec<RoleBrief>,
    pub permissions: Vec<String>,
}

impl UserInfo {
    pub fn from_user(user: &User, roles: &[Role]) -> Self {
        let mut permissions: Vec<String> = roles.iter().flat_map(Role::permission_list).collect();
        permissions.sort();
        permissions.dedup();

        Self {
            id: user.id,
            username: user.username.clone(),
            real_name: user.real_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            position: user.position.clone(),
            department_id: user.department_id,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            last_login_at: user.last_login_at,
            roles: roles.iter().map(RoleBrief::from).collect(),
            permissions,
        }
    }
}

// User management DTOs
#[derive(Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 3, max = 64, message = "Username must be between 3 and 64 characters"),
        custom(function = "validate_username_format")
    )]
    pub username: String,

    #[validate(length(min = 1, max = 64, message = "Real name must be between 1 and 64 characters"))]
    pub real_name: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub position: Option<String>,
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 64, message = "Real name must be between 1 and 64 characters"))]
    pub real_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub position: Option<String>,
    pub department_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

#[derive(Deserialize)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<Uuid>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub department_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 64, message = "Role name must be between 1 and 64 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 64, message = "Role code must be between 1 and 64 characters"))]
    pub code: String,

    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 64, message = "Role name must be between 1 and 64 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role(code: &str, perms: serde_json::Value) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: code.to_string(),
            code: code.to_string(),
            description: None,
            permissions: perms,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_permissions_from_json_ignores_non_strings() {
        let perms = permissions_from_json(&json!(["supervision:read", 3, null, "user:manage"]));
        assert_eq!(perms, vec!["supervision:read", "user:manage"]);
        assert!(permissions_from_json(&json!({"a": 1})).is_empty());
    }

    #[test]
    fn test_user_info_merges_role_permissions() {
        let user = User {
            id: Uuid::new_v4(),
            username: "zhangsan".into(),
            real_name: "Zhang San".into(),
            password_hash: "hash".into(),
            email: None,
            phone: None,
            position: None,
            department_id: None,
            is_active: true,
            is_superuser: false,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let roles = vec![
            role("supervisor", json!(["supervision:read", "supervision:update"])),
            role("manager", json!(["supervision:read", "department:manage"])),
        ];
        let info = UserInfo::from_user(&user, &roles);
        assert_eq!(
            info.permissions,
            vec!["department:manage", "supervision:read", "supervision:update"]
        );
        assert_eq!(info.roles.len(), 2);

        let serialized = serde_json::to_value(&user).unwrap();
        assert!(serialized.get("password_hash").is_none());
    }
}
