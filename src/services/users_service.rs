use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    db::models::api::{Page, PageParams, error_codes},
    db::models::auth::{
        CreateUserRequest, NewUser, UpdateUser, UpdateUserRequest, User, UserFilter, UserInfo,
    },
    db::repositories::{departments::DepartmentRepo, roles::RoleRepo, users::UserRepo},
    error::{AppError, AppResult},
    services::auth_service::AuthService,
    services::context::{RequestContext, permissions},
};

pub struct UsersService;

impl UsersService {
    pub fn list(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        filter: &UserFilter,
        page: PageParams,
    ) -> AppResult<Page<User>> {
        ctx.require(permissions::USER_MANAGE)?;
        let (items, total) = UserRepo::list(conn, filter, page.offset, page.size)?;
        Ok(Page::new(items, total, page))
    }

    /// 本人或具备 user:manage 权限者可查看
    pub fn get(conn: &mut PgConnection, ctx: &RequestContext, user_id: Uuid) -> AppResult<UserInfo> {
        if ctx.user_id != user_id {
            ctx.require(permissions::USER_MANAGE)?;
        }
        let user = UserRepo::find_by_id(conn, user_id)?.ok_or_else(|| AppError::not_found("user"))?;
        let roles = UserRepo::roles_for_user(conn, user_id)?;
        Ok(UserInfo::from_user(&user, &roles))
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateUserRequest,
        bcrypt_cost: u32,
    ) -> AppResult<UserInfo> {
        ctx.require(permissions::USER_MANAGE)?;
        if req.is_superuser && !ctx.is_superuser {
            return Err(AppError::forbidden("Only superusers can create superusers"));
        }

        let username = req.username.trim().to_string();
        if UserRepo::exists_by_username(conn, &username)? {
            return Err(AppError::conflict_with_code(
                "Username already exists",
                Some("username".to_string()),
                error_codes::USER_USERNAME_EXISTS,
            ));
        }
        if let Some(dept_id) = req.department_id {
            DepartmentRepo::find_by_id(conn, dept_id)?
                .ok_or_else(|| AppError::validation("Department does not exist"))?;
        }

        let password_hash = AuthService::hash_password(&req.password, bcrypt_cost)?;

        conn.transaction(|conn| {
            let user = UserRepo::insert(
                conn,
                &NewUser {
                    username,
                    real_name: req.real_name.clone(),
                    password_hash,
                    email: req.email.clone(),
                    phone: req.phone.clone(),
                    position: req.position.clone(),
                    department_id: req.department_id,
                    is_active: true,
                    is_superuser: req.is_superuser,
                },
            )?;
            let roles = Self::apply_roles(conn, user.id, &req.role_ids)?;
            tracing::info!(user_id = %user.id, operator = %ctx.user_id, "User created");
            Ok(UserInfo::from_user(&user, &roles))
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        user_id: Uuid,
        req: &UpdateUserRequest,
    ) -> AppResult<UserInfo> {
        // 本人只能修改自己的基础资料
        let managing = ctx.has_permission(permissions::USER_MANAGE);
        if !managing {
            if ctx.user_id != user_id {
                return Err(AppError::forbidden("Missing permission: user:manage"));
            }
            if req.is_active.is_some() || req.is_superuser.is_some() || req.department_id.is_some() {
                return Err(AppError::forbidden(
                    "Only administrators can change account status or department",
                ));
            }
        }
        if req.is_superuser.is_some() && !ctx.is_superuser {
            return Err(AppError::forbidden("Only superusers can grant superuser"));
        }

        UserRepo::find_by_id(conn, user_id)?.ok_or_else(|| AppError::not_found("user"))?;
        if let Some(dept_id) = req.department_id {
            DepartmentRepo::find_by_id(conn, dept_id)?
                .ok_or_else(|| AppError::validation("Department does not exist"))?;
        }

        let changes = UpdateUser {
            real_name: req.real_name.clone(),
            email: req.email.clone(),
            phone: req.phone.clone(),
            position: req.position.clone(),
            department_id: req.department_id,
            is_active: req.is_active,
            is_superuser: req.is_superuser,
            updated_at: Some(Utc::now()),
        };
        let user = UserRepo::update(conn, user_id, &changes)?;
        let roles = UserRepo::roles_for_user(conn, user_id)?;
        Ok(UserInfo::from_user(&user, &roles))
    }

    /// 用户不做物理删除，只停用
    pub fn deactivate(conn: &mut PgConnection, ctx: &RequestContext, user_id: Uuid) -> AppResult<()> {
        ctx.require(permissions::USER_MANAGE)?;
        if ctx.user_id == user_id {
            return Err(AppError::validation("You cannot deactivate your own account"));
        }
        UserRepo::find_by_id(conn, user_id)?.ok_or_else(|| AppError::not_found("user"))?;
        UserRepo::update(
            conn,
            user_id,
            &UpdateUser {
                is_active: Some(false),
                updated_at: Some(Utc::now()),
                ..Default::default()
            },
        )?;
        tracing::info!(user_id = %user_id, operator = %ctx.user_id, "User deactivated");
        Ok(())
    }

    pub fn assign_roles(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> AppResult<UserInfo> {
        ctx.require(permissions::USER_MANAGE)?;
        let user = UserRepo::find_by_id(conn, user_id)?.ok_or_else(|| AppError::not_found("user"))?;
        let roles = conn.transaction(|conn| Self::apply_roles(conn, user_id, role_ids))?;
        Ok(UserInfo::from_user(&user, &roles))
    }

    fn apply_roles(
        conn: &mut PgConnection,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> AppResult<Vec<crate::db::models::auth::Role>> {
        let mut ids = role_ids.to_vec();
        ids.sort();
        ids.dedup();

        let roles = RoleRepo::find_by_ids(conn, &ids)?;
        if roles.len() != ids.len() {
            return Err(AppError::validation("One or more roles do not exist"));
        }
        UserRepo::replace_roles(conn, user_id, &ids)?;
        Ok(roles)
    }
}
