use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    db::models::api::error_codes,
    db::models::auth::{CreateRoleRequest, NewRole, Role, UpdateRole, UpdateRoleRequest},
    db::repositories::roles::RoleRepo,
    error::{AppError, AppResult},
    services::context::{RequestContext, permissions},
    validation::user::validate_permissions,
};

pub struct RolesService;

impl RolesService {
    pub fn list(conn: &mut PgConnection, ctx: &RequestContext) -> AppResult<Vec<Role>> {
        ctx.require(permissions::USER_MANAGE)?;
        Ok(RoleRepo::list(conn)?)
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateRoleRequest,
    ) -> AppResult<Role> {
        ctx.require(permissions::USER_MANAGE)?;
        validate_permissions(&req.permissions)?;

        if RoleRepo::exists_by_code(conn, &req.code)? {
            return Err(AppError::conflict_with_code(
                "Role code already exists",
                Some("code".to_string()),
                error_codes::ROLE_CODE_EXISTS,
            ));
        }

        let role = RoleRepo::insert(
            conn,
            &NewRole {
                name: req.name.clone(),
                code: req.code.clone(),
                description: req.description.clone(),
                permissions: serde_json::json!(req.permissions),
            },
        )?;
        Ok(role)
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        role_id: Uuid,
        req: &UpdateRoleRequest,
    ) -> AppResult<Role> {
        ctx.require(permissions::USER_MANAGE)?;
        if let Some(ref perms) = req.permissions {
            validate_permissions(perms)?;
        }
        RoleRepo::find_by_id(conn, role_id)?.ok_or_else(|| AppError::not_found("role"))?;

        let changes = UpdateRole {
            name: req.name.clone(),
            description: req.description.clone(),
            permissions: req.permissions.as_ref().map(|p| serde_json::json!(p)),
            updated_at: Some(Utc::now()),
        };
        Ok(RoleRepo::update(conn, role_id, &changes)?)
    }

    pub fn delete(conn: &mut PgConnection, ctx: &RequestContext, role_id: Uuid) -> AppResult<()> {
        ctx.require(permissions::USER_MANAGE)?;
        RoleRepo::find_by_id(conn, role_id)?.ok_or_else(|| AppError::not_found("role"))?;
        conn.transaction(|conn| RoleRepo::delete(conn, role_id))?;
        Ok(())
    }
}
