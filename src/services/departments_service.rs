use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    db::models::api::{Page, PageParams, error_codes},
    db::models::department::{
        CreateDepartmentRequest, Department, DepartmentFilter, NewDepartment, UpdateDepartment,
        UpdateDepartmentRequest,
    },
    db::repositories::{
        departments::DepartmentRepo, supervision::SupervisionRepo, users::UserRepo,
    },
    error::{AppError, AppResult},
    services::context::{RequestContext, permissions},
    validation::department::{validate_department_code, validate_parent_chain},
};

pub struct DepartmentsService;

impl DepartmentsService {
    pub fn list(
        conn: &mut PgConnection,
        _ctx: &RequestContext,
        filter: &DepartmentFilter,
        page: PageParams,
    ) -> AppResult<Page<Department>> {
        let (items, total) = DepartmentRepo::list(conn, filter, page.offset, page.size)?;
        Ok(Page::new(items, total, page))
    }

    pub fn get(conn: &mut PgConnection, _ctx: &RequestContext, dept_id: Uuid) -> AppResult<Department> {
        DepartmentRepo::find_by_id(conn, dept_id)?.ok_or_else(|| AppError::not_found("department"))
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateDepartmentRequest,
    ) -> AppResult<Department> {
        ctx.require(permissions::DEPARTMENT_MANAGE)?;
        validate_department_code(&req.code)?;

        if DepartmentRepo::exists_by_code(conn, &req.code)? {
            return Err(AppError::conflict_with_code(
                "Department code already exists",
                Some("code".to_string()),
                error_codes::DEPARTMENT_CODE_EXISTS,
            ));
        }

        let level = match req.parent_id {
            Some(parent_id) => {
                let parent = DepartmentRepo::find_by_id(conn, parent_id)?
                    .ok_or_else(|| AppError::validation("Parent department does not exist"))?;
                parent.level + 1
            }
            None => 1,
        };

        let dept = DepartmentRepo::insert(
            conn,
            &NewDepartment {
                name: req.name.clone(),
                code: req.code.clone(),
                short_name: req.short_name.clone(),
                parent_id: req.parent_id,
                level,
                function_desc: req.function_desc.clone(),
                manager_id: req.manager_id,
                phone: req.phone.clone(),
                email: req.email.clone(),
                address: req.address.clone(),
                sort_order: req.sort_order,
                is_enabled: req.is_enabled.unwrap_or(true),
            },
        )?;
        tracing::info!(department_id = %dept.id, code = %dept.code, "Department created");
        Ok(dept)
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        dept_id: Uuid,
        req: &UpdateDepartmentRequest,
    ) -> AppResult<Department> {
        ctx.require(permissions::DEPARTMENT_MANAGE)?;
        DepartmentRepo::find_by_id(conn, dept_id)?.ok_or_else(|| AppError::not_found("department"))?;

        let mut level = None;
        if let Some(parent_id) = req.parent_id {
            let ancestors = Self::ancestor_chain(conn, parent_id)?;
            validate_parent_chain(dept_id, parent_id, &ancestors)?;
            let parent = DepartmentRepo::find_by_id(conn, parent_id)?
                .ok_or_else(|| AppError::validation("Parent department does not exist"))?;
            level = Some(parent.level + 1);
        }

        let changes = UpdateDepartment {
            name: req.name.clone(),
            short_name: req.short_name.clone(),
            parent_id: req.parent_id,
            level,
            function_desc: req.function_desc.clone(),
            manager_id: req.manager_id,
            phone: req.phone.clone(),
            email: req.email.clone(),
            address: req.address.clone(),
            sort_order: req.sort_order,
            is_enabled: req.is_enabled,
            updated_at: Some(Utc::now()),
        };
        Ok(DepartmentRepo::update(conn, dept_id, &changes)?)
    }

    /// 有下级部门、在职人员或未删除督办事项时不可删除
    pub fn delete(conn: &mut PgConnection, ctx: &RequestContext, dept_id: Uuid) -> AppResult<()> {
        ctx.require(permissions::DEPARTMENT_MANAGE)?;
        DepartmentRepo::find_by_id(conn, dept_id)?.ok_or_else(|| AppError::not_found("department"))?;

        let in_use = |what: &str| {
            AppError::conflict_with_code(
                format!("Department still has {}", what),
                None,
                error_codes::DEPARTMENT_IN_USE,
            )
        };
        if DepartmentRepo::count_children(conn, dept_id)? > 0 {
            return Err(in_use("child departments"));
        }
        if UserRepo::count_by_department(conn, dept_id)? > 0 {
            return Err(in_use("active users"));
        }
        if SupervisionRepo::count_live_by_department(conn, dept_id)? > 0 {
            return Err(in_use("supervision items"));
        }

        DepartmentRepo::delete(conn, dept_id)?;
        tracing::info!(department_id = %dept_id, operator = %ctx.user_id, "Department deleted");
        Ok(())
    }

    /// 从给定部门向上直到根部门的 id 链（含自身）
    fn ancestor_chain(conn: &mut PgConnection, start: Uuid) -> AppResult<Vec<Uuid>> {
        let mut chain = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if chain.contains(&id) {
                break;
            }
            chain.push(id);
            cursor = DepartmentRepo::find_by_id(conn, id)?.and_then(|d| d.parent_id);
        }
        Ok(chain)
    }
}
