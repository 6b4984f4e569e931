use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::department::{Department, DepartmentFilter, NewDepartment, UpdateDepartment};
use crate::schema::departments;

pub struct DepartmentRepo;

impl DepartmentRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        dept_id: Uuid,
    ) -> Result<Option<Department>, diesel::result::Error> {
        departments::table
            .find(dept_id)
            .select(Department::as_select())
            .first(conn)
            .optional()
    }

    pub fn exists_by_code(
        conn: &mut PgConnection,
        dept_code: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::departments::dsl::*;
        diesel::select(diesel::dsl::exists(departments.filter(code.eq(dept_code))))
            .get_result(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_dept: &NewDepartment,
    ) -> Result<Department, diesel::result::Error> {
        diesel::insert_into(departments::table)
            .values(new_dept)
            .returning(Department::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        dept_id: Uuid,
        changes: &UpdateDepartment,
    ) -> Result<Department, diesel::result::Error> {
        diesel::update(departments::table.find(dept_id))
            .set(changes)
            .returning(Department::as_returning())
            .get_result(conn)
    }

    pub fn delete(conn: &mut PgConnection, dept_id: Uuid) -> Result<usize, diesel::result::Error> {
        diesel::delete(departments::table.find(dept_id)).execute(conn)
    }

    pub fn count_children(
        conn: &mut PgConnection,
        dept_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        departments::table
            .filter(departments::parent_id.eq(dept_id))
            .count()
            .get_result(conn)
    }

    fn filtered<'a>(filter: &'a DepartmentFilter) -> departments::BoxedQuery<'a, Pg> {
        let mut query = departments::table.into_boxed();
        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", search);
            query = query.filter(
                departments::name
                    .ilike(pattern.clone())
                    .or(departments::code.ilike(pattern)),
            );
        }
        if let Some(parent) = filter.parent_id {
            query = query.filter(departments::parent_id.eq(parent));
        }
        if let Some(enabled) = filter.is_enabled {
            query = query.filter(departments::is_enabled.eq(enabled));
        }
        query
    }

    pub fn list(
        conn: &mut PgConnection,
        filter: &DepartmentFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Department>, i64), diesel::result::Error> {
        let total = Self::filtered(filter).count().get_result(conn)?;
        let items = Self::filtered(filter)
            .order((departments::sort_order.asc(), departments::name.asc()))
            .offset(offset)
            .limit(limit)
            .select(Department::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    pub fn list_enabled(conn: &mut PgConnection) -> Result<Vec<Department>, diesel::result::Error> {
        departments::table
            .filter(departments::is_enabled.eq(true))
            .order((departments::sort_order.asc(), departments::name.asc()))
            .select(Department::as_select())
            .load(conn)
    }
}
