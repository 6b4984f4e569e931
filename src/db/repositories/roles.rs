use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::auth::{NewRole, Role, UpdateRole};
use crate::schema::{roles, user_roles};

pub struct RoleRepo;

impl RoleRepo {
    pub fn list(conn: &mut PgConnection) -> Result<Vec<Role>, diesel::result::Error> {
        roles::table
            .order(roles::name.asc())
            .select(Role::as_select())
            .load(conn)
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        role_id: Uuid,
    ) -> Result<Option<Role>, diesel::result::Error> {
        roles::table
            .find(role_id)
            .select(Role::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_ids(
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<Role>, diesel::result::Error> {
        roles::table
            .filter(roles::id.eq_any(ids))
            .select(Role::as_select())
            .load(conn)
    }

    pub fn exists_by_code(
        conn: &mut PgConnection,
        role_code: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::roles::dsl::*;
        diesel::select(diesel::dsl::exists(roles.filter(code.eq(role_code)))).get_result(conn)
    }

    pub fn insert(conn: &mut PgConnection, new_role: &NewRole) -> Result<Role, diesel::result::Error> {
        diesel::insert_into(roles::table)
            .values(new_role)
            .returning(Role::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        role_id: Uuid,
        changes: &UpdateRole,
    ) -> Result<Role, diesel::result::Error> {
        diesel::update(roles::table.find(role_id))
            .set(changes)
            .returning(Role::as_returning())
            .get_result(conn)
    }

    pub fn delete(conn: &mut PgConnection, role_id: Uuid) -> Result<usize, diesel::result::Error> {
        diesel::delete(user_roles::table.filter(user_roles::role_id.eq(role_id))).execute(conn)?;
        diesel::delete(roles::table.find(role_id)).execute(conn)
    }
}
