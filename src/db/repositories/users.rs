use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::auth::{NewUser, NewUserRole, Role, UpdateUser, User, UserFilter};
use crate::schema::{roles, user_roles, users};

pub struct UserRepo;

impl UserRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<User>, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .filter(id.eq(user_id))
            .select(User::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_username(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<User>, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .filter(username.eq(name))
            .select(User::as_select())
            .first(conn)
            .optional()
    }

    pub fn exists_by_username(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        diesel::select(diesel::dsl::exists(users.filter(username.eq(name)))).get_result(conn)
    }

    pub fn insert(conn: &mut PgConnection, new_user: &NewUser) -> Result<User, diesel::result::Error> {
        diesel::insert_into(users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        user_id: Uuid,
        changes: &UpdateUser,
    ) -> Result<User, diesel::result::Error> {
        diesel::update(users::table.find(user_id))
            .set(changes)
            .returning(User::as_returning())
            .get_result(conn)
    }

    pub fn update_password(
        conn: &mut PgConnection,
        user_id: Uuid,
        new_hash: &str,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        diesel::update(users.find(user_id))
            .set((password_hash.eq(new_hash), updated_at.eq(Utc::now())))
            .execute(conn)
    }

    pub fn touch_last_login(
        conn: &mut PgConnection,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        diesel::update(users.find(user_id))
            .set(last_login_at.eq(Some(at)))
            .execute(conn)
    }

    fn filtered<'a>(filter: &'a UserFilter) -> users::BoxedQuery<'a, Pg> {
        let mut query = users::table.into_boxed();
        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", search);
            query = query.filter(
                users::username
                    .ilike(pattern.clone())
                    .or(users::real_name.ilike(pattern)),
            );
        }
        if let Some(dept) = filter.department_id {
            query = query.filter(users::department_id.eq(dept));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(users::is_active.eq(active));
        }
        query
    }

    pub fn list(
        conn: &mut PgConnection,
        filter: &UserFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), diesel::result::Error> {
        let total = Self::filtered(filter).count().get_result(conn)?;
        let items = Self::filtered(filter)
            .order(users::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(User::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    pub fn count_by_department(
        conn: &mut PgConnection,
        dept_id: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        use crate::schema::users::dsl::*;
        users
            .filter(department_id.eq(dept_id))
            .filter(is_active.eq(true))
            .count()
            .get_result(conn)
    }

    pub fn roles_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Role>, diesel::result::Error> {
        user_roles::table
            .inner_join(roles::table)
            .filter(user_roles::user_id.eq(user_id))
            .order(roles::name.asc())
            .select(Role::as_select())
            .load(conn)
    }

    pub fn replace_roles(
        conn: &mut PgConnection,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> Result<(), diesel::result::Error> {
        diesel::delete(user_roles::table.filter(user_roles::user_id.eq(user_id))).execute(conn)?;
        let rows: Vec<NewUserRole> = role_ids
            .iter()
            .map(|role_id| NewUserRole {
                user_id,
                role_id: *role_id,
            })
            .collect();
        if !rows.is_empty() {
            diesel::insert_into(user_roles::table)
                .values(&rows)
                .execute(conn)?;
        }
        Ok(())
    }

    pub fn ids_with_role(
        conn: &mut PgConnection,
        role: Uuid,
    ) -> Result<Vec<Uuid>, diesel::result::Error> {
        user_roles::table
            .filter(user_roles::role_id.eq(role))
            .select(user_roles::user_id)
            .load(conn)
    }

    /// (id, real_name) 映射，用于预警与统计展示
    pub fn names_by_ids(
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, String)>, diesel::result::Error> {
        users::table
            .filter(users::id.eq_any(ids))
            .select((users::id, users::real_name))
            .load(conn)
    }
}
