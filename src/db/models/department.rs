use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// Department models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::departments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub short_name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub function_desc: Option<String>,
    pub manager_id: Option<Uuid>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub sort_order: i32,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::departments)]
pub struct NewDepartment {
    pub name: String,
    pub code: String,
    pub short_name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub function_desc: Option<String>,
    pub manager_id: Option<Uuid>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub sort_order: i32,
    pub is_enabled: bool,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::departments)]
pub struct UpdateDepartment {
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub level: Option<i32>,
    pub function_desc: Option<String>,
    pub manager_id: Option<Uuid>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub sort_order: Option<i32>,
    pub is_enabled: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    #[validate(length(min = 1, max = 128, message = "Department name must be between 1 and 128 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 64, message = "Department code must be between 1 and 64 characters"))]
    pub code: String,

    pub short_name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub function_desc: Option<String>,
    pub manager_id: Option<Uuid>,
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub address: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    pub is_enabled: Option<bool>,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateDepartmentRequest {
    #[validate(length(min = 1, max = 128, message = "Department name must be between 1 and 128 characters"))]
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub function_desc: Option<String>,
    pub manager_id: Option<Uuid>,
    pub phone: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub address: Option<String>,
    pub sort_order: Option<i32>,
    pub is_enabled: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DepartmentFilter {
    pub search: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_enabled: Option<bool>,
}
