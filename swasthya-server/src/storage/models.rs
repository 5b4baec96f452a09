use crate::storage::schema::child_health_records;
use chrono::NaiveDateTime;
use diesel::prelude::*;

/// One screening row. `health_status` and `gender` are stored as their wire
/// labels; parsing back into the shared enums happens at the service edge.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = child_health_records)]
pub struct HealthRecord {
    pub id: i32,
    pub child_name: String,
    pub age: i32,
    pub gender: String,
    pub weight: f64,
    pub health_status: String,
    pub anganwadi_kendra: String,
    pub school_name: String,
    pub symptoms: String,
    pub submitted_by_user_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = child_health_records)]
pub struct NewHealthRecord<'a> {
    pub child_name: &'a str,
    pub age: i32,
    pub gender: &'a str,
    pub weight: f64,
    pub health_status: &'a str,
    pub anganwadi_kendra: &'a str,
    pub school_name: &'a str,
    pub symptoms: &'a str,
    pub submitted_by_user_id: &'a str,
}
