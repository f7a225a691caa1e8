use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::electricity_binding;

/// A device's daily electricity-check subscription for one dormitory room.
///
/// The subscription slot is identified by (device_token, campus, building,
/// room), enforced by a unique index. Changing only the schedule time for an
/// existing room is a delete plus recreate, never an update.
#[derive(Clone, Debug, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = electricity_binding)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub id: i32,
    pub student_id: String,
    pub device_token: String,
    pub campus: String,
    pub building: String,
    pub room: String,
    pub schedule_hour: i32,
    pub schedule_minute: i32,
    pub channel: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Insertable)]
#[diesel(table_name = electricity_binding)]
pub struct NewBinding {
    pub student_id: String,
    pub device_token: String,
    pub campus: String,
    pub building: String,
    pub room: String,
    pub schedule_hour: i32,
    pub schedule_minute: i32,
    pub channel: Option<String>,
}
