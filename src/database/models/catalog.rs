use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewArea {
    pub name: String,
    pub description: Option<String>,
}

/// Request categories; a type without area is the catch-all "Other"
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RequestType {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub area_id: Option<i32>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewRequestType {
    pub name: String,
    pub description: Option<String>,
    pub area_id: Option<i32>,
}
