// handlers/elevated/admin/mod.rs - Catalog, account and reporting administration

pub mod areas; // /api/admin/areas[/:id]
pub mod reports; // /api/admin/reports/*
pub mod request_types; // /api/admin/request-types[/:id[/toggle]]
pub mod requests; // /api/admin/requests/{unassigned,other}
pub mod users; // /api/admin/users[/:id[/reset-password]]
