// handlers/protected/requests/mod.rs - Request submission, views and lifecycle

pub mod create; // POST /api/requests
pub mod edit; // PUT /api/requests/:id
pub mod export; // GET /api/requests/:id/export/pdf, /png
pub mod form; // multipart body parsing shared by create and edit
pub mod list; // GET /api/requests, /mine, /area, /area/:area_id
pub mod show; // GET /api/requests/:id, /:id/attachment
pub mod workflow; // POST take/assign/unassign/reject/close, PUT status

pub use create::request_create;
pub use edit::request_edit;
pub use export::{request_export_pdf, request_export_png};
pub use list::{requests_by_area, requests_inbox, requests_list, requests_mine};
pub use show::{request_attachment, request_show};
pub use workflow::{request_assign, request_close, request_reject, request_status, request_take, request_unassign};
