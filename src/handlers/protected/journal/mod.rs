// handlers/protected/journal/mod.rs - Comment timeline and status history

pub mod comments; // GET|POST /api/requests/:id/comments
pub mod history; // GET /api/requests/:id/history

pub use comments::{comment_create, comments_list};
pub use history::history_list;
