pub mod catalog;
pub mod journal;
pub mod request;
pub mod user;

pub use catalog::{Area, NewArea, NewRequestType, RequestType};
pub use journal::{Comment, CommentRow, HistoryEntry, HistoryRow, NewComment, NewHistoryEntry};
pub use request::{Attachment, NewRequest, Request, RequestFilter, RequestRow};
pub use user::{NewUser, User, UserDeletion, UserRow};
