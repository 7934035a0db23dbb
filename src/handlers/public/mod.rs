// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Route Prefix: No /api prefix (/auth/*)
// Middleware: None

pub mod auth;

pub use auth::*;
