// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: JWT Authentication Required
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware injects the caller's Principal
//
// Visibility of individual requests is decided by the access predicate in
// the services, so these handlers only translate HTTP to service calls.

pub mod auth; // GET /api/auth/whoami
pub mod catalog; // /api/catalog/* - pickers for any authenticated user
pub mod journal; // /api/requests/:id/{comments,history}
pub mod requests; // /api/requests/* - submission, views and lifecycle
