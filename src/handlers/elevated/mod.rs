// handlers/elevated/mod.rs - Elevated handlers (administrator roles required)
//
// Security Level: JWT + Administrador/SuperAdministrador (users: SuperAdministrador)
// Route Prefix: /api/admin/*
// Middleware: jwt_auth_middleware; role checks run in the services

pub mod admin;
