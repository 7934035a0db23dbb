// handlers/protected/auth/mod.rs - Authenticated session endpoints

pub mod whoami;

pub use whoami::whoami;
