// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (JWT auth) → Elevated (administrator roles)
//
// Elevated handlers run behind the same JWT middleware as protected ones;
// the role checks live in the services so every entry point shares them.
pub mod elevated; // Tier 3: /api/admin/*
pub mod protected; // Tier 2: /api/*
pub mod public; // Tier 1: /auth/*

use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

/// Distinguishes an absent JSON field (`None`) from an explicit `null`
/// (`Some(None)`); use with `#[serde(default, deserialize_with = ...)]`
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses a wire enum name (`status`, `priority`, `role`) into its closed type
pub(crate) fn parse_field<T>(field: &str, value: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ApiError::invalid_field(field, e.to_string()))
}
