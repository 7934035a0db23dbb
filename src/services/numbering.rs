use std::future::Future;

use crate::database::manager::{constraints, DatabaseError};
use crate::database::store::Store;
use crate::services::{ServiceError, ServiceResult};

pub const NUMBER_PREFIX: &str = "SOL";

/// Insert attempts before number allocation gives up
pub const MAX_ATTEMPTS: u32 = 100;

pub fn year_prefix(year: i32) -> String {
    format!("{}-{}-", NUMBER_PREFIX, year)
}

/// `SOL-<year>-<seq>`, the sequence zero-padded to four digits
pub fn format_number(year: i32, seq: u32) -> String {
    format!("{}{:04}", year_prefix(year), seq)
}

/// One past the highest sequence already issued for `year`
async fn next_sequence(store: &dyn Store, year: i32) -> ServiceResult<u32> {
    let last = store.max_sequence(&year_prefix(year)).await?.unwrap_or(0);
    last.checked_add(1)
        .ok_or_else(|| ServiceError::business("Could not generate a unique request number"))
}

/// Next number for `year`; [`allocate`] tries this one first
pub async fn next_number(store: &dyn Store, year: i32) -> ServiceResult<String> {
    Ok(format_number(year, next_sequence(store, year).await?))
}

/// Runs `insert` with consecutive candidate numbers until one is accepted.
///
/// A unique violation on the request number means another writer took the
/// candidate; the next sequence is tried, up to [`MAX_ATTEMPTS`] times. Any
/// other failure is returned as is.
pub async fn allocate<T, F, Fut>(store: &dyn Store, year: i32, mut insert: F) -> ServiceResult<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, DatabaseError>>,
{
    let first = next_sequence(store, year).await?;

    for attempt in 0..MAX_ATTEMPTS {
        let Some(seq) = first.checked_add(attempt) else {
            break;
        };
        let number = format_number(year, seq);

        match insert(number.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_unique_violation(constraints::REQUEST_NUMBER) => {
                tracing::debug!("Request number {} already taken, trying the next one", number);
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::error!("Gave up allocating a request number for {} after {} attempts", year, MAX_ATTEMPTS);
    Err(ServiceError::business("Could not generate a unique request number"))
}
