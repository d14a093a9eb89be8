use std::{fmt::Display, future::Future, time::Duration};

/// Calls `connect` until it succeeds, pausing `interval` after each failure.
/// With `max_attempts` set, the error of the last attempt is returned once
/// that many attempts have failed.
pub async fn wait_for_db<T, E, F, Fut>(
    mut connect: F,
    interval: Duration,
    max_attempts: Option<u32>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    log::info!("Waiting for database...");

    let mut failures = 0;
    loop {
        match connect().await {
            Ok(connection) => {
                log::info!("Database is now available");
                return Ok(connection);
            }
            Err(e) => {
                failures += 1;
                if max_attempts.is_some_and(|max| failures >= max) {
                    log::error!("Database still unavailable after {failures} attempts: {e}");
                    return Err(e);
                }
                log::warn!(
                    "Database unavailable, waiting {} ms... ({e})",
                    interval.as_millis()
                );
                tokio::time::sleep(interval).await;
            }
        }
    }
}
