//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap each upstream attempt with a deadline
//! - Cancel the attempt cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The caller decides how an elapsed deadline is represented in its error type

use std::future::Future;
use std::time::Duration;

/// Await `future` for at most `limit`; an elapsed deadline becomes `on_elapsed(limit)`.
pub async fn with_deadline<T, E, F>(
    limit: Duration,
    future: F,
    on_elapsed: impl FnOnce(Duration) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(on_elapsed(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_deadline_maps_error() {
        let result: Result<(), String> = with_deadline(
            Duration::from_secs(2),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            |limit| format!("timed out after {:?}", limit),
        )
        .await;
        assert_eq!(result, Err("timed out after 2s".to_string()));
    }

    #[tokio::test]
    async fn test_inner_result_passes_through() {
        let ok: Result<u8, String> =
            with_deadline(Duration::from_secs(1), async { Ok(7) }, |_| unreachable!()).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u8, String> =
            with_deadline(Duration::from_secs(1), async { Err("inner".to_string()) }, |_| unreachable!()).await;
        assert_eq!(err, Err("inner".to_string()));
    }
}
