//! Per-stage deadlines.

use std::future::Future;
use std::time::Duration;

use crate::error::ContextorError;

/// Awaits `fut` for at most `after`, mapping its error with `wrap`.
pub(crate) async fn within<T, E, F>(
    stage: &'static str,
    after: Duration,
    fut: F,
    wrap: fn(E) -> ContextorError,
) -> Result<T, ContextorError>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res.map_err(wrap),
        Err(_) => Err(ContextorError::Timeout { stage, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_stage_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ContextorError>(())
        };
        let err = within("embed query", Duration::from_secs(1), slow, |e| e)
            .await
            .unwrap_err();
        assert!(matches!(err, ContextorError::Timeout { stage: "embed query", .. }));
    }
}
