use super::SleepProvider;
use core::{future::Future, pin::Pin, time::Duration};

/// Waits with Tokio's timer. The default for [`GeneratorAsyncExt::next_id_async`].
///
/// [`GeneratorAsyncExt::next_id_async`]: crate::GeneratorAsyncExt::next_id_async
pub struct TokioSleep;

impl SleepProvider for TokioSleep {
    type Sleep = tokio::time::Sleep;

    fn sleep_for(dur: Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}

/// Yields to the scheduler instead of sleeping.
///
/// Retries sooner than [`TokioSleep`] at the cost of more polling; under
/// heavy contention the timer is usually the better choice.
pub struct TokioYield;

impl SleepProvider for TokioYield {
    /// `yield_now()` returns a private future type, hence the box.
    type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn sleep_for(_dur: Duration) -> Self::Sleep {
        Box::pin(tokio::task::yield_now())
    }
}
