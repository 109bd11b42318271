use super::{SleepProvider, TokioSleep};
use crate::{Generator, IdGenStatus, IdInt, RandSource, Result, TimeSource};
use core::{future::Future, time::Duration};

/// Async id generation that sleeps instead of spinning.
///
/// The returned futures loop on [`Generator::poll_id`]; whenever the
/// generator is pending they sleep until the tick it asked for. Dropping the
/// future cancels the wait without touching the generator, so callers can
/// put a timeout around it.
///
/// # Example
///
/// ```
/// use trendid::{BitLayout, Generator, GeneratorAsyncExt, InstanceRegistry};
/// use std::sync::Arc;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let generator = Generator::builder(BitLayout::WORKER)
///     .node(9)
///     .registry(Arc::new(InstanceRegistry::new()))
///     .build::<u64>()
///     .unwrap();
///
/// let id = generator.next_id_async().await.unwrap();
/// assert_eq!(generator.decode(id).node, 9);
/// # });
/// ```
pub trait GeneratorAsyncExt<T: IdInt> {
    /// Resolves to the next id, waiting with `S` while the generator is
    /// pending.
    ///
    /// # Errors
    ///
    /// Resolves to an error if the generator fails; see
    /// [`Generator::next_id`].
    fn next_id_async_with<S>(&self) -> impl Future<Output = Result<T>> + Send
    where
        S: SleepProvider;

    /// [`Self::next_id_async_with`] using Tokio's timer.
    ///
    /// # Errors
    ///
    /// Resolves to an error if the generator fails; see
    /// [`Generator::next_id`].
    fn next_id_async(&self) -> impl Future<Output = Result<T>> + Send {
        self.next_id_async_with::<TokioSleep>()
    }
}

impl<T, C, R> GeneratorAsyncExt<T> for Generator<T, C, R>
where
    T: IdInt,
    C: TimeSource + Sync,
    R: RandSource + Sync,
{
    fn next_id_async_with<S>(&self) -> impl Future<Output = Result<T>> + Send
    where
        S: SleepProvider,
    {
        async move {
            loop {
                let dur = match self.poll_id()? {
                    IdGenStatus::Ready { id } => return Ok(id),
                    IdGenStatus::Pending { yield_until } => {
                        Duration::from_millis(self.millis_until(yield_until))
                    }
                };
                S::sleep_for(dur).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BitLayout, Error, InstanceRegistry, ReseedStrategy, TokioYield};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    const TASKS: usize = 16;
    const IDS_PER_TASK: usize = 256;

    #[derive(Default)]
    struct SharedTime(AtomicU64);

    impl TimeSource for SharedTime {
        fn current_millis(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    /// Four ids per millisecond, so the tasks keep hitting pending.
    fn narrow() -> Arc<Generator> {
        Arc::new(
            Generator::builder(BitLayout::new(41, 10, 2))
                .node(1)
                .reseed(ReseedStrategy::Zero)
                .registry(Arc::new(InstanceRegistry::new()))
                .build()
                .unwrap(),
        )
    }

    async fn run_many_unique_ids<S: SleepProvider>(generator: Arc<Generator>) -> Result<()> {
        let tasks: Vec<_> = (0..TASKS)
            .map(|_| {
                let generator = Arc::clone(&generator);
                tokio::spawn(async move {
                    let mut ids = Vec::with_capacity(IDS_PER_TASK);
                    for _ in 0..IDS_PER_TASK {
                        ids.push(generator.next_id_async_with::<S>().await?);
                    }
                    Ok::<_, Error>(ids)
                })
            })
            .collect();

        let mut seen = HashSet::with_capacity(TASKS * IDS_PER_TASK);
        for task in tasks {
            let ids = task.await.unwrap()?;
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for id in ids {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), TASKS * IDS_PER_TASK);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn generates_many_unique_ids_sleeping() -> Result<()> {
        run_many_unique_ids::<TokioSleep>(narrow()).await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn generates_many_unique_ids_yielding() -> Result<()> {
        run_many_unique_ids::<TokioYield>(narrow()).await
    }

    #[tokio::test]
    async fn waits_out_a_tolerable_regression() {
        let clock = Arc::new(SharedTime::default());
        clock.0.store(1_000, Ordering::Relaxed);
        let generator = Arc::new(
            Generator::builder(BitLayout::WORKER)
                .node(2)
                .reseed(ReseedStrategy::Zero)
                .registry(Arc::new(InstanceRegistry::new()))
                .clock(Arc::clone(&clock))
                .build::<u64>()
                .unwrap(),
        );
        let first = generator.next_id_async().await.unwrap();

        clock.0.store(995, Ordering::Relaxed);
        let waiting = tokio::spawn({
            let generator = Arc::clone(&generator);
            async move { generator.next_id_async().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        clock.0.store(1_000, Ordering::Relaxed);
        let second = waiting.await.unwrap().unwrap();
        assert!(second > first);
        assert_eq!(generator.decode(second).tick, 1_000);
    }

    #[tokio::test]
    async fn fatal_regression_is_returned() {
        let clock = Arc::new(SharedTime::default());
        clock.0.store(1_000, Ordering::Relaxed);
        let generator = Generator::builder(BitLayout::WORKER)
            .node(3)
            .registry(Arc::new(InstanceRegistry::new()))
            .clock(Arc::clone(&clock))
            .build::<u64>()
            .unwrap();
        generator.next_id_async().await.unwrap();

        clock.0.store(500, Ordering::Relaxed);
        let err = generator.next_id_async().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
