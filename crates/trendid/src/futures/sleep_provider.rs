use core::{future::Future, time::Duration};

/// Abstracts over how an async generator waits for the clock.
pub trait SleepProvider {
    /// `Send` so the returned future can move across worker threads.
    type Sleep: Future<Output = ()> + Send;

    fn sleep_for(dur: Duration) -> Self::Sleep;
}
