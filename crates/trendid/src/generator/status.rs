/// The outcome of a non-blocking [`Generator::poll_id`] call.
///
/// - [`IdGenStatus::Ready`] carries a freshly generated id.
/// - [`IdGenStatus::Pending`] means the sequence of the current tick is used
///   up, or the clock is slightly behind the last issued tick. No id can be
///   issued before the clock reaches `yield_until`.
///
/// # Example
///
/// ```
/// use trendid::{BitLayout, Generator, InstanceRegistry};
/// use std::sync::Arc;
///
/// let generator: Generator = Generator::builder(BitLayout::WORKER)
///     .node(5)
///     .registry(Arc::new(InstanceRegistry::new()))
///     .build()
///     .unwrap();
///
/// let id = loop {
///     if let Some(id) = generator.poll_id().unwrap().ready() {
///         break id;
///     }
///     std::thread::yield_now();
/// };
/// assert_eq!(generator.decode(id).node, 5);
/// ```
///
/// [`Generator::poll_id`]: crate::Generator::poll_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus<T> {
    /// A unique id was generated and is ready to use.
    Ready {
        /// The generated id.
        id: T,
    },
    /// No id can be generated yet.
    Pending {
        /// The tick (inclusive) at which generation may resume.
        yield_until: u64,
    },
}

impl<T> IdGenStatus<T> {
    /// Returns the id if one is ready.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready { id } => Some(id),
            Self::Pending { .. } => None,
        }
    }
}
