mod error;
#[cfg(feature = "async-tokio")]
mod futures;
mod generator;
mod id;
mod mutex;
mod node;
mod radix;
mod rand;
mod registry;
mod service;
mod time;

pub use crate::error::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use crate::futures::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::node::*;
pub use crate::radix::*;
pub use crate::rand::*;
pub use crate::registry::*;
pub use crate::service::*;
pub use crate::time::*;
