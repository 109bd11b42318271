mod builder;
mod lock;
mod state;
mod status;

pub use builder::*;
pub use lock::*;
pub use state::ReseedStrategy;
pub use status::*;
