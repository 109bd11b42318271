mod explicit;
mod probe;
mod resolver;

pub use explicit::*;
pub use probe::*;
pub use resolver::*;
