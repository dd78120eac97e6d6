pub mod clock;
pub mod errors;
pub mod retry;
pub mod shutdown;

pub use shutdown::*;
