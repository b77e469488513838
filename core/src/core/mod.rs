pub mod control;
pub mod shared;
pub mod step;

pub use control::{Control, Outcome};
pub use shared::Shared;
pub use step::{Handler, SkipIf, Step};
