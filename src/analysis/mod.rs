pub mod liveness;
pub mod usedef;

pub use liveness::Liveness;
pub use usedef::{ProgramPoint, UseDef};
