pub mod check;
pub mod contracts;
pub mod instantiate;
pub mod refine;
pub mod schema;

pub use check::*;
pub use contracts::*;
pub use instantiate::*;
pub use refine::*;
pub use schema::*;
