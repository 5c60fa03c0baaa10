mod facts;
mod report;
mod software;

pub use facts::*;
pub use report::*;
pub use software::*;
