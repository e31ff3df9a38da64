pub mod evaluate;

pub use evaluate::{Outcome, VerdictInfo, evaluate};
