pub mod result;
pub mod rubric;

pub use result::TestResult;
pub use rubric::{Category, Check};
