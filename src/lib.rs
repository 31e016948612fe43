pub mod assign;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod harness;
pub mod logging;
pub mod output;
pub mod reference;
pub mod scoring;
