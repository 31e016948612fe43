pub mod checks;
pub mod envelope;
pub mod runner;
pub mod transport;

pub use envelope::Envelope;
pub use runner::{grade_module, run_all, RunReport};
pub use transport::{HttpTransport, ProbeRequest, ProbeResponse, Transport};
