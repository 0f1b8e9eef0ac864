mod init;
mod spans;
mod trace_id;

pub use init::{LogFormat, init_logger, warn_if_slow};
pub use spans::{child_span, cycle_span};
pub use trace_id::TraceId;
