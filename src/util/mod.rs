//! General utility code that didn't fit anywhere else

mod port_range;
pub use port_range::PortRange;

pub(crate) mod socket;

mod tracing;
pub use tracing::{
    is_initialized as tracing_is_initialised, setup as setup_tracing, trace_level,
    ConsoleTraceType, TimeFormat,
};
