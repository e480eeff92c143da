pub mod streams;
pub use streams::{EventStream, EventStreamStats, Subscriber};

// Session event channel sizing
pub const SESSION_EVENT_CAPACITY: usize = 64;
pub const SESSION_EVENT_BUFFER_SIZE: usize = 16;
