pub mod clock;
pub mod store;

pub use clock::{Clock, MonotonicClock, Stopwatch};
pub use store::StudentStore;
