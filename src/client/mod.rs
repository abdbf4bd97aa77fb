//! Connection pool and request dispatcher.
//!
//! # Architecture
//!
//! - **`address`**: destination identity keying the pool
//! - **`pool`**: per-address LIFO stacks of idle connections
//! - **`connect`**: transport factory seam (plain TCP by default)
//! - **`completion`**: single-assignment request completion
//! - **`dispatcher`**: admission control and per-request driving
//!
//! # Request State Machine
//!
//! ```text
//!  Queued → Dispatching → Awaiting-Connection → Sent → Reading-Response
//!                                                          │
//!                                                          ▼
//!                                      Completed | Failed | TimedOut
//! ```
//!
//! At most `max_concurrent` requests occupy the middle states; the rest
//! wait in a FIFO queue. Whenever a request reaches a terminal state its
//! slot frees and the queue drains again.

pub mod address;
pub mod completion;
pub mod connect;
pub mod dispatcher;
pub mod pool;
