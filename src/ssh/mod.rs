//! SSH Executor: pooled, per-host SSH clients with key preflight, reconnect
//! backoff, and outcome reporting to the Host Monitor.
//!
//! A connection map behind `Arc<RwLock<HashMap<...>>>`, one `Semaphore` per
//! host, and `async_ssh2_tokio` as the transport.

mod connection;
mod executor;

pub use connection::SshConnection;
pub use executor::SshExecutor;
