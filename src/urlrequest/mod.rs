//! Request orchestration: configuration, the engine cache, cancellation and
//! the redirect job that ties them together.

pub mod abort;
pub mod cache;
pub mod context;
pub mod job;
pub mod request;

pub use self::abort::{AbortController, AbortSignal, CancellationGate};
pub use self::cache::ClientCache;
pub use self::context::ClientConfig;
pub use self::job::RedirectJob;
pub use self::request::Request;
