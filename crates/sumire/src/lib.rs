pub mod download;
pub mod error;
pub mod fetch;
pub mod manifest;
mod pool;
pub mod reconcile;
pub mod remux;
pub mod rendition;
pub mod segment;
pub mod session;

pub use error::{SumireError, SumireResult};
pub use m3u8_rs;
pub use rendition::Rendition;
pub use session::{Session, SessionOptions};

/// Workers per download/remux phase.
pub const DEFAULT_CONCURRENCY: u32 = 10;

/// Total attempts a single segment download may consume before its
/// rendition is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
