/// Use mimalloc as the global allocator for all binaries.
/// Every framed record is its own small allocation, and the merge store
/// holds one boxed node per record until output.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod buffer;
pub mod common;
pub mod coordinator;
pub mod error;
pub mod manifest;
pub mod partition;
pub mod protocol;
pub mod store;
pub mod worker;

pub use error::{Error, Result};
