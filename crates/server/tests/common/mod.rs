//! Common test utilities and fixtures.

pub mod fixtures;
pub mod registry;
pub mod server;
pub mod storage;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use registry::*;
#[allow(unused_imports)]
pub use server::*;
#[allow(unused_imports)]
pub use storage::*;
