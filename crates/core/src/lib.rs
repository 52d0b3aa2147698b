//! Domain types and pure logic shared by the dispatch service and the
//! worker process.

pub mod error;
pub mod hashing;
pub mod idle;
pub mod job;
pub mod naming;
pub mod types;
