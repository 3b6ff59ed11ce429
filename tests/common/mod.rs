//! Integration test common infrastructure.
//!
//! Spawns the relay binary between a scripted fake upstream server and a
//! raw line-oriented test client.

#![allow(dead_code)]

pub mod client;
pub mod relay;
pub mod upstream;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use relay::TestRelay;
#[allow(unused_imports)]
pub use upstream::{FakeUpstream, UpstreamConn};
