//! Integration test common infrastructure.
//!
//! A scripted transport with a virtual clock, a harness that drives a
//! session through it, and a minimal line server for the TCP transport.

pub mod harness;
pub mod server;
pub mod transport;

#[allow(unused_imports)]
pub use harness::Harness;
#[allow(unused_imports)]
pub use server::TestServer;
#[allow(unused_imports)]
pub use transport::ScriptedTransport;
