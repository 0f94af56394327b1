//! `Transport` implementations: reqwest for real traffic, a scripted mock for
//! tests and offline use.

mod mock;
mod reqwest_transport;

pub use mock::MockTransport;
pub use reqwest_transport::{ReqwestTransport, ReqwestTransportBuilder};
