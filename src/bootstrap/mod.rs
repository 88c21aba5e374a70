//! Application assembly: configuration loading, logging setup and signal
//! wiring. Everything the binary does before the first datagram arrives.
pub mod app;
pub mod logging;
