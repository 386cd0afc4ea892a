//! NUT client implementation
//!
//! This crate provides the public client for talking to a UPS monitoring
//! daemon (upsd): authentication, device and variable enumeration, variable
//! writes, instant commands, and an orderly shutdown.
//!
//! ```rust,no_run
//! use nut_client::ClientBuilder;
//!
//! # async fn run() -> nut_core::NutResult<()> {
//! let client = ClientBuilder::new()
//!     .host("192.168.1.10")
//!     .credentials("monuser", "secret")
//!     .build()?;
//!
//! for device in client.list_devices().await? {
//!     let charge = client.get_variable(&device.name, "battery.charge").await?;
//!     println!("{}: {}%", device.name, charge.value);
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # TODO
//!
//! - [ ] `LIST RANGE` 支持

pub mod builder;
pub mod client;
pub mod retry;
pub mod session;

pub use builder::{ClientBuilder, ClientConfig};
pub use client::NutClient;
pub use retry::{Replay, Request, RetrySupervisor};
pub use session::Session;
