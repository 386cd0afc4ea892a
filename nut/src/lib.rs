//! nut_rs - Rust client for Network UPS Tools
//!
//! Talks the upsd text protocol (TCP port 3493) to read UPS status
//! variables, write variables and trigger instant commands.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `nut-core`: Value types, errors and `ERR` reply mapping
//! - `nut-transport`: Byte-stream transport (TCP)
//! - `nut-session`: Line codec, list framing, command channel, connection lifecycle
//! - `nut-client`: Retry supervisor, builder and the public client
//!
//! # Implementation Status
//!
//! ## ✅ 已完成
//! - 行编解码（引号、转义）与 `BEGIN LIST`/`END LIST` 帧
//! - 单命令在途的命令通道与超时
//! - 登录、断线重连并重放登录、有界重试
//! - 全部只读查询、`SET VAR`、`INSTCMD`
//!
//! ## 📋 待实现
//! - STARTTLS
//! - `LIST RANGE`
//!
//! # Usage
//!
//! ```no_run
//! use nut::client::ClientBuilder;
//!
//! # async fn run() -> nut::NutResult<()> {
//! let client = ClientBuilder::new().host("127.0.0.1").build()?;
//! let status = client.get_variable("ups1", "ups.status").await?;
//! println!("ups1 is {}", status.value);
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use nut_core::{
    Client, Device, ErrorKind, InstantCommand, NutError, NutResult, ValueFormat, Variable,
    VariableType,
};

// Re-export client API
pub mod client {
    pub use nut_client::*;
}

// Re-export protocol layers
pub mod session {
    pub use nut_session::*;
}

pub mod transport {
    pub use nut_transport::*;
}
