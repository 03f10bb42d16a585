//! Application lifecycle
//!
//! - `lifetime`: 启动装配与关闭收尾
//! - `modes`: 运行模式（HTTP 服务）

pub mod lifetime;
pub mod modes;
