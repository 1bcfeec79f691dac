//! passvault 容器格式
//!
//! - `header`：IV 前缀
//! - `stream`：CBC 流适配器
//! - `entries`：条目列表的 XML 负载

pub mod entries;
pub mod header;
pub mod stream;
