//! passvault 日志初始化
//!
//! 使用 tracing-subscriber 输出到 stderr。过滤规则优先取环境变量
//! `PASSVAULT_LOG`（例如 `passvault=debug`），否则使用传入的级别。
//!
//! 口令、密钥、IV 与条目中的密码永远不会写入日志。

use tracing_subscriber::EnvFilter;

/// 覆盖日志过滤规则的环境变量
pub const LOG_ENV: &str = "PASSVAULT_LOG";

/// 安装全局 subscriber；重复调用不会报错
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init("debug");
        init("not a valid filter [[");
        tracing::debug!("logging initialised twice without panicking");
    }
}
