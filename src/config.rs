//! passvault 配置
//!
//! 从 TOML 文件加载（默认当前目录下的 `passvault.toml`）。
//! 文件不存在时使用默认值；解析失败时记录警告并回退到默认值。
//!
//! ```toml
//! [generator]
//! length = 20
//! symbols = "!@#$%"
//!
//! [log]
//! level = "info"
//!
//! [vault]
//! path = "/home/alice/passwords.crypt"
//! ```
//!
//! 密钥派生轮数与容器布局不可配置。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::VaultError;
use crate::generator::{self, PasswordPolicy};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "passvault.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub generator: GeneratorSettings,
    pub log: LogSettings,
    pub vault: VaultSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub length: usize,
    pub symbols: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            length: generator::DEFAULT_LENGTH,
            symbols: generator::SYMBOLS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    pub path: Option<PathBuf>,
}

impl Settings {
    /// 解析 TOML 文本
    pub fn from_toml(text: &str) -> Result<Self, VaultError> {
        toml::from_str(text).map_err(|e| VaultError::Config(e.to_string()))
    }

    /// 严格加载：文件不存在返回默认值，其余错误向上返回
    pub fn try_load(path: &Path) -> Result<Self, VaultError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// 宽松加载：任何错误都记录警告并使用默认值
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        Self::try_load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), "could not load settings, using defaults: {e}");
            Self::default()
        })
    }

    /// 生成器配置对应的口令策略
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            length: self.generator.length,
            symbols: Some(self.generator.symbols.clone()).filter(|s| !s.is_empty()),
            ..PasswordPolicy::default()
        }
    }
}
