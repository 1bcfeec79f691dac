mod decrypt;
mod encrypt;

pub mod config;
pub mod crypto;
pub mod error;
pub mod format;
pub mod fs;
pub mod generator;
pub mod logging;
pub mod session;

pub use crypto::kdf::{Key, derive_key};
pub use decrypt::read_entries;
pub use encrypt::write_entries;
pub use error::{DocumentError, FailureKind, VaultError};
pub use format::entries::{Entries, Entry};
pub use session::VaultSession;

use std::path::Path;

/// 写入 vault 容器；`key` 为 `None` 时导出为未加密的 gzip XML
pub fn write_document(
    path: &Path,
    key: Option<&Key>,
    entries: &Entries,
) -> Result<(), DocumentError> {
    encrypt::write_document(path, key, entries)
}

/// 读取 vault 容器；`key` 为 `None` 时按导出文件读取
pub fn read_document(
    path: &Path,
    key: Option<&Key>,
) -> Result<Entries, DocumentError> {
    decrypt::read_document(path, key)
}
