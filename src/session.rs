//! passvault 会话
//!
//! 一个 [`VaultSession`] 对应一个打开的 vault：条目、文件路径、会话密钥、修改标记。
//! 由调用方显式创建与销毁（open / close），不使用进程级全局状态。
//!
//! 会话不做内部加锁；同一时刻只允许一个读或写操作。

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::crypto::kdf::{self, Key};
use crate::decrypt::read_document;
use crate::encrypt::write_document;
use crate::error::{DocumentError, VaultError};
use crate::format::entries::{Entries, Entry};

#[derive(Default)]
pub struct VaultSession {
    entries: Entries,
    path: Option<PathBuf>,
    key: Option<Key>,
    modified: bool,
}

impl VaultSession {
    /// 空会话（未关联文件）
    pub fn new() -> Self {
        Self::default()
    }

    /// 用口令打开已有 vault
    ///
    /// 文件不存在时返回 [`DocumentError::NotFound`]，调用方可改用 [`VaultSession::create`]。
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, DocumentError> {
        let path = path.into();
        let key = derive(&path, passphrase)?;
        let entries = read_document(&path, Some(&key))?;

        Ok(Self {
            entries,
            path: Some(path),
            key: Some(key),
            modified: false,
        })
    }

    /// 创建新的空 vault 并立即写盘
    pub fn create(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, DocumentError> {
        let path = path.into();
        let key = derive(&path, passphrase)?;
        let entries = Entries::default();
        write_document(&path, Some(&key), &entries)?;

        info!(path = %path.display(), "vault created");
        Ok(Self {
            entries,
            path: Some(path),
            key: Some(key),
            modified: false,
        })
    }

    /// 保存到当前文件
    pub fn save(&mut self) -> Result<(), DocumentError> {
        let (Some(path), Some(key)) = (&self.path, &self.key) else {
            return Err(DocumentError::wrap(
                Path::new(""),
                VaultError::Config("session has no file or passphrase; use save_as".into()),
            ));
        };

        write_document(path, Some(key), &self.entries)?;
        self.modified = false;
        Ok(())
    }

    /// 以新的路径和口令保存（同时完成更换口令）
    pub fn save_as(&mut self, path: impl Into<PathBuf>, passphrase: &str) -> Result<(), DocumentError> {
        let path = path.into();
        let key = derive(&path, passphrase)?;
        write_document(&path, Some(&key), &self.entries)?;

        self.path = Some(path);
        self.key = Some(key);
        self.modified = false;
        Ok(())
    }

    /// 导出为未加密的 gzip XML
    pub fn export(&self, path: &Path) -> Result<(), DocumentError> {
        write_document(path, None, &self.entries)
    }

    /// 导入未加密文件：替换当前条目，清除路径与密钥，标记为已修改
    pub fn import(&mut self, path: &Path) -> Result<(), DocumentError> {
        self.entries = read_document(path, None)?;
        self.path = None;
        self.key = None;
        self.modified = true;
        Ok(())
    }

    /// 关闭会话：清空条目并释放（清零）密钥
    pub fn close(&mut self) {
        self.entries = Entries::default();
        self.path = None;
        self.key = None;
        self.modified = false;
        debug!("session closed");
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn titles(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.title.as_str()).collect()
    }

    pub fn get(&self, title: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.title == title)
    }

    /// 按标题做不区分大小写的子串匹配
    pub fn search(&self, query: &str) -> Vec<&Entry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn add(&mut self, entry: Entry) -> Result<(), VaultError> {
        entry.validate()?;
        self.ensure_unique(&entry.title)?;

        self.entries.entry.push(entry);
        self.modified = true;
        Ok(())
    }

    /// 用 `entry` 替换标题为 `old_title` 的条目
    pub fn update(&mut self, old_title: &str, entry: Entry) -> Result<(), VaultError> {
        entry.validate()?;
        let index = self.index_of(old_title)?;
        if entry.title != old_title {
            self.ensure_unique(&entry.title)?;
        }

        self.entries.entry[index] = entry;
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, title: &str) -> Result<Entry, VaultError> {
        let index = self.index_of(title)?;
        self.modified = true;
        Ok(self.entries.entry.remove(index))
    }

    /// 复制条目并赋予新标题
    pub fn duplicate(&mut self, title: &str, new_title: &str) -> Result<(), VaultError> {
        let mut copy = self.entries.entry[self.index_of(title)?].clone();
        copy.title = new_title.to_string();
        self.add(copy)
    }

    fn index_of(&self, title: &str) -> Result<usize, VaultError> {
        self.entries
            .iter()
            .position(|e| e.title == title)
            .ok_or_else(|| VaultError::InvalidEntry(format!("no entry titled {title:?}")))
    }

    fn ensure_unique(&self, title: &str) -> Result<(), VaultError> {
        if self.get(title).is_some() {
            return Err(VaultError::InvalidEntry(format!("entry {title:?} already exists")));
        }
        Ok(())
    }
}

fn derive(path: &Path, passphrase: &str) -> Result<Key, DocumentError> {
    kdf::derive_key(passphrase).map_err(|e| DocumentError::wrap(path, e))
}
