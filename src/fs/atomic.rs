//! passvault 原子写入工具。
//!
//! 保存 vault 时先写同目录下的临时文件，全部成功后再 rename 覆盖目标，
//! 保存失败（包括 finish_encryption 出错）不会截断已有的 vault 文件。

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::VaultError;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 原子写文件。
///
/// 流程：
/// 1. 在目标目录创建临时文件；
/// 2. 调用 `write_fn` 写入完整内容（文件句柄在任何退出路径上都会关闭）；
/// 3. `sync_all` 后 rename 替换目标文件。
pub fn write_atomic<F>(target: &Path, write_fn: F) -> Result<(), VaultError>
where
    F: FnOnce(&mut File) -> Result<(), VaultError>,
{
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&parent)?;

    let tmp_path = build_tmp_path(&parent, target.file_name());
    let result = write_tmp(&tmp_path, write_fn);

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    // Windows 上 rename 不能覆盖已存在的文件
    if cfg!(windows) && target.exists() {
        fs::remove_file(target)?;
    }

    if let Err(err) = fs::rename(&tmp_path, target) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }

    debug!(path = %target.display(), "replaced file atomically");
    Ok(())
}

fn write_tmp<F>(tmp_path: &Path, write_fn: F) -> Result<(), VaultError>
where
    F: FnOnce(&mut File) -> Result<(), VaultError>,
{
    let mut tmp_file = File::create(tmp_path)?;
    write_fn(&mut tmp_file)?;
    tmp_file.sync_all()?;
    Ok(())
}

fn build_tmp_path(parent: &Path, file_name: Option<&std::ffi::OsStr>) -> PathBuf {
    let base_name = file_name
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("passvault");

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);

    parent.join(format!(
        ".{base_name}.tmp-{}-{timestamp}-{counter}",
        std::process::id()
    ))
}
