//! passvault 保存流程实现
//!
//! 本模块负责把条目列表写成 vault 容器文件。
//!
//! 写入流程（严格顺序）：
//! 1. 校验并序列化条目为 XML
//! 2. 生成新的 IV 并原样写入文件头
//! 3. gzip 压缩 → CBC 加密 → 文件
//! 4. 写出填充块，临时文件 rename 覆盖目标
//!
//! 未提供密钥时为导出路径：只做 gzip，不写 IV、不加密。

use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info};

use crate::crypto::kdf::Key;
use crate::crypto::rng::RandomSource;
use crate::error::{DocumentError, VaultError};
use crate::format::entries::Entries;
use crate::format::stream::EncryptWriter;
use crate::fs::atomic::write_atomic;

/// 将条目列表写入 `path`
///
/// 任何失败都折叠为 [`DocumentError`]，诊断信息截断到 80 个字符。
pub fn write_document(path: &Path, key: Option<&Key>, entries: &Entries) -> Result<(), DocumentError> {
    write_file(path, key, entries).map_err(|e| DocumentError::wrap(path, e))?;

    info!(
        path = %path.display(),
        entries = entries.len(),
        encrypted = key.is_some(),
        "document saved"
    );
    Ok(())
}

fn write_file(path: &Path, key: Option<&Key>, entries: &Entries) -> Result<(), VaultError> {
    // 先序列化，失败时不触碰目标文件
    let xml = entries.to_xml()?;

    write_atomic(path, |file| {
        let mut output = write_payload(BufWriter::new(file), key, &xml)?;
        output.flush()?;
        Ok(())
    })
}

/// 将条目列表写入任意输出流，返回该输出流
pub fn write_entries<W: Write>(output: W, key: Option<&Key>, entries: &Entries) -> Result<W, VaultError> {
    let xml = entries.to_xml()?;
    write_payload(output, key, &xml)
}

fn write_payload<W: Write>(output: W, key: Option<&Key>, xml: &[u8]) -> Result<W, VaultError> {
    let Some(key) = key else {
        return compress(output, xml);
    };

    let mut rng = RandomSource::new();
    let sink = EncryptWriter::new(output, key, &mut rng)?;
    let sink = compress(sink, xml)?;

    let output = sink.finish()?;
    debug!(plaintext_len = xml.len(), "payload encrypted");
    Ok(output)
}

fn compress<W: Write>(output: W, xml: &[u8]) -> Result<W, VaultError> {
    let mut encoder = GzEncoder::new(output, Compression::default());
    encoder.write_all(xml).map_err(VaultError::from_io)?;
    encoder.finish().map_err(VaultError::from_io)
}
