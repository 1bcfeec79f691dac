//! passvault 打开流程实现
//!
//! 本模块负责把 vault 容器文件还原为条目列表。
//!
//! 读取流程（严格顺序）：
//! 1. 读取 16 字节 IV
//! 2. CBC 解密 → gzip 解压
//! 3. 读到密文末尾，校验填充
//! 4. 反序列化 XML，校验条目
//!
//! 注意：
//! - CBC 不提供认证，错误密码可能表现为填充错误，也可能表现为解压 / XML 错误
//! - 未提供密钥时按导出文件处理：gzip 压缩的 XML，或未压缩的 XML

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::bufread::GzDecoder;
use tracing::{debug, info};

use crate::crypto::kdf::Key;
use crate::error::{DocumentError, VaultError};
use crate::format::entries::Entries;
use crate::format::stream::DecryptReader;

/// gzip 魔数
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 读取 `path` 中的条目列表
///
/// 文件不存在时返回 [`DocumentError::NotFound`]，其余失败折叠为
/// [`DocumentError::Process`]。
pub fn read_document(path: &Path, key: Option<&Key>) -> Result<Entries, DocumentError> {
    let entries = read_file(path, key).map_err(|e| DocumentError::wrap(path, e))?;

    info!(
        path = %path.display(),
        entries = entries.len(),
        encrypted = key.is_some(),
        "document opened"
    );
    Ok(entries)
}

fn read_file(path: &Path, key: Option<&Key>) -> Result<Entries, VaultError> {
    // 文件句柄随 reader 一起在任何退出路径上释放
    let file = File::open(path)?;
    read_entries(BufReader::new(file), key)
}

/// 从任意输入流读取条目列表
pub fn read_entries<R: Read>(input: R, key: Option<&Key>) -> Result<Entries, VaultError> {
    let xml = match key {
        Some(key) => {
            let source = DecryptReader::new(input, key)?;
            inflate(BufReader::new(source))?
        }
        None => {
            let mut input = BufReader::new(input);
            let head = input.fill_buf()?;
            if head.starts_with(&GZIP_MAGIC) {
                inflate(input)?
            } else {
                let mut xml = Vec::new();
                input.read_to_end(&mut xml)?;
                xml
            }
        }
    };

    debug!(plaintext_len = xml.len(), "payload decoded");
    Entries::from_xml(&xml[..])
}

/// 解压单个 gzip 成员，并把底层流读到末尾
///
/// 读到末尾才会触发 `finish_decryption` 的填充校验；
/// gzip 成员之后若还有数据，视为格式错误。
fn inflate<R: BufRead>(input: R) -> Result<Vec<u8>, VaultError> {
    let mut decoder = GzDecoder::new(input);
    let mut xml = Vec::new();
    decoder.read_to_end(&mut xml).map_err(VaultError::from_io)?;

    let mut rest = decoder.into_inner();
    let mut trailing = Vec::new();
    rest.read_to_end(&mut trailing).map_err(VaultError::from_io)?;

    if !trailing.is_empty() {
        return Err(VaultError::Format(format!(
            "{} unexpected bytes after compressed payload",
            trailing.len()
        )));
    }

    Ok(xml)
}
