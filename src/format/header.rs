//! passvault 容器头部（IV 前缀）
//!
//! 容器布局：
//!
//! ```text
//! offset 0..16   : IV，16 字节原始数据，不加密
//! offset 16..EOF : gzip(XML) 的 CBC 密文，长度为 16 的倍数
//! ```
//!
//! 头部只有 IV，没有魔数与版本号；长度固定，与负载大小无关。
//! 解密前必须完整读到 16 字节，否则拒绝继续处理。

use std::io::{ErrorKind, Read, Write};

use crate::crypto::cbc::BLOCK_SIZE;
use crate::crypto::rng::RandomSource;
use crate::error::VaultError;

/// IV 长度（与 AES 块大小相同）
pub const IV_SIZE: usize = BLOCK_SIZE;

/// 初始化向量
pub type Iv = [u8; IV_SIZE];

/// 生成新的随机 IV（每次写入都必须重新生成）
pub fn generate_iv(rng: &mut RandomSource) -> Iv {
    let mut iv = [0u8; IV_SIZE];
    rng.fill(&mut iv);
    iv
}

/// 将 IV 原样写入输出流
pub fn write_iv<W: Write>(mut writer: W, iv: &Iv) -> Result<(), VaultError> {
    writer.write_all(iv)?;
    Ok(())
}

/// 从输入流读取 IV
///
/// 不足 16 字节即视为容器损坏，返回 [`VaultError::Format`]。
pub fn read_iv<R: Read>(mut reader: R) -> Result<Iv, VaultError> {
    let mut iv = [0u8; IV_SIZE];
    let mut filled = 0;

    while filled < IV_SIZE {
        match reader.read(&mut iv[filled..]) {
            Ok(0) => {
                return Err(VaultError::Format(format!(
                    "no initialization vector in stream ({filled} of {IV_SIZE} bytes)"
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(iv)
}
