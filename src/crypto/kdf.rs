//! passvault 密钥派生函数（KDF）模块
//!
//! 将用户口令派生为 AES-256 对称密钥。
//!
//! 算法：
//! - 口令按 UTF-8 编码
//! - 先对口令字节做一次 SHA-256
//! - 再对上一轮摘要重复哈希，总计 [`KDF_ROUNDS`] 轮（每轮只输入上一轮摘要）
//!
//! 已知弱点：不使用 salt，相同口令在任意 vault 文件中得到相同密钥。
//! 改动该行为会破坏与已有容器的兼容性，因此保持原样。

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::VaultError;

/// 派生密钥长度（256-bit）
pub const KEY_LEN: usize = 32;

/// 哈希总轮数（含第一轮对口令本身的哈希）
pub const KDF_ROUNDS: u32 = 1000;

/// 会话密钥：离开作用域后自动清零
pub type Key = Zeroizing<[u8; KEY_LEN]>;

/// 根据口令派生对称加密密钥
///
/// 纯函数：相同口令始终得到逐位相同的密钥。
pub fn derive_key(passphrase: &str) -> Result<Key, VaultError> {
    derive_key_with_rounds(passphrase, KDF_ROUNDS)
}

/// 使用指定总轮数派生密钥
///
/// #### 错误
/// - `rounds == 0` 时返回 [`VaultError::Config`]
pub fn derive_key_with_rounds(passphrase: &str, rounds: u32) -> Result<Key, VaultError> {
    if rounds == 0 {
        return Err(VaultError::Config("KDF needs at least one hashing round".into()));
    }

    let mut hasher = Sha256::new();
    let mut key = Zeroizing::new([0u8; KEY_LEN]);

    hasher.update(passphrase.as_bytes());
    key.copy_from_slice(&hasher.finalize_reset());

    for _ in 1..rounds {
        hasher.update(&key[..]);
        key.copy_from_slice(&hasher.finalize_reset());
    }

    Ok(key)
}
