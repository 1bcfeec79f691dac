//! passvault 密码学原语
//!
//! - `kdf`：口令 → 256-bit 密钥（迭代 SHA-256）
//! - `rng`：IV 与口令生成所用的随机源
//! - `cbc`：AES-256-CBC 状态机（PKCS#7 填充）

pub mod cbc;
pub mod kdf;
pub mod rng;
