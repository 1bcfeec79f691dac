//! passvault 口令生成器
//!
//! 从所选字符集的并集中均匀抽取字符。

use crate::crypto::rng::RandomSource;
use crate::error::VaultError;

pub const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DIGITS: &str = "0123456789";
pub const SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_{|}~";

/// 默认口令长度
pub const DEFAULT_LENGTH: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub length: usize,
    pub upper: bool,
    pub lower: bool,
    pub digits: bool,
    /// 自定义符号集；`None` 表示不使用符号
    pub symbols: Option<String>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            upper: true,
            lower: true,
            digits: true,
            symbols: Some(SYMBOLS.to_string()),
        }
    }
}

impl PasswordPolicy {
    /// 所选字符集的并集（保持顺序，可能含重复字符）
    pub fn alphabet(&self) -> Vec<char> {
        let mut alphabet = Vec::new();
        if self.upper {
            alphabet.extend(UPPER.chars());
        }
        if self.lower {
            alphabet.extend(LOWER.chars());
        }
        if self.digits {
            alphabet.extend(DIGITS.chars());
        }
        if let Some(symbols) = &self.symbols {
            alphabet.extend(symbols.chars());
        }
        alphabet
    }
}

/// 按 `policy` 生成口令
///
/// #### 错误
/// - 未选择任何字符或长度为 0：[`VaultError::InvalidEntry`]
pub fn generate(policy: &PasswordPolicy, rng: &mut RandomSource) -> Result<String, VaultError> {
    if policy.length == 0 {
        return Err(VaultError::InvalidEntry("password length must be at least 1".into()));
    }

    let alphabet = policy.alphabet();
    if alphabet.is_empty() {
        return Err(VaultError::InvalidEntry("select at least one character set".into()));
    }

    Ok((0..policy.length)
        .map(|_| alphabet[rng.index(alphabet.len())])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_length_and_alphabet() {
        let mut rng = RandomSource::new();
        let policy = PasswordPolicy::default();
        let password = generate(&policy, &mut rng).unwrap();

        assert_eq!(password.chars().count(), DEFAULT_LENGTH);
        let alphabet = policy.alphabet();
        assert!(password.chars().all(|c| alphabet.contains(&c)));
    }

    #[test]
    fn digits_only() {
        let mut rng = RandomSource::new();
        let policy = PasswordPolicy {
            length: 32,
            upper: false,
            lower: false,
            digits: true,
            symbols: None,
        };
        let password = generate(&policy, &mut rng).unwrap();
        assert!(password.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn empty_policy_is_rejected() {
        let mut rng = RandomSource::new();
        let policy = PasswordPolicy {
            length: 10,
            upper: false,
            lower: false,
            digits: false,
            symbols: Some(String::new()),
        };
        assert!(generate(&policy, &mut rng).is_err());

        let policy = PasswordPolicy {
            length: 0,
            ..PasswordPolicy::default()
        };
        assert!(generate(&policy, &mut rng).is_err());
    }
}
