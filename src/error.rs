//! passvault 错误类型
//!
//! 库内部统一使用 [`VaultError`]；容器读写（write_document / read_document）
//! 对外只暴露 [`DocumentError`]：调用方只需区分“文件不存在”与“其他失败”。

use std::io;
use std::path::Path;

use thiserror::Error;

/// 面向用户的诊断信息最大字符数，超出部分以 `...` 截断
pub const MESSAGE_LIMIT: usize = 80;

/// 失败分类（对应 Io / Decrypt / Format / Config 四类）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Io,
    Decrypt,
    Format,
    Config,
}

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 填充校验失败：通常是密码错误，但并不可靠
    #[error("decryption failed")]
    Decrypt,

    #[error("invalid format: {0}")]
    Format(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid cipher state: {0}")]
    InvalidState(&'static str),

    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}

impl VaultError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Io(_) => FailureKind::Io,
            Self::Decrypt => FailureKind::Decrypt,
            Self::Format(_) | Self::InvalidEntry(_) => FailureKind::Format,
            Self::Config(_) | Self::InvalidState(_) => FailureKind::Config,
        }
    }

    /// 复制出一个等价的错误；`Io` 只保留 kind 与描述
    pub fn replicate(&self) -> Self {
        match self {
            Self::Io(err) => Self::Io(io::Error::new(err.kind(), err.to_string())),
            Self::Decrypt => Self::Decrypt,
            Self::Format(msg) => Self::Format(msg.clone()),
            Self::Config(msg) => Self::Config(msg.clone()),
            Self::InvalidState(msg) => Self::InvalidState(msg),
            Self::InvalidEntry(msg) => Self::InvalidEntry(msg.clone()),
        }
    }

    /// 将错误装入 `io::Error`，供 Read / Write 适配器向上传递
    pub fn into_io(self) -> io::Error {
        match self {
            Self::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }

    /// [`VaultError::into_io`] 的逆操作
    ///
    /// 经过 flate2 / quick-xml 等中间层后，原始错误仍可还原；
    /// 纯 I/O 错误中 InvalidData / InvalidInput / UnexpectedEof
    /// 来自解压层或截断的数据，归为格式错误。
    pub fn from_io(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<VaultError>()) {
            if let Some(inner) = err.into_inner() {
                if let Ok(vault) = inner.downcast::<VaultError>() {
                    return *vault;
                }
            }
            return Self::Format("malformed stream".into());
        }

        match err.kind() {
            io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::UnexpectedEof => Self::Format(err.to_string()),
            _ => Self::Io(err),
        }
    }
}

impl From<quick_xml::Error> for VaultError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(io_err) => Self::Io(io::Error::new(io_err.kind(), io_err.to_string())),
            other => Self::Format(other.to_string()),
        }
    }
}

impl From<quick_xml::DeError> for VaultError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Format(err.to_string())
    }
}

/// 容器读写失败
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("File not found:\n{path}")]
    NotFound { path: String },

    #[error("Cannot process document due to the following exception:\n{message}")]
    Process { kind: FailureKind, message: String },
}

impl DocumentError {
    /// 折叠任意 [`VaultError`]，`path` 仅用于“文件不存在”的提示
    pub fn wrap(path: &Path, err: VaultError) -> Self {
        if let VaultError::Io(io_err) = &err {
            if io_err.kind() == io::ErrorKind::NotFound {
                return Self::NotFound {
                    path: strip_message(&path.display().to_string()),
                };
            }
        }

        Self::Process {
            kind: err.kind(),
            message: strip_message(&err.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::Io,
            Self::Process { kind, .. } => *kind,
        }
    }
}

/// 按字符截断到 [`MESSAGE_LIMIT`]，避免把大块内部数据带进用户可见文本
pub fn strip_message(text: &str) -> String {
    match text.char_indices().nth(MESSAGE_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_message_keeps_short_text() {
        assert_eq!(strip_message("short"), "short");
        let exact = "x".repeat(MESSAGE_LIMIT);
        assert_eq!(strip_message(&exact), exact);
    }

    #[test]
    fn strip_message_truncates_on_char_boundary() {
        let long = "密".repeat(MESSAGE_LIMIT + 5);
        let stripped = strip_message(&long);
        assert_eq!(stripped.chars().count(), MESSAGE_LIMIT + 3);
        assert!(stripped.ends_with("..."));
    }

    #[test]
    fn io_roundtrip_preserves_vault_error() {
        let io_err = VaultError::Decrypt.into_io();
        assert!(matches!(VaultError::from_io(io_err), VaultError::Decrypt));

        let io_err = VaultError::Format("bad".into()).into_io();
        assert!(matches!(VaultError::from_io(io_err), VaultError::Format(_)));
    }

    #[test]
    fn replicate_keeps_variant_and_message() {
        let copy = VaultError::Format("bad block".into()).replicate();
        assert!(matches!(copy, VaultError::Format(ref m) if m == "bad block"));

        let io_err = VaultError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        match io_err.replicate() {
            VaultError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("unexpected variant: {other}"),
        }
    }

    #[test]
    fn plain_io_errors_are_classified() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated");
        assert_eq!(VaultError::from_io(eof).kind(), FailureKind::Format);

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(VaultError::from_io(denied).kind(), FailureKind::Io);
    }

    #[test]
    fn not_found_is_distinguished() {
        let err = VaultError::Io(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let doc = DocumentError::wrap(Path::new("vault.crypt"), err);
        assert!(doc.is_not_found());

        let doc = DocumentError::wrap(Path::new("vault.crypt"), VaultError::Decrypt);
        assert!(!doc.is_not_found());
        assert_eq!(doc.kind(), FailureKind::Decrypt);
        assert!(doc.to_string().starts_with("Cannot process document"));
    }
}
