//! passvault 加解密流适配器
//!
//! 把 [`CbcCipher`] 包装成标准的 `Write` / `Read`，
//! 让任意长度的数据（例如 gzip 压缩流）直接流过密码器。
//!
//! - [`EncryptWriter`]：写入明文，向下游输出 `[IV] || 密文`
//! - [`DecryptReader`]：从上游拉取 `[IV] || 密文`，每次最多 [`FETCH_SIZE`] 字节，
//!   向调用方提供明文
//!
//! 非 I/O 失败（填充错误、格式错误）以 `io::Error` 形式抛出，
//! 可用 [`VaultError::from_io`] 还原。

use std::io::{self, Read, Write};

use tracing::debug;

use crate::crypto::cbc::CbcCipher;
use crate::crypto::kdf::KEY_LEN;
use crate::crypto::rng::RandomSource;
use crate::error::VaultError;
use crate::format::header::{self, Iv};

/// 每次从上游读取的最大密文字节数
pub const FETCH_SIZE: usize = 32;

/// 流式加密器
pub struct EncryptWriter<W: Write> {
    inner: W,
    cipher: CbcCipher,
    iv: Iv,
}

impl<W: Write> EncryptWriter<W> {
    /// 生成新的随机 IV，并在任何密文之前把它原样写入 `inner`
    pub fn new(mut inner: W, key: &[u8; KEY_LEN], rng: &mut RandomSource) -> Result<Self, VaultError> {
        let iv = header::generate_iv(rng);
        header::write_iv(&mut inner, &iv)?;
        debug!(secure_rng = rng.is_secure(), "generated container IV");

        Ok(Self::with_iv(inner, key, iv))
    }

    /// 使用调用方给定的 IV；IV 不会写入 `inner`
    pub fn with_iv(inner: W, key: &[u8; KEY_LEN], iv: Iv) -> Self {
        Self {
            inner,
            cipher: CbcCipher::new(key, &iv),
            iv,
        }
    }

    pub fn iv(&self) -> &Iv {
        &self.iv
    }

    /// 写出填充后的最后一块并 flush，返回下游输出流
    ///
    /// 出错时 `inner` 随 `self` 一起被释放。
    pub fn finish(mut self) -> Result<W, VaultError> {
        self.cipher.finish_encryption(&mut self.inner)?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for EncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cipher
            .encrypt(buf, &mut self.inner)
            .map_err(VaultError::into_io)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // 缓冲区中不足一块的数据只能在 finish 时写出
        self.inner.flush()
    }
}

/// 流式解密器
pub struct DecryptReader<R: Read> {
    inner: R,
    cipher: CbcCipher,
    fetch: [u8; FETCH_SIZE],
    plain: Vec<u8>,
    consumed: usize,
    eof: bool,
    // 密码器报错后，之后的每次读取都返回同一错误
    failure: Option<VaultError>,
}

impl<R: Read> DecryptReader<R> {
    /// 从 `inner` 读取前 16 字节作为 IV
    ///
    /// 不足 16 字节时返回 [`VaultError::Format`]。
    pub fn new(mut inner: R, key: &[u8; KEY_LEN]) -> Result<Self, VaultError> {
        let iv = header::read_iv(&mut inner)?;
        Ok(Self::with_iv(inner, key, iv))
    }

    /// 使用调用方给定的 IV，`inner` 从第一个密文字节开始
    pub fn with_iv(inner: R, key: &[u8; KEY_LEN], iv: Iv) -> Self {
        Self {
            inner,
            cipher: CbcCipher::new(key, &iv),
            fetch: [0u8; FETCH_SIZE],
            plain: Vec::with_capacity(FETCH_SIZE + 16),
            consumed: 0,
            eof: false,
            failure: None,
        }
    }

    /// 逐字节读取；流结束时返回 `None`
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// 拉取下一段密文并解密到 `plain`；返回 false 表示已无更多明文
    fn refill(&mut self) -> io::Result<bool> {
        self.plain.clear();
        self.consumed = 0;

        while self.plain.is_empty() {
            if self.eof {
                return Ok(false);
            }

            let read = match self.inner.read(&mut self.fetch) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            let result = if read == 0 {
                self.cipher.finish_decryption(&mut self.plain)
            } else {
                self.cipher.decrypt(&self.fetch[..read], &mut self.plain)
            };

            if let Err(err) = result {
                self.plain.clear();
                let replay = err.replicate();
                self.failure = Some(err);
                return Err(replay.into_io());
            }
            self.eof = read == 0;
        }

        Ok(true)
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(err) = &self.failure {
            return Err(err.replicate().into_io());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        if self.consumed >= self.plain.len() && !self.refill()? {
            return Ok(0);
        }

        let available = &self.plain[self.consumed..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consumed += n;

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const KEY: [u8; KEY_LEN] = [0x42u8; KEY_LEN];

    fn seal(plaintext: &[u8]) -> Vec<u8> {
        let mut rng = RandomSource::new();
        let mut writer = EncryptWriter::new(Vec::new(), &KEY, &mut rng).unwrap();
        writer.write_all(plaintext).unwrap();
        writer.finish().unwrap()
    }

    fn open(container: &[u8]) -> io::Result<Vec<u8>> {
        let mut reader = DecryptReader::new(Cursor::new(container), &KEY)
            .map_err(VaultError::into_io)?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn iv_prefix_and_block_aligned_body() {
        let container = seal(b"hello vault");
        assert_eq!(container.len(), 16 + 16);

        let writer = EncryptWriter::with_iv(Vec::new(), &KEY, [1u8; 16]);
        assert_eq!(writer.iv(), &[1u8; 16]);
        assert!(writer.finish().unwrap().len() == 16);
    }

    #[test]
    fn roundtrip_across_fetch_boundaries() {
        for len in [0, 1, 15, 16, 17, 31, 32, 33, 47, 48, 64, 100, 1000] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            assert_eq!(open(&seal(&plaintext)).unwrap(), plaintext, "len {len}");
        }
    }

    #[test]
    fn explicit_iv_roundtrip() {
        let iv = [5u8; 16];
        let mut writer = EncryptWriter::with_iv(Vec::new(), &KEY, iv);
        writer.write_all(b"explicit iv").unwrap();
        let body = writer.finish().unwrap();

        let mut reader = DecryptReader::with_iv(Cursor::new(body), &KEY, iv);
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "explicit iv");
    }

    #[test]
    fn byte_wise_reading() {
        let container = seal(b"abc");
        let mut reader = DecryptReader::new(Cursor::new(container), &KEY).unwrap();
        assert_eq!(reader.read_byte().unwrap(), Some(b'a'));
        assert_eq!(reader.read_byte().unwrap(), Some(b'b'));
        assert_eq!(reader.read_byte().unwrap(), Some(b'c'));
        assert_eq!(reader.read_byte().unwrap(), None);
        assert_eq!(reader.read_byte().unwrap(), None);
    }

    #[test]
    fn missing_iv_is_format_error() {
        let err = DecryptReader::new(Cursor::new(vec![0u8; 10]), &KEY).err().unwrap();
        assert!(matches!(err, VaultError::Format(_)));
    }

    #[test]
    fn bad_padding_surfaces_as_io_error() {
        let mut container = seal(b"tamper with the final block");
        let last = container.len() - 1;
        container[last] ^= 0xff;

        match open(&container) {
            Err(e) => {
                assert_eq!(e.kind(), io::ErrorKind::InvalidData);
                assert!(matches!(VaultError::from_io(e), VaultError::Decrypt));
            }
            // CBC 无认证：极小概率篡改后填充仍然合法
            Ok(out) => assert_ne!(out, b"tamper with the final block"),
        }
    }

    #[test]
    fn padding_failure_is_sticky() {
        // 单个全零明文块不带填充：解密后末字节为 0，填充必然非法
        let iv = [3u8; 16];
        let mut cipher = CbcCipher::new(&KEY, &iv);
        let mut body = Vec::new();
        cipher.encrypt(&[0u8; 16], &mut body).unwrap();
        assert_eq!(body.len(), 16);

        let mut reader = DecryptReader::with_iv(Cursor::new(body), &KEY, iv);
        let mut buf = [0u8; 8];
        for _ in 0..3 {
            let err = reader.read(&mut buf).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
            assert!(matches!(VaultError::from_io(err), VaultError::Decrypt));
        }
        assert!(reader.read_byte().is_err());
        assert!(reader.read_to_end(&mut Vec::new()).is_err());
    }

    #[test]
    fn truncated_body_is_format_error() {
        let mut container = seal(b"some data here");
        container.truncate(container.len() - 3);

        let err = open(&container).unwrap_err();
        assert!(matches!(VaultError::from_io(err), VaultError::Format(_)));
    }
}
