//! passvault CBC 状态机
//!
//! AES-256 块密码 + CBC 链接 + PKCS#7 填充，支持任意长度的流式输入。
//!
//! 状态：`Ready → Streaming → Finished`
//! - 首次 `encrypt` / `decrypt` 决定方向，之后不可混用
//! - `finish_*` 之后任何调用都立即返回 [`VaultError::InvalidState`]
//!
//! 解密方向滞后一个块：一个完整的密文块只有在下一块开始到达后才会被解密，
//! 最后一块留到 `finish_decryption` 时去除填充。

use std::io::Write;

use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::crypto::kdf::KEY_LEN;
use crate::error::VaultError;

/// AES 块大小（字节）
pub const BLOCK_SIZE: usize = 16;

type Block = [u8; BLOCK_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Streaming(Direction),
    Finished,
}

/// CBC 加解密器
///
/// 每个实例只服务一次流操作（一个文件），不可跨文件复用。
pub struct CbcCipher {
    cipher: Aes256,
    chain: Block,
    buffer: Block,
    buffered: usize,
    state: State,
}

impl CbcCipher {
    /// 以 `key` 与 `iv` 初始化；链接值初始为 IV
    pub fn new(key: &[u8; KEY_LEN], iv: &[u8; BLOCK_SIZE]) -> Self {
        Self {
            cipher: Aes256::new(GenericArray::from_slice(key)),
            chain: *iv,
            buffer: [0u8; BLOCK_SIZE],
            buffered: 0,
            state: State::Ready,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// 加密任意长度的数据，完整的密文块立即写入 `out`
    ///
    /// 不足一块的尾部留在内部缓冲区，等待后续输入或 `finish_encryption`。
    pub fn encrypt<W: Write>(&mut self, mut data: &[u8], out: &mut W) -> Result<(), VaultError> {
        self.enter(Direction::Encrypt)?;

        while !data.is_empty() {
            let taken = self.absorb(data);
            data = &data[taken..];

            if self.buffered == BLOCK_SIZE {
                let block = self.encrypt_buffer();
                out.write_all(&block)?;
            }
        }

        Ok(())
    }

    /// 填充并加密最后一块，然后 flush `out`
    ///
    /// 填充总是存在：恰好整块时追加一个完整的填充块。
    pub fn finish_encryption<W: Write>(&mut self, out: &mut W) -> Result<(), VaultError> {
        self.enter(Direction::Encrypt)?;
        self.state = State::Finished;

        let pad = (BLOCK_SIZE - self.buffered) as u8;
        self.buffer[self.buffered..].fill(pad);
        self.buffered = BLOCK_SIZE;

        let block = self.encrypt_buffer();
        out.write_all(&block)?;
        out.flush()?;

        Ok(())
    }

    /// 解密任意长度的密文，已确认不是最后一块的明文写入 `out`
    pub fn decrypt<W: Write>(&mut self, mut data: &[u8], out: &mut W) -> Result<(), VaultError> {
        self.enter(Direction::Decrypt)?;

        while !data.is_empty() {
            // 缓冲区里的整块只有在后续数据到达时才确定不是最后一块
            if self.buffered == BLOCK_SIZE {
                let block = self.decrypt_buffer();
                out.write_all(&block)?;
            }

            let taken = self.absorb(data);
            data = &data[taken..];
        }

        Ok(())
    }

    /// 解密保留的最后一块，校验并去除填充
    ///
    /// #### 错误
    /// - 密文总长不是块大小的正整数倍：[`VaultError::Format`]
    /// - 填充非法：[`VaultError::Decrypt`]，此时不输出任何数据
    pub fn finish_decryption<W: Write>(&mut self, out: &mut W) -> Result<(), VaultError> {
        self.enter(Direction::Decrypt)?;
        self.state = State::Finished;

        if self.buffered != BLOCK_SIZE {
            return Err(VaultError::Format(format!(
                "ciphertext is not a positive multiple of {BLOCK_SIZE} bytes"
            )));
        }

        let block = self.decrypt_buffer();
        let pad = usize::from(block[BLOCK_SIZE - 1]);

        if pad == 0 || pad > BLOCK_SIZE {
            return Err(VaultError::Decrypt);
        }
        if block[BLOCK_SIZE - pad..].iter().any(|&b| usize::from(b) != pad) {
            return Err(VaultError::Decrypt);
        }

        out.write_all(&block[..BLOCK_SIZE - pad])?;
        out.flush()?;

        Ok(())
    }

    fn enter(&mut self, direction: Direction) -> Result<(), VaultError> {
        match self.state {
            State::Ready => {
                self.state = State::Streaming(direction);
                Ok(())
            }
            State::Streaming(current) if current == direction => Ok(()),
            State::Streaming(_) => Err(VaultError::InvalidState(
                "cipher cannot switch between encryption and decryption",
            )),
            State::Finished => Err(VaultError::InvalidState("cipher already finished")),
        }
    }

    /// 把 `data` 尽量填入缓冲区，返回消费的字节数
    fn absorb(&mut self, data: &[u8]) -> usize {
        let taken = (BLOCK_SIZE - self.buffered).min(data.len());
        self.buffer[self.buffered..self.buffered + taken].copy_from_slice(&data[..taken]);
        self.buffered += taken;
        taken
    }

    fn encrypt_buffer(&mut self) -> Block {
        let mut block = aes::Block::default();
        for (dst, (b, c)) in block.iter_mut().zip(self.buffer.iter().zip(self.chain.iter())) {
            *dst = b ^ c;
        }

        self.cipher.encrypt_block(&mut block);

        self.chain.copy_from_slice(&block);
        self.buffered = 0;
        self.chain
    }

    fn decrypt_buffer(&mut self) -> Block {
        let mut block = aes::Block::clone_from_slice(&self.buffer);
        self.cipher.decrypt_block(&mut block);

        let mut plain = [0u8; BLOCK_SIZE];
        for (dst, (b, c)) in plain.iter_mut().zip(block.iter().zip(self.chain.iter())) {
            *dst = b ^ c;
        }

        self.chain = self.buffer;
        self.buffered = 0;
        plain
    }
}
