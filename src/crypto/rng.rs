//! passvault 随机源
//!
//! 优先使用操作系统 CSPRNG（`OsRng`）。若进程启动后首次探测失败，
//! 退化为以时钟与进程号为种子的 `StdRng`。
//!
//! 该选择每个进程只做一次，并通过 [`RandomSource::kind`] 对外可见，
//! 调用方可据此决定是否继续（例如拒绝在退化模式下生成口令）。

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use tracing::warn;

/// 随机源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngKind {
    /// 操作系统提供的密码学安全随机数
    Os,
    /// 非密码学安全的伪随机数（退化模式）
    Fallback,
}

static SYSTEM_KIND: OnceLock<RngKind> = OnceLock::new();

/// 探测 OsRng 是否可用，结果在进程内缓存
fn system_kind() -> RngKind {
    *SYSTEM_KIND.get_or_init(|| {
        let mut probe = [0u8; 16];
        match OsRng.try_fill_bytes(&mut probe) {
            Ok(()) => RngKind::Os,
            Err(e) => {
                warn!("OS random generator unavailable, falling back to a non-cryptographic PRNG: {e}");
                RngKind::Fallback
            }
        }
    })
}

enum Inner {
    Os(OsRng),
    Fallback(StdRng),
}

pub struct RandomSource {
    inner: Inner,
}

impl RandomSource {
    /// 按进程级探测结果创建随机源
    pub fn new() -> Self {
        Self::with_kind(system_kind())
    }

    /// 强制指定随机源类型
    pub fn with_kind(kind: RngKind) -> Self {
        let inner = match kind {
            RngKind::Os => Inner::Os(OsRng),
            RngKind::Fallback => Inner::Fallback(StdRng::seed_from_u64(platform_seed())),
        };
        Self { inner }
    }

    pub fn kind(&self) -> RngKind {
        match self.inner {
            Inner::Os(_) => RngKind::Os,
            Inner::Fallback(_) => RngKind::Fallback,
        }
    }

    pub fn is_secure(&self) -> bool {
        self.kind() == RngKind::Os
    }

    /// 用随机字节填满 `dest`
    pub fn fill(&mut self, dest: &mut [u8]) {
        match &mut self.inner {
            Inner::Os(rng) => {
                if let Err(e) = rng.try_fill_bytes(dest) {
                    // 探测成功后 OsRng 仍可能失败；本次改用一次性 StdRng
                    warn!("OS random generator failed: {e}");
                    StdRng::seed_from_u64(platform_seed()).fill_bytes(dest);
                }
            }
            Inner::Fallback(rng) => rng.fill_bytes(dest),
        }
    }

    /// 返回 `n` 个新随机字节
    pub fn next_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; n];
        self.fill(&mut bytes);
        bytes
    }

    /// 在 `0..upper` 中均匀取一个下标（`upper` 必须大于 0）
    pub fn index(&mut self, upper: usize) -> usize {
        match &mut self.inner {
            Inner::Os(rng) => rng.gen_range(0..upper),
            Inner::Fallback(rng) => rng.gen_range(0..upper),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

fn platform_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    mix_seed(nanos, std::process::id())
}

/// 只取纳秒数的低 64 位，再与进程号混合
fn mix_seed(nanos: u128, pid: u32) -> u64 {
    let low = u64::try_from(nanos & u128::from(u64::MAX)).unwrap_or_default();
    low ^ (u64::from(pid) << 32)
}
