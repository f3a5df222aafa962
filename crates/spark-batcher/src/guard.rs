//! 准入控制：积压上限与一次性关闭。

use tracing::info;

use crate::error::BatchError;

/// 准入上限。
///
/// - `Bounded(n)`：队列深度严格小于 `n` 时放行；
/// - `Closed`：永久拒绝，对应配置中的哨兵值 `-1` 或 `end()` 之后的状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowLimit {
    Bounded(usize),
    Closed,
}

/// 写入准入守卫。
///
/// # 教案式说明
/// - **意图 (Why)**：下游停滞时阻止队列无限增长；关闭后拒绝一切写入但不丢弃已排队条目；
/// - **契约 (What)**：`admit` 只做判断不改变队列，也不影响暂停/运行状态；`close` 不可逆；
/// - **风险 (Trade-offs)**：上限按条目数而非字节数计算，大条目场景需调用方自行折算。
#[derive(Debug)]
pub struct OverflowGuard {
    limit: OverflowLimit,
}

impl OverflowGuard {
    pub fn new(limit: OverflowLimit) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> OverflowLimit {
        self.limit
    }

    pub fn is_closed(&self) -> bool {
        self.limit == OverflowLimit::Closed
    }

    /// 判断当前深度下能否再接纳一条。
    pub fn admit(&self, queued: usize) -> Result<(), BatchError> {
        match self.limit {
            OverflowLimit::Closed => Err(BatchError::Closed),
            OverflowLimit::Bounded(limit) if queued < limit => Ok(()),
            OverflowLimit::Bounded(limit) => Err(BatchError::Overflow { limit }),
        }
    }

    /// 永久关闭准入。
    pub fn close(&mut self) {
        if !self.is_closed() {
            info!(previous_limit = ?self.limit, "batcher admission closed");
            self.limit = OverflowLimit::Closed;
        }
    }
}
