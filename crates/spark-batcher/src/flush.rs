//! flush 水位登记与按序兑现。
//!
//! # 模块定位（Why）
//! - 调用方需要确切知道“此刻之前写入的条目”何时已全部发射；
//! - 每个请求记录一个发射位置水位，发射进度越过水位即兑现回调。
//!
//! # 契约说明（What）
//! - 水位按调用顺序单调不减，因此兑现顺序等于调用顺序；
//! - 每个回调恰好执行一次，由调用方在释放引擎状态借用后执行；
//! - `is_requested` 标记存在待兑现请求（或超时触发的一次性排空），
//!   调度器据此在队列不足 `batch_size` 时也继续切批。

use std::collections::VecDeque;

use tracing::trace;

/// flush 完成回调。
pub type FlushCompletion = Box<dyn FnOnce() + 'static>;

struct FlushRequest {
    watermark: u64,
    completion: FlushCompletion,
}

/// 待兑现的 flush 请求表。
#[derive(Default)]
pub struct FlushTracker {
    requests: VecDeque<FlushRequest>,
    requested: bool,
}

impl FlushTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个水位请求，并要求调度器持续排空。
    pub fn push(&mut self, watermark: u64, completion: FlushCompletion) {
        debug_assert!(
            self.requests
                .back()
                .is_none_or(|last| last.watermark <= watermark),
            "flush 水位必须单调不减"
        );
        self.requests.push_back(FlushRequest {
            watermark,
            completion,
        });
        self.requested = true;
    }

    /// 不登记回调，仅要求下一轮排空到底（超时触发器使用）。
    pub fn request_drain(&mut self) {
        self.requested = true;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// 待兑现请求数。
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// 取出所有水位不超过 `emit_position` 的回调，并按剩余请求重算排空标记。
    pub fn take_resolved(&mut self, emit_position: u64) -> Vec<FlushCompletion> {
        let mut resolved = Vec::new();
        while self
            .requests
            .front()
            .is_some_and(|request| request.watermark <= emit_position)
        {
            if let Some(request) = self.requests.pop_front() {
                trace!(watermark = request.watermark, emit_position, "flush resolved");
                resolved.push(request.completion);
            }
        }
        self.requested = !self.requests.is_empty();
        resolved
    }

    /// 丢弃全部未兑现请求（不执行回调），返回丢弃数量。
    pub fn clear(&mut self) -> usize {
        let dropped = self.requests.len();
        self.requests.clear();
        self.requested = false;
        dropped
    }
}
