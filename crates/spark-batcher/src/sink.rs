//! 下游事件契约：引擎只产生 `data` 与 `error` 两类事件。

use crate::error::BatchError;

/// 引擎投递给 Sink 的事件。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchEvent<P> {
    /// 一个批次编码后的负载。
    Data(P),
    /// 被拒写入的异步通知。
    Error(BatchError),
}

/// 接收批次负载与写入拒绝的下游。
///
/// # 教案式说明
/// - **意图 (Why)**：以组合代替继承，引擎只依赖“能收数据、能收错误”这一最小能力，传输层如何消费负载由实现自行决定；
/// - **契约 (What)**：
///   - 回调总在事件循环的某一拍内被调用，从不发生在 `write`/`flush` 等调用的同一调用栈内；
///   - 回调内部可以再次调用引擎的任意操作（例如在 `on_data` 中继续写入），新工作会被推迟到后续轮次；
///   - `destroy()` 之后不再有任何回调；
/// - **风险 (Trade-offs)**：回调在引擎线程同步执行，耗时操作会直接拖慢后续批次。
pub trait BatchSink<P> {
    /// 接收一个批次负载。
    fn on_data(&mut self, payload: P);

    /// 接收一次写入拒绝。
    fn on_error(&mut self, error: BatchError);
}

impl<P, F> BatchSink<P> for F
where
    F: FnMut(BatchEvent<P>),
{
    fn on_data(&mut self, payload: P) {
        self(BatchEvent::Data(payload));
    }

    fn on_error(&mut self, error: BatchError) {
        self(BatchEvent::Error(error));
    }
}
