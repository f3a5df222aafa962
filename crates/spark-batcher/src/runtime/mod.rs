//! 单线程协作式调度契约与默认执行器。
//!
//! # 模块定位（Why）
//! - 批处理引擎的全部状态变更都在“处理轮次”内完成，轮次之间唯一的挂起形式是把工作推迟到事件循环的下一拍；
//! - 推迟有两种用途：避免在 `write` 调用内部重入发射，以及实现超时触发器；二者都收敛到 [`Scheduler`] 这一注入点。
//!
//! # 结构概览（What）
//! - [`Scheduler`]：`defer`（下一拍执行）、`schedule_after`（延迟执行）、`cancel`（撤销定时器）三个原语；
//! - [`LocalRuntime`]：基于 [`crate::time::Clock`] 的单线程实现，测试中搭配 [`crate::time::MockClock`] 推进虚拟时间。
//!
//! # 并发约束
//! - 所有任务在同一线程上串行执行，实现不得在 `defer`/`schedule_after` 内部同步执行任务本身，
//!   否则引擎的“错误与 flush 回调一律延后送达”契约将被破坏。

mod executor;

use core::time::Duration;

pub use executor::LocalRuntime;

/// 调度单元：在事件循环线程上执行一次且仅一次的闭包。
pub type Task = Box<dyn FnOnce() + 'static>;

/// 定时器句柄，用于撤销尚未触发的延迟任务。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 句柄的原始序号，仅用于日志。
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

/// 单线程协作式调度器。
///
/// # 教案式说明
/// - **意图 (Why)**：把 “next tick” 与定时器从引擎中剥离成显式依赖，测试可以逐拍驱动并精确控制时间；
/// - **契约 (What)**：
///   - `defer`：任务在当前调用返回后的某一拍执行，按提交顺序 FIFO；
///   - `schedule_after`：任务在至少 `delay` 之后执行，同一截止时间按登记顺序执行；
///   - `cancel`：撤销尚未执行的定时器，返回是否确实撤销；已执行或未知句柄返回 `false`；
/// - **风险 (Trade-offs)**：接口不要求 `Send`，任务只能在创建它的线程上运行。
pub trait Scheduler {
    /// 将任务推迟到下一拍执行。
    fn defer(&self, task: Task);

    /// 登记一个延迟任务。
    fn schedule_after(&self, delay: Duration, task: Task) -> TimerId;

    /// 撤销尚未触发的定时器。
    fn cancel(&self, timer: TimerId) -> bool;
}
