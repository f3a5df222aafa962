//! 批处理控制引擎：待发射队列、切批触发、暂停门、准入守卫与 flush 水位的统一状态机。
//!
//! # 模块定位（Why）
//! - 生产者逐条写入，消费者偏好成批接收；引擎在数量阈值或时间阈值满足时切出批次；
//! - 流控（暂停/恢复）、背压（积压上限拒绝）与排空通知（flush）都必须与切批共享同一份状态，
//!   因此集中在一个显式持有的结构体里，而不是散落在回调闭包中。
//!
//! # 执行模型（How）
//! - 引擎运行在单线程协作式调度之上：所有状态变更发生在“处理轮次”内，轮次之间的唯一挂起点是
//!   [`Scheduler::defer`] 推迟的下一拍与 [`Scheduler::schedule_after`] 登记的超时触发器；
//! - 轮次调度显式建模为 [`PassState`]：`Idle → Scheduled → Running → Idle`，任意时刻至多一个待执行轮次；
//! - 状态借用在调用编码器、Sink 与 flush 回调之前释放，回调内部可以安全地重入引擎。
//!
//! # 契约说明（What）
//! - 发射顺序严格等于写入顺序；单批不超过 `max_batch_size`；
//! - flush 回调按调用顺序兑现，且晚于其覆盖条目的 `data` 事件；
//! - 写入拒绝、空队列 flush 的回调一律延后到后续的拍，从不在调用栈内同步发生；
//! - `destroy()` 之后不再产生任何 `data`/`error` 事件。

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bytes::Bytes;
use tracing::{debug, info, trace, warn};

use crate::config::BatcherOptions;
use crate::encoder::{ConcatEncoder, Encoder};
use crate::error::BatchError;
use crate::flush::FlushTracker;
use crate::guard::OverflowGuard;
use crate::queue::PendingQueue;
use crate::runtime::{Scheduler, TimerId};
use crate::sink::BatchSink;

/// 处理轮次的调度状态。
///
/// - `Idle`：没有待执行轮次；
/// - `Scheduled`：已有一个轮次登记在事件循环中，后续请求直接合并；
/// - `Running`：轮次执行中；此时到达的请求会登记一个新轮次并转入 `Scheduled`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Scheduled,
    Running,
}

/// 引擎状态快照，供观测与测试断言使用。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatcherStats {
    /// 队列中尚未发射的条目数。
    pub queued: usize,
    /// 生命周期内累计发射的条目数。
    pub emit_position: u64,
    /// 最近一次恢复（或切批）时的发射位置，flush 水位以此为基准。
    pub sent_position: u64,
    /// 尚未兑现的 flush 请求数。
    pub pending_flushes: usize,
    pub batch_size: usize,
    pub max_batch_size: usize,
    pub paused: bool,
    pub destroyed: bool,
    pub pass: PassState,
    pub timer_armed: bool,
}

/// 批处理控制引擎句柄。
///
/// # 教案式说明
/// - **意图 (Why)**：在逐条写入的生产者与成批消费的下游之间提供带流控、背压与排空通知的缓冲层；
/// - **契约 (What)**：
///   - 新建实例处于暂停状态，调用 [`Batcher::resume`] 后才会发射；
///   - 句柄可克隆，克隆体共享同一实例，便于在 Sink 或 flush 回调中重入；
///   - 最后一个句柄释放时撤销尚未触发的超时定时器；
/// - **风险 (Trade-offs)**：实例绑定单线程调度器，既不 `Send` 也不 `Sync`；跨线程生产者需先汇聚到事件循环线程。
pub struct Batcher<T, E = ConcatEncoder>
where
    T: 'static,
    E: Encoder<T> + 'static,
    E::Payload: 'static,
{
    shared: Rc<Shared<T, E>>,
}

impl<T, E> Clone for Batcher<T, E>
where
    T: 'static,
    E: Encoder<T> + 'static,
    E::Payload: 'static,
{
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

struct Shared<T, E>
where
    E: Encoder<T>,
{
    state: RefCell<State<T>>,
    encoder: RefCell<E>,
    sink: RefCell<Box<dyn BatchSink<E::Payload>>>,
    scheduler: Rc<dyn Scheduler>,
}

struct State<T> {
    options: BatcherOptions,
    queue: PendingQueue<T>,
    guard: OverflowGuard,
    flushes: FlushTracker,
    emit_position: u64,
    sent_position: u64,
    paused: bool,
    writable: bool,
    destroyed: bool,
    pass: PassState,
    timer: Option<TimerId>,
}

impl<T> State<T> {
    fn should_cut(&self) -> bool {
        !self.paused
            && !self.destroyed
            && !self.queue.is_empty()
            && (self.queue.len() >= self.options.batch_size() || self.flushes.is_requested())
    }

    fn needs_timer(&self) -> bool {
        !self.paused && !self.destroyed && self.timer.is_none() && !self.queue.is_empty()
    }
}

impl<T> Batcher<T, ConcatEncoder>
where
    T: AsRef<[u8]> + 'static,
{
    /// 使用默认的字节拼接编码器构造引擎。
    pub fn new(
        options: BatcherOptions,
        scheduler: Rc<dyn Scheduler>,
        sink: impl BatchSink<Bytes> + 'static,
    ) -> Self {
        Self::with_encoder(options, ConcatEncoder, scheduler, sink)
    }
}

impl<T, E> Batcher<T, E>
where
    T: 'static,
    E: Encoder<T> + 'static,
    E::Payload: 'static,
{
    /// 使用自定义编码器构造引擎，初始状态为暂停。
    pub fn with_encoder(
        options: BatcherOptions,
        encoder: E,
        scheduler: Rc<dyn Scheduler>,
        sink: impl BatchSink<E::Payload> + 'static,
    ) -> Self {
        let guard = OverflowGuard::new(options.overflow());
        let state = State {
            options,
            queue: PendingQueue::new(),
            guard,
            flushes: FlushTracker::new(),
            emit_position: 0,
            sent_position: 0,
            paused: true,
            writable: true,
            destroyed: false,
            pass: PassState::Idle,
            timer: None,
        };
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                encoder: RefCell::new(encoder),
                sink: RefCell::new(Box::new(sink)),
                scheduler,
            }),
        }
    }

    /// 写入一条数据。
    ///
    /// # 契约说明（What）
    /// - 永远返回 `true` 且从不阻塞；
    /// - 队列深度已达上限或实例已关闭时条目被丢弃，拒绝原因在后续某一拍经 `on_error` 送达；
    /// - 运行状态下接纳条目会登记一个处理轮次（已有待执行轮次时合并）。
    pub fn write(&self, item: T) -> bool {
        let mut state = self.shared.state.borrow_mut();
        let admission = state.guard.admit(state.queue.len());
        match admission {
            Ok(()) => {
                state.queue.append(item);
                if !state.paused {
                    self.shared.request_pass(&mut state);
                }
            }
            Err(error) => {
                warn!(
                    reason = error.code(),
                    queued = state.queue.len(),
                    "batcher rejected write"
                );
                drop(state);
                self.shared.defer_error(error);
            }
        }
        true
    }

    /// 暂停发射；执行中的轮次在下一次循环检查时停下。
    pub fn pause(&self) {
        let mut state = self.shared.state.borrow_mut();
        if !state.paused {
            trace!("batcher paused");
            state.paused = true;
        }
    }

    /// 恢复发射，并以当前发射位置作为后续 flush 水位的新基准。
    pub fn resume(&self) {
        let mut state = self.shared.state.borrow_mut();
        if !state.paused {
            return;
        }
        state.paused = false;
        state.sent_position = state.emit_position;
        trace!(queued = state.queue.len(), "batcher resumed");
        if !state.queue.is_empty() {
            self.shared.request_pass(&mut state);
        }
    }

    /// 在“此刻已排队的条目全部发射之后”执行 `completion`。
    ///
    /// # 契约说明（What）
    /// - 队列为空时回调推迟到下一拍执行，从不同步执行；
    /// - 否则登记水位 `sent_position + 队列深度`，并要求调度器即使不足 `batch_size` 也持续切批；
    /// - 多次调用按调用顺序兑现；暂停期间登记的请求在恢复后兑现；
    /// - `destroy()` 之后登记的非空请求不会兑现，回调直接释放。
    ///
    /// # 风险 (Trade-offs)
    /// - 回调若持有本实例的句柄，会在兑现之前形成引用环：实例一直保持暂停、请求永不兑现时，
    ///   最后一个外部句柄释放也不会回收实例，定时器同样不会被撤销；
    /// - 此类回调应保证实例最终恢复运行，或在放弃实例前调用 [`Batcher::destroy`]，后者会释放全部待兑现回调。
    pub fn flush(&self, completion: impl FnOnce() + 'static) {
        let mut state = self.shared.state.borrow_mut();
        if state.queue.is_empty() {
            drop(state);
            self.shared.scheduler.defer(Box::new(completion));
            return;
        }
        if state.destroyed {
            trace!("flush after destroy dropped");
            return;
        }
        let watermark = state.sent_position + state.queue.len() as u64;
        trace!(watermark, "flush requested");
        state.flushes.push(watermark, Box::new(completion));
        self.shared.request_pass(&mut state);
    }

    /// 运行期调整切批阈值；队列已满足新阈值时立即登记轮次。
    pub fn set_batch_size(&self, batch_size: usize) {
        let mut state = self.shared.state.borrow_mut();
        state.options.set_batch_size(batch_size);
        debug!(batch_size = state.options.batch_size(), "batch size updated");
        if state.queue.len() >= state.options.batch_size() {
            self.shared.request_pass(&mut state);
        }
    }

    /// 永久关闭写入；已排队条目、定时器与运行状态不受影响，继续正常排空。
    pub fn end(&self) {
        let mut state = self.shared.state.borrow_mut();
        state.writable = false;
        state.guard.close();
    }

    /// 关闭写入、撤销定时器，并停止产生任何后续事件。幂等且不可逆。
    pub fn destroy(&self) {
        let mut state = self.shared.state.borrow_mut();
        if state.destroyed {
            return;
        }
        state.writable = false;
        state.guard.close();
        if let Some(timer) = state.timer.take() {
            self.shared.scheduler.cancel(timer);
        }
        state.destroyed = true;
        let released = state.flushes.clear();
        info!(
            queued = state.queue.len(),
            released_flushes = released,
            "batcher destroyed"
        );
    }

    /// 可写标记：构造时为真，仅由 `end`/`destroy` 清除。
    ///
    /// 以关闭哨兵构造的实例同样报告可写，但每次写入仍以 `Closed` 被拒。
    pub fn is_writable(&self) -> bool {
        self.shared.state.borrow().writable
    }

    /// 是否仍可能产生事件。
    pub fn is_readable(&self) -> bool {
        !self.shared.state.borrow().destroyed
    }

    pub fn is_paused(&self) -> bool {
        self.shared.state.borrow().paused
    }

    /// 当前状态快照。
    pub fn stats(&self) -> BatcherStats {
        let state = self.shared.state.borrow();
        BatcherStats {
            queued: state.queue.len(),
            emit_position: state.emit_position,
            sent_position: state.sent_position,
            pending_flushes: state.flushes.pending(),
            batch_size: state.options.batch_size(),
            max_batch_size: state.options.max_batch_size(),
            paused: state.paused,
            destroyed: state.destroyed,
            pass: state.pass,
            timer_armed: state.timer.is_some(),
        }
    }
}

impl<T, E> Shared<T, E>
where
    T: 'static,
    E: Encoder<T> + 'static,
    E::Payload: 'static,
{
    /// 登记一个处理轮次；已有待执行轮次时直接合并。
    fn request_pass(self: &Rc<Self>, state: &mut State<T>) {
        if state.pass == PassState::Scheduled {
            return;
        }
        state.pass = PassState::Scheduled;
        trace!("pass scheduled");
        let weak = Rc::downgrade(self);
        self.scheduler.defer(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.run_scheduled_pass();
            }
        }));
    }

    fn run_scheduled_pass(self: &Rc<Self>) {
        self.state.borrow_mut().pass = PassState::Running;
        self.process();
        let mut state = self.state.borrow_mut();
        if state.pass == PassState::Running {
            state.pass = PassState::Idle;
        }
    }

    fn on_timeout(self: &Rc<Self>) {
        let inline = {
            let mut state = self.state.borrow_mut();
            state.timer = None;
            if state.destroyed || state.queue.is_empty() {
                return;
            }
            trace!(queued = state.queue.len(), "batch timer elapsed");
            state.flushes.request_drain();
            // 已有登记轮次时保持 Scheduled，避免同一时刻出现两个待执行轮次。
            if state.pass == PassState::Idle {
                state.pass = PassState::Running;
                true
            } else {
                false
            }
        };
        self.process();
        if inline {
            let mut state = self.state.borrow_mut();
            if state.pass == PassState::Running {
                state.pass = PassState::Idle;
            }
        }
    }

    /// 一个处理轮次：循环切批发射，随后按需布防定时器并兑现 flush 水位。
    fn process(self: &Rc<Self>) {
        loop {
            let batch = {
                let mut state = self.state.borrow_mut();
                if !state.should_cut() {
                    break;
                }
                let max = state.options.max_batch_size();
                let batch = state.queue.remove_front(max);
                let batch_len = batch.len() as u64;
                state.emit_position += batch_len;
                state.sent_position = state.emit_position;
                debug!(
                    batch_len,
                    emit_position = state.emit_position,
                    queued = state.queue.len(),
                    "batch emitted"
                );
                batch
            };
            let payload = self.encoder.borrow_mut().encode(batch);
            // 编码器可能已重入并销毁实例。
            if self.state.borrow().destroyed {
                break;
            }
            self.sink.borrow_mut().on_data(payload);
        }

        let completions = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return;
            }
            if state.needs_timer() {
                self.arm_timer(&mut state);
            }
            let emit_position = state.emit_position;
            state.flushes.take_resolved(emit_position)
        };
        for completion in completions {
            completion();
        }
    }

    fn arm_timer(self: &Rc<Self>, state: &mut State<T>) {
        let delay = state.options.batch_time();
        let weak: Weak<Self> = Rc::downgrade(self);
        let timer = self.scheduler.schedule_after(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.on_timeout();
                }
            }),
        );
        trace!(timer = timer.as_u64(), delay_ms = delay.as_millis() as u64, "batch timer armed");
        state.timer = Some(timer);
    }

    fn defer_error(self: &Rc<Self>, error: BatchError) {
        let weak = Rc::downgrade(self);
        self.scheduler.defer(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                if shared.state.borrow().destroyed {
                    return;
                }
                shared.sink.borrow_mut().on_error(error);
            }
        }));
    }
}

impl<T, E> Drop for Shared<T, E>
where
    E: Encoder<T>,
{
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            self.scheduler.cancel(timer);
        }
    }
}
