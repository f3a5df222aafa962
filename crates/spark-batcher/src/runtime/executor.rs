use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use super::{Scheduler, Task, TimerId};
use crate::time::Clock;

/// 单线程事件循环：FIFO 的“下一拍”任务队列 + 按截止时间排序的定时器表。
///
/// # 设计动机（Why）
/// - 引擎要求“最多一个待执行轮次”与“错误延后送达”，需要一个调度顺序完全可预测的执行器；
/// - 时间来源经 [`Clock`] 注入：生产环境用 [`crate::time::SystemClock`] 真实等待，测试用
///   [`crate::time::MockClock`] 瞬时推进。
///
/// # 行为概览（How）
/// - `run_until_idle`：反复执行队首任务；任务队列为空时执行一个已到期的定时器，直到两者都无事可做；
/// - `advance`：按截止时间顺序逐个把时钟推进到下一个到期点并排空，最后把时钟推到目标时刻；
/// - `run_until_stalled`：排空后若仍有定时器，就在时钟上等待到最近的截止点，直到没有任何待办。
///
/// # 契约说明（What）
/// - 句柄可克隆，克隆体共享同一事件循环；
/// - 任务内部再次调用 `run_until_idle`/`advance`/`run_until_stalled` 会被忽略并返回，不会嵌套执行；
/// - 定时器键为 `(deadline, id)`，同一截止时间按登记顺序触发。
#[derive(Clone)]
pub struct LocalRuntime {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    clock: Arc<dyn Clock>,
    ticks: RefCell<VecDeque<Task>>,
    timers: RefCell<BTreeMap<(Instant, TimerId), Task>>,
    deadlines: RefCell<HashMap<TimerId, Instant>>,
    next_timer: Cell<u64>,
    draining: Cell<bool>,
}

/// 排空期间置位 `draining`，任务 panic 展开时同样复位。
struct DrainGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> DrainGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl LocalRuntime {
    /// 以给定时钟构造事件循环。
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                clock,
                ticks: RefCell::new(VecDeque::new()),
                timers: RefCell::new(BTreeMap::new()),
                deadlines: RefCell::new(HashMap::new()),
                next_timer: Cell::new(0),
                draining: Cell::new(false),
            }),
        }
    }

    /// 注入的时钟。
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    /// 时钟当前时间。
    pub fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    /// 等待执行的“下一拍”任务数。
    pub fn pending_ticks(&self) -> usize {
        self.inner.ticks.borrow().len()
    }

    /// 尚未触发的定时器数。
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// 最近一个定时器的截止时间。
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .timers
            .borrow()
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    /// 既无待执行任务也无未触发定时器。
    pub fn is_idle(&self) -> bool {
        self.pending_ticks() == 0 && self.pending_timers() == 0
    }

    /// 执行所有就绪任务与已到期定时器，返回执行的任务数。
    ///
    /// 任务执行期间新提交的“下一拍”任务同样会在本次调用内执行。
    pub fn run_until_idle(&self) -> usize {
        let Some(_guard) = DrainGuard::enter(&self.inner.draining) else {
            return 0;
        };
        self.drain()
    }

    /// 推进时间 `delta`，期间按截止时间顺序触发定时器。
    ///
    /// # 契约说明（What）
    /// - 截止时间恰好等于目标时刻的定时器会被触发；
    /// - 每触发一个定时器都会先排空它产生的“下一拍”任务，再处理下一个定时器；
    /// - 搭配 [`crate::time::SystemClock`] 时该方法会真实阻塞 `delta`。
    pub fn advance(&self, delta: Duration) {
        let Some(_guard) = DrainGuard::enter(&self.inner.draining) else {
            return;
        };
        let target = self.now() + delta;
        self.drain();
        while let Some(deadline) = self.next_deadline() {
            if deadline > target {
                break;
            }
            self.park_until(deadline);
            self.drain();
        }
        self.park_until(target);
        self.drain();
    }

    /// 持续执行直到没有任何待办任务与定时器，期间在时钟上等待最近的截止时间。
    pub fn run_until_stalled(&self) {
        let Some(_guard) = DrainGuard::enter(&self.inner.draining) else {
            return;
        };
        loop {
            self.drain();
            match self.next_deadline() {
                Some(deadline) => self.park_until(deadline),
                None => break,
            }
        }
    }

    fn park_until(&self, deadline: Instant) {
        let wait = deadline.saturating_duration_since(self.now());
        if !wait.is_zero() {
            self.inner.clock.park(wait);
        }
    }

    fn drain(&self) -> usize {
        let mut executed = 0;
        loop {
            // 借用在执行任务前释放，任务内部可以继续提交新任务。
            let next = self.inner.ticks.borrow_mut().pop_front();
            let task = match next {
                Some(task) => task,
                None => match self.pop_due_timer() {
                    Some(task) => task,
                    None => break,
                },
            };
            task();
            executed += 1;
        }
        executed
    }

    fn pop_due_timer(&self) -> Option<Task> {
        let now = self.now();
        let mut timers = self.inner.timers.borrow_mut();
        let key = *timers.keys().next()?;
        if key.0 > now {
            return None;
        }
        self.inner.deadlines.borrow_mut().remove(&key.1);
        trace!(timer = key.1.as_u64(), "timer fired");
        timers.remove(&key)
    }
}

impl Scheduler for LocalRuntime {
    fn defer(&self, task: Task) {
        self.inner.ticks.borrow_mut().push_back(task);
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> TimerId {
        let raw = self.inner.next_timer.get();
        self.inner.next_timer.set(raw + 1);
        let id = TimerId::new(raw);
        let deadline = self.now() + delay;
        self.inner.deadlines.borrow_mut().insert(id, deadline);
        self.inner.timers.borrow_mut().insert((deadline, id), task);
        id
    }

    fn cancel(&self, timer: TimerId) -> bool {
        let deadline = self.inner.deadlines.borrow_mut().remove(&timer);
        match deadline {
            Some(deadline) => self
                .inner
                .timers
                .borrow_mut()
                .remove(&(deadline, timer))
                .is_some(),
            None => false,
        }
    }
}
