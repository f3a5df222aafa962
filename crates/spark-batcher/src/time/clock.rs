use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// 抽象可注入的时钟，实现“读取当前时间”与“阻塞等待一段时间”两个能力。
///
/// # 设计背景（Why）
/// - 单线程运行时在无任务可执行、但仍有定时器未到期时需要让出时间；生产环境真实睡眠，测试中直接推进虚拟时间；
/// - 通过 trait 注入时钟，可在不修改引擎代码的前提下切换两种时间语义。
///
/// # 接口约束（What）
/// - `now`：返回单调时间点，实现者必须保证不回退；
/// - `park`：返回时 `now()` 至少前进了 `duration`。
pub trait Clock: Send + Sync + 'static {
    /// 返回当前的单调时间点。
    fn now(&self) -> Instant;

    /// 等待指定时长；虚拟时钟以推进偏移量代替真实等待。
    fn park(&self, duration: Duration);
}

/// 基于标准库的系统时钟。
///
/// `park` 直接调用 [`thread::sleep`]，适合驱动单线程运行时在定时器之间空转。
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn park(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// 虚拟时钟：通过手动推进时间在测试中复现确定性的触发序列。
///
/// # 行为概览（How）
/// - 内部记录构造时的基准 [`Instant`] 与累积偏移 `elapsed`；
/// - [`MockClock::advance`] 与 [`Clock::park`] 都只增加偏移量，不会阻塞线程；
/// - 克隆得到的句柄共享同一份状态，测试可一边持有句柄推进时间，一边把它注入运行时。
///
/// # 契约说明（What）
/// - 偏移量单调增加；
/// - 本类型不主动唤醒任何任务，到期定时器由运行时在下一次排空时执行。
#[derive(Clone, Debug)]
pub struct MockClock {
    inner: Arc<Mutex<MockClockState>>,
}

#[derive(Debug)]
struct MockClockState {
    origin: Instant,
    elapsed: Duration,
}

impl MockClock {
    /// 创建以当前系统时间为基准的虚拟时钟。
    pub fn new() -> Self {
        Self::with_start(Instant::now())
    }

    /// 以指定基准构造虚拟时钟，便于在测试中固定初始时间点。
    pub fn with_start(origin: Instant) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockClockState {
                origin,
                elapsed: Duration::ZERO,
            })),
        }
    }

    /// 手动推进虚拟时间。
    pub fn advance(&self, delta: Duration) {
        let mut state = self.inner.lock();
        state.elapsed = state.elapsed.saturating_add(delta);
    }

    /// 返回自基准以来累积的虚拟时间。
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().elapsed
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let state = self.inner.lock();
        state.origin + state.elapsed
    }

    fn park(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_only_moves_when_advanced() {
        let origin = Instant::now();
        let clock = MockClock::with_start(origin);
        assert_eq!(clock.now(), origin);

        clock.advance(Duration::from_millis(250));
        clock.park(Duration::from_millis(750));
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
        assert_eq!(clock.now(), origin + Duration::from_secs(1));
    }

    #[test]
    fn clones_share_virtual_time() {
        let clock = MockClock::new();
        let shared = clock.clone();
        shared.advance(Duration::from_millis(5));
        assert_eq!(clock.elapsed(), Duration::from_millis(5));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let before = clock.now();
        clock.park(Duration::from_millis(1));
        assert!(clock.now() >= before + Duration::from_millis(1));
    }
}
