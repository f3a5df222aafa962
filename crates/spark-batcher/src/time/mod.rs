//! 时间抽象模块，提供可注入的时钟接口，使超时触发器在测试中完全确定。
//!
//! # 模块定位（Why）
//! - 批处理引擎的时间阈值依赖真实时间源；直接读取系统时钟会让“恰好 1000ms 触发、999ms 不触发”之类的断言无法复现；
//! - [`Clock`] 统一 `now` 与 `park` 两个原语，[`crate::runtime::LocalRuntime`] 只依赖该 trait 决定定时器何时到期。
//!
//! # 结构概览（What）
//! - [`clock::Clock`]：核心时钟 trait；
//! - [`clock::SystemClock`]：基于 `std::time::Instant` 与线程睡眠的生产实现；
//! - [`clock::MockClock`]：虚拟时钟，`advance`/`park` 只推进偏移量，不产生真实等待。

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
