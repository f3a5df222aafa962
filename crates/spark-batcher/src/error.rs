//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义批处理引擎对外暴露的错误语义：运行期的写入拒绝与构造期的配置校验失败；
//! - 写入拒绝永远通过 `error` 事件异步投递，因此 [`BatchError`] 需要可克隆、可比较，便于 Sink 存档与断言。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，与 `std::error::Error` 生态兼容；
//! - [`BatchError::code`] 提供稳定的点分错误码，日志与告警维度以此为准。

use thiserror::Error;

/// 写入被拒绝的原因，经由 Sink 的 `on_error` 异步送达。
///
/// # 教案式说明
/// - **意图 (Why)**：生产者需要区分“暂时积压”与“永久关闭”两类拒绝，分别决定退避或停止写入；
/// - **契约 (What)**：
///   - 被拒绝的条目不会进入队列，引擎也不会重试；
///   - 两个变体均可在生产者侧恢复：停止写入、外部缓冲或直接忽略都不影响引擎状态；
/// - **风险 (Trade-offs)**：错误不回传被拒条目本身，调用方若需保留数据应在写入前自行持有副本。
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// 队列深度已达到 `batch_overflow` 上限。
    #[error("too many undelivered items (limit {limit})")]
    Overflow { limit: usize },

    /// `end()`/`destroy()` 之后，或以关闭哨兵值构造后仍尝试写入。
    #[error("write to a closed batching stream")]
    Closed,
}

impl BatchError {
    /// 稳定错误码，格式为 `batcher.<kind>`。
    pub const fn code(&self) -> &'static str {
        match self {
            BatchError::Overflow { .. } => "batcher.overflow",
            BatchError::Closed => "batcher.closed",
        }
    }

    /// 是否为永久性的关闭拒绝。
    pub const fn is_closed(&self) -> bool {
        matches!(self, BatchError::Closed)
    }
}

/// 配置解析与校验失败。
///
/// # 教案式说明
/// - **意图 (Why)**：无法解释的配置（如 `batch_overflow = -7`）必须在构造前拦截，而不是在运行期表现为莫名的拒绝；
/// - **契约 (What)**：由 [`crate::BatcherConfig::resolve`] 与 [`crate::BatcherConfig::from_toml_str`] 返回，
///   解析失败时保留 `toml` 的原始诊断信息。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `batch_overflow` 只接受非负数或关闭哨兵 `-1`。
    #[error("batch_overflow must be non-negative or -1, got {value}")]
    InvalidOverflow { value: i64 },

    /// TOML 文本无法解析为批处理配置。
    #[error("failed to parse batcher configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 全局日志订阅器安装失败。
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// 进程内已存在全局 `tracing` Subscriber，拒绝覆盖。
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,

    /// 默认过滤指令无法解析。
    #[error("invalid log filter directive `{directive}`: {detail}")]
    InvalidDirective { directive: String, detail: String },

    /// 注册全局 Subscriber 的底层错误。
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
