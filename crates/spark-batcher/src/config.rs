//! 批处理配置：可反序列化的原始选项 [`BatcherConfig`] 与校验后的 [`BatcherOptions`]。
//!
//! # 模块定位（Why）
//! - 原始选项面向人类书写（TOML 文件、命令行拼装），允许缺省与哨兵值，`0` 一律视为“未设置”；
//! - 引擎只接受校验后的强类型选项，切批循环因此无需再处理 0 上限、负数上限等非法输入。
//!
//! # 使用指引（How）
//! ```
//! use spark_batcher::BatcherConfig;
//!
//! let options = BatcherConfig::default()
//!     .with_batch_size(3)
//!     .with_batch_time_ms(1_000)
//!     .resolve()
//!     .expect("合法配置");
//! assert_eq!(options.max_batch_size(), 3);
//! ```

use core::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::guard::OverflowLimit;

/// 达到该数量即触发一次发射。
pub const DEFAULT_BATCH_SIZE: usize = 200;
/// 超时触发器的默认延迟（毫秒）。
pub const DEFAULT_BATCH_TIME_MS: u64 = 60_000;
/// 默认的积压上限。
pub const DEFAULT_BATCH_OVERFLOW: i64 = 100_000;
/// `batch_overflow` 的关闭哨兵：任何写入都以 `Closed` 拒绝。
pub const CLOSED_OVERFLOW_SENTINEL: i64 = -1;

/// 原始批处理选项，字段与 TOML 键一一对应。
///
/// # 教案式说明
/// - **意图 (Why)**：同时充当反序列化目标与链式构造器，调用方无论从文件加载还是在代码中拼装都走同一条校验路径；
/// - **契约 (What)**：
///   - `batch_size`：达到该队列深度即切批，`0` 回退为默认值 200；
///   - `max_batch_size`：单批最多条目数，缺省或 `0` 时等于 `batch_size`；
///   - `batch_time_ms`：超时触发延迟，`0` 回退为 60000；
///   - `batch_overflow`：积压上限，`0` 回退为 100000，`-1` 表示永久关闭；
/// - **风险 (Trade-offs)**：未知键直接报错，拼写错误不会被静默忽略。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatcherConfig {
    pub batch_size: usize,
    pub max_batch_size: Option<usize>,
    pub batch_time_ms: u64,
    pub batch_overflow: i64,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_batch_size: None,
            batch_time_ms: DEFAULT_BATCH_TIME_MS,
            batch_overflow: DEFAULT_BATCH_OVERFLOW,
        }
    }
}

impl BatcherConfig {
    /// 从 TOML 文本解析配置，缺省键取默认值。
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    pub fn with_batch_time_ms(mut self, batch_time_ms: u64) -> Self {
        self.batch_time_ms = batch_time_ms;
        self
    }

    pub fn with_batch_overflow(mut self, batch_overflow: i64) -> Self {
        self.batch_overflow = batch_overflow;
        self
    }

    /// 校验并解析为引擎使用的强类型选项。
    ///
    /// # 契约说明（What）
    /// - 取值为 `0` 的选项视为未设置：`batch_size` 回退为 [`DEFAULT_BATCH_SIZE`]，
    ///   `max_batch_size` 回退为解析后的 `batch_size`，`batch_time_ms` 回退为 [`DEFAULT_BATCH_TIME_MS`]，
    ///   `batch_overflow` 回退为 [`DEFAULT_BATCH_OVERFLOW`]；
    /// - `batch_overflow` 为 `-1` 时解析为 [`OverflowLimit::Closed`]，其余负数返回
    ///   [`ConfigError::InvalidOverflow`]。
    pub fn resolve(&self) -> Result<BatcherOptions, ConfigError> {
        let batch_size = match self.batch_size {
            0 => DEFAULT_BATCH_SIZE,
            size => size,
        };
        let max_batch_size = match self.max_batch_size {
            None | Some(0) => batch_size,
            Some(max) => max,
        };
        let batch_time_ms = match self.batch_time_ms {
            0 => DEFAULT_BATCH_TIME_MS,
            millis => millis,
        };
        let overflow = match self.batch_overflow {
            CLOSED_OVERFLOW_SENTINEL => OverflowLimit::Closed,
            0 => OverflowLimit::Bounded(DEFAULT_BATCH_OVERFLOW as usize),
            value if value < 0 => return Err(ConfigError::InvalidOverflow { value }),
            value => OverflowLimit::Bounded(usize::try_from(value).unwrap_or(usize::MAX)),
        };

        Ok(BatcherOptions {
            batch_size,
            max_batch_size,
            batch_time: Duration::from_millis(batch_time_ms),
            overflow,
        })
    }
}

/// 校验后的批处理选项。
///
/// 除 `batch_size` 可经 [`crate::Batcher::set_batch_size`] 在运行期调整外，其余字段在引擎生命周期内固定。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatcherOptions {
    batch_size: usize,
    max_batch_size: usize,
    batch_time: Duration,
    overflow: OverflowLimit,
}

impl Default for BatcherOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_batch_size: DEFAULT_BATCH_SIZE,
            batch_time: Duration::from_millis(DEFAULT_BATCH_TIME_MS),
            overflow: OverflowLimit::Bounded(DEFAULT_BATCH_OVERFLOW as usize),
        }
    }
}

impl BatcherOptions {
    /// 触发切批的最小队列深度。
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 单批最多条目数。
    pub const fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// 超时触发器延迟，亦用于每次重新布防。
    pub const fn batch_time(&self) -> Duration {
        self.batch_time
    }

    /// 构造时的准入上限。
    pub const fn overflow(&self) -> OverflowLimit {
        self.overflow
    }

    /// 运行期调整切批阈值；`0` 收敛为 `1`，即每条写入都可触发发射。
    pub(crate) fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_documented_values() {
        let options = BatcherConfig::default().resolve().expect("默认配置必然合法");
        assert_eq!(options, BatcherOptions::default());
        assert_eq!(options.batch_size(), 200);
        assert_eq!(options.max_batch_size(), 200);
        assert_eq!(options.batch_time(), Duration::from_secs(60));
        assert_eq!(options.overflow(), OverflowLimit::Bounded(100_000));
    }

    #[test]
    fn max_batch_size_tracks_batch_size_when_absent() {
        let options = BatcherConfig::default()
            .with_batch_size(3)
            .resolve()
            .expect("合法配置");
        assert_eq!(options.max_batch_size(), 3);

        let options = BatcherConfig::default()
            .with_batch_size(3)
            .with_max_batch_size(4)
            .resolve()
            .expect("合法配置");
        assert_eq!(options.max_batch_size(), 4);
    }

    #[test]
    fn zero_batch_size_falls_back_to_default() {
        let options = BatcherConfig::default()
            .with_batch_size(0)
            .resolve()
            .expect("合法配置");
        assert_eq!(options.batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn zero_options_fall_back_to_defaults() {
        let options = BatcherConfig::default()
            .with_batch_size(3)
            .with_max_batch_size(0)
            .with_batch_time_ms(0)
            .with_batch_overflow(0)
            .resolve()
            .expect("0 视为未设置，必须可解析");
        assert_eq!(options.batch_size(), 3);
        assert_eq!(options.max_batch_size(), 3, "max_batch_size = 0 回退为 batch_size");
        assert_eq!(options.batch_time(), Duration::from_millis(DEFAULT_BATCH_TIME_MS));
        assert_eq!(
            options.overflow(),
            OverflowLimit::Bounded(DEFAULT_BATCH_OVERFLOW as usize)
        );
    }

    #[test]
    fn negative_overflow_other_than_sentinel_is_rejected() {
        assert!(matches!(
            BatcherConfig::default().with_batch_overflow(-7).resolve(),
            Err(ConfigError::InvalidOverflow { value: -7 })
        ));
    }

    #[test]
    fn closed_sentinel_resolves_to_closed_limit() {
        let options = BatcherConfig::default()
            .with_batch_overflow(CLOSED_OVERFLOW_SENTINEL)
            .resolve()
            .expect("哨兵值合法");
        assert_eq!(options.overflow(), OverflowLimit::Closed);
    }

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let config = BatcherConfig::from_toml_str("batch_size = 3\nbatch_time_ms = 1000\n")
            .expect("解析 TOML");
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.batch_time_ms, 1_000);
        assert_eq!(config.max_batch_size, None);
        assert_eq!(config.batch_overflow, DEFAULT_BATCH_OVERFLOW);
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let err = BatcherConfig::from_toml_str("batch_sise = 3").expect_err("拼写错误必须报错");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn runtime_batch_size_is_clamped() {
        let mut options = BatcherOptions::default();
        options.set_batch_size(0);
        assert_eq!(options.batch_size(), 1);
        assert_eq!(options.max_batch_size(), DEFAULT_BATCH_SIZE);
    }
}
