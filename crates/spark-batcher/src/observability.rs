//! 日志订阅器安装入口。
//!
//! # 模块定位（Why）
//! - 引擎内部只通过 `tracing` 宏产生结构化事件，是否输出、输出到哪里由宿主进程决定；
//! - 命令行工具与示例需要“一行安装”的默认输出，本模块提供 `fmt + EnvFilter` 组合。
//!
//! # 契约说明（What）
//! - `RUST_LOG` 存在时优先生效，否则使用调用方给出的默认指令；
//! - 进程内已存在全局 Subscriber 时返回 [`ObservabilityError::SubscriberAlreadySet`]，绝不覆盖。

use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

use crate::error::ObservabilityError;

/// 安装 `fmt` 输出层与环境变量过滤器作为全局 Subscriber。
pub fn install_fmt_subscriber(default_directive: &str) -> Result<(), ObservabilityError> {
    if dispatcher::has_been_set() {
        return Err(ObservabilityError::SubscriberAlreadySet);
    }
    let filter = build_env_filter(default_directive)?;
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_env_filter(default_directive: &str) -> Result<EnvFilter, ObservabilityError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directive).map_err(|err| ObservabilityError::InvalidDirective {
        directive: default_directive.to_owned(),
        detail: err.to_string(),
    })
}
