#![deny(unsafe_code)]

//! `spark-batcher`：夹在逐条写入的生产者与偏好成批接收的下游之间的批处理控制引擎。
//!
//! # 模块定位（Why）
//! - 按数量阈值（`batch_size`）或时间阈值（`batch_time`）切出批次，经调用方提供的编码器交给下游；
//! - 同时提供暂停/恢复流控、积压上限背压、flush 排空通知以及运行期调整阈值。
//!
//! # 结构概览（What）
//! - [`batcher`]：引擎状态机本体 [`Batcher`]；
//! - [`queue`]、[`guard`]、[`flush`]：待发射队列、准入守卫与 flush 水位三个内部部件；
//! - [`encoder`]、[`sink`]：编码与下游事件两处外部协作契约；
//! - [`runtime`]、[`time`]：单线程调度器与可注入时钟，测试中以虚拟时间驱动；
//! - [`config`]、[`error`]、[`observability`]：配置、错误与日志安装等周边能力。
//!
//! # 使用指引（How）
//! ```
//! use std::rc::Rc;
//! use std::sync::Arc;
//!
//! use spark_batcher::test_stubs::RecordingSink;
//! use spark_batcher::time::MockClock;
//! use spark_batcher::{Batcher, BatcherConfig, LocalRuntime};
//!
//! let runtime = LocalRuntime::new(Arc::new(MockClock::new()));
//! let sink = RecordingSink::new();
//! let options = BatcherConfig::default().with_batch_size(2).resolve().unwrap();
//! let batcher = Batcher::new(options, Rc::new(runtime.clone()), sink.clone());
//!
//! batcher.resume();
//! batcher.write("ab");
//! batcher.write("cd");
//! runtime.run_until_idle();
//! assert_eq!(sink.payloads(), vec![bytes::Bytes::from_static(b"abcd")]);
//! ```

pub mod batcher;
pub mod config;
pub mod encoder;
pub mod error;
pub mod flush;
pub mod guard;
pub mod observability;
pub mod queue;
pub mod runtime;
pub mod sink;
/// 测试桩命名空间，集中暴露记录型 Sink，供集成测试与示例复用。
pub mod test_stubs;
pub mod time;

pub use batcher::{Batcher, BatcherStats, PassState};
pub use config::{BatcherConfig, BatcherOptions};
pub use encoder::{ConcatEncoder, Encoder, IdentityEncoder};
pub use error::{BatchError, ConfigError, ObservabilityError};
pub use guard::OverflowLimit;
pub use runtime::{LocalRuntime, Scheduler, Task, TimerId};
pub use sink::{BatchEvent, BatchSink};
