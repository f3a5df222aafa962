//! `batch_lines`：从标准输入逐行读取，按批输出到标准输出。
//!
//! # 使用方式（How）
//! - `batch_lines [config.toml] < input.txt`；
//! - 配置文件键与 [`BatcherConfig`] 字段一致，缺省时使用默认值；
//! - 每个批次输出为一行，批内条目以 `\t` 分隔；日志写到标准错误，`RUST_LOG` 可调整级别。
//!
//! 标准输入读取是阻塞的，因此超时触发器只在两次读取之间得到执行机会；
//! 输入结束后通过 flush 排空剩余条目，再以 `destroy` 撤销定时器让事件循环退出。

use std::fs;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context;
use spark_batcher::observability::install_fmt_subscriber;
use spark_batcher::time::SystemClock;
use spark_batcher::{BatchEvent, Batcher, BatcherConfig, LocalRuntime};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    install_fmt_subscriber("info")?;

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file `{path}`"))?;
            BatcherConfig::from_toml_str(&source)?
        }
        None => BatcherConfig::default(),
    };
    let options = config.resolve()?;
    info!(?options, "batch_lines starting");

    let runtime = LocalRuntime::new(Arc::new(SystemClock));
    let sink = |event: BatchEvent<String>| match event {
        BatchEvent::Data(payload) => {
            let mut out = io::stdout().lock();
            if let Err(err) = writeln!(out, "{payload}") {
                error!(%err, "failed to write batch to stdout");
            }
        }
        BatchEvent::Error(err) => error!(code = err.code(), %err, "line rejected"),
    };
    let batcher = Batcher::with_encoder(
        options,
        |lines: Vec<String>| lines.join("\t"),
        Rc::new(runtime.clone()),
        sink,
    );
    batcher.resume();

    for line in io::stdin().lock().lines() {
        batcher.write(line.context("failed to read stdin")?);
        runtime.run_until_idle();
    }

    batcher.end();
    let handle = batcher.clone();
    batcher.flush(move || handle.destroy());
    runtime.run_until_stalled();

    let stats = batcher.stats();
    info!(emitted = stats.emit_position, "batch_lines finished");
    Ok(())
}
