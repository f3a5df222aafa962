//! 集成测试共享夹具：虚拟时钟驱动的运行时、记录型 Sink 与事件顺序日志。
//!
//! 默认配置与原始验收用例保持一致：`batch_size = 3`、`batch_time_ms = 1000`、`batch_overflow = 10`。

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use spark_batcher::test_stubs::RecordingSink;
use spark_batcher::time::MockClock;
use spark_batcher::{BatchEvent, Batcher, BatcherConfig, IdentityEncoder, LocalRuntime};

pub type Journal = Rc<RefCell<Vec<String>>>;

/// 基础夹具：编码器原样返回批次。
pub struct Harness {
    pub runtime: LocalRuntime,
    pub clock: MockClock,
    pub sink: RecordingSink<Vec<u32>>,
    pub batcher: Batcher<u32, IdentityEncoder>,
}

impl Harness {
    /// 排空所有已就绪的拍。
    pub fn settle(&self) {
        self.runtime.run_until_idle();
    }

    pub fn advance_ms(&self, millis: u64) {
        self.runtime.advance(Duration::from_millis(millis));
    }

    pub fn write_all(&self, items: impl IntoIterator<Item = u32>) {
        for item in items {
            assert!(self.batcher.write(item), "write 必须恒返回 true");
        }
    }
}

pub fn default_config() -> BatcherConfig {
    BatcherConfig::default()
        .with_batch_size(3)
        .with_batch_time_ms(1_000)
        .with_batch_overflow(10)
}

pub fn harness() -> Harness {
    harness_with(default_config())
}

pub fn harness_with(config: BatcherConfig) -> Harness {
    let clock = MockClock::new();
    let runtime = LocalRuntime::new(Arc::new(clock.clone()));
    let sink = RecordingSink::new();
    let options = config.resolve().expect("测试配置必须合法");
    let batcher = Batcher::with_encoder(
        options,
        IdentityEncoder,
        Rc::new(runtime.clone()),
        sink.clone(),
    );
    Harness {
        runtime,
        clock,
        sink,
        batcher,
    }
}

/// 记录调用顺序的夹具：编码、发射与 flush 回调都写入同一份日志。
pub struct JournaledHarness {
    pub runtime: LocalRuntime,
    pub journal: Journal,
    pub encoded: Rc<RefCell<Vec<Vec<u32>>>>,
    pub batcher: Batcher<u32, Box<dyn FnMut(Vec<u32>) -> Vec<u32>>>,
}

impl JournaledHarness {
    pub fn settle(&self) {
        self.runtime.run_until_idle();
    }

    pub fn entries(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    /// 生成一个 flush 回调，执行时写入 `flush:<label>`。
    pub fn completion(&self, label: &'static str) -> impl FnOnce() + 'static {
        let journal = Rc::clone(&self.journal);
        move || journal.borrow_mut().push(format!("flush:{label}"))
    }
}

pub fn journaled() -> JournaledHarness {
    let runtime = LocalRuntime::new(Arc::new(MockClock::new()));
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let encoded = Rc::new(RefCell::new(Vec::new()));

    let encoder_journal = Rc::clone(&journal);
    let encoder_calls = Rc::clone(&encoded);
    let encoder: Box<dyn FnMut(Vec<u32>) -> Vec<u32>> = Box::new(move |batch: Vec<u32>| {
        encoder_journal
            .borrow_mut()
            .push(format!("encode:{batch:?}"));
        encoder_calls.borrow_mut().push(batch.clone());
        batch
    });

    let sink_journal = Rc::clone(&journal);
    let sink = move |event: BatchEvent<Vec<u32>>| match event {
        BatchEvent::Data(batch) => sink_journal.borrow_mut().push(format!("data:{batch:?}")),
        BatchEvent::Error(err) => sink_journal
            .borrow_mut()
            .push(format!("error:{}", err.code())),
    };

    let options = default_config().resolve().expect("测试配置必须合法");
    let batcher = Batcher::with_encoder(options, encoder, Rc::new(runtime.clone()), sink);
    JournaledHarness {
        runtime,
        journal,
        encoded,
        batcher,
    }
}
