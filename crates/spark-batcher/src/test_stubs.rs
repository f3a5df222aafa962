//! 测试桩：集中维护记录型 Sink，供单元测试、集成测试与示例复用。

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::BatchError;
use crate::sink::{BatchEvent, BatchSink};

/// 记录所有事件的 Sink。
///
/// # 使用方式（How）
/// - 克隆一份交给引擎，另一份留在测试中读取；两者共享同一事件日志；
/// - 事件按送达顺序保存，可直接断言 `data` 与 `error` 的交错顺序。
#[derive(Debug)]
pub struct RecordingSink<P> {
    events: Rc<RefCell<Vec<BatchEvent<P>>>>,
}

impl<P> Clone for RecordingSink<P> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<P> Default for RecordingSink<P> {
    fn default() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<P> RecordingSink<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录事件数。
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// 取走全部事件并清空日志。
    pub fn take(&self) -> Vec<BatchEvent<P>> {
        self.events.take()
    }

    /// 已记录的错误，按送达顺序。
    pub fn errors(&self) -> Vec<BatchError> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                BatchEvent::Error(error) => Some(*error),
                BatchEvent::Data(_) => None,
            })
            .collect()
    }
}

impl<P: Clone> RecordingSink<P> {
    /// 全部事件的快照。
    pub fn events(&self) -> Vec<BatchEvent<P>> {
        self.events.borrow().clone()
    }

    /// 已记录的负载，按送达顺序。
    pub fn payloads(&self) -> Vec<P> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                BatchEvent::Data(payload) => Some(payload.clone()),
                BatchEvent::Error(_) => None,
            })
            .collect()
    }
}

impl<P> BatchSink<P> for RecordingSink<P> {
    fn on_data(&mut self, payload: P) {
        self.events.borrow_mut().push(BatchEvent::Data(payload));
    }

    fn on_error(&mut self, error: BatchError) {
        self.events.borrow_mut().push(BatchEvent::Error(error));
    }
}
