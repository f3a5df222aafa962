//! 待发射条目的 FIFO 缓冲。

use std::collections::VecDeque;

/// 有序、计数精确的待发射队列。
///
/// # 契约说明（What）
/// - `append` 摊还 O(1) 追加到队尾；
/// - `remove_front(max)` 按写入顺序取出至多 `max` 条，不足时取出全部；
/// - `len` 是引擎所有数量比较的唯一依据。
#[derive(Debug)]
pub struct PendingQueue<T> {
    items: VecDeque<T>,
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// 从队首批量取出至多 `max_count` 条。
    pub fn remove_front(&mut self, max_count: usize) -> Vec<T> {
        let count = max_count.min(self.items.len());
        self.items.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
