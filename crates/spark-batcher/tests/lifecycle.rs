//! 准入与生命周期：积压上限、end 关闭写入、destroy 静默一切后续事件。

mod support;

use spark_batcher::BatchError;
use support::{default_config, harness, harness_with};

#[test]
fn overflow_rejects_exactly_one_write_asynchronously() {
    let h = harness();
    h.write_all(1..=10);
    h.settle();
    assert!(h.sink.errors().is_empty(), "上限以内的写入必须全部接纳");

    assert!(h.batcher.write(11), "被拒绝的写入同样返回 true");
    assert!(h.sink.is_empty(), "拒绝原因不得在 write 调用栈内同步送达");
    h.settle();

    assert_eq!(h.sink.errors(), vec![BatchError::Overflow { limit: 10 }]);
    assert_eq!(h.batcher.stats().queued, 10, "被拒绝的条目不得入队");
}

#[test]
fn rejected_item_never_appears_in_a_batch() {
    let h = harness_with(default_config().with_batch_size(20));
    h.write_all(1..=11);
    h.batcher.resume();
    h.batcher.flush(|| {});
    h.settle();

    let batches = h.sink.payloads();
    let emitted: Vec<u32> = batches.into_iter().flatten().collect();
    assert_eq!(emitted, (1..=10).collect::<Vec<_>>());
    assert_eq!(h.sink.errors().len(), 1);
}

#[test]
fn end_causes_future_writes_to_fail() {
    let h = harness();
    h.batcher.resume();
    h.write_all([1]);
    h.settle();
    assert!(h.sink.errors().is_empty());
    assert!(h.batcher.is_writable());

    h.batcher.end();
    assert!(!h.batcher.is_writable());
    assert!(h.batcher.is_readable(), "end 不影响已排队条目的发射");
    h.write_all([2]);
    h.settle();
    assert_eq!(h.sink.errors(), vec![BatchError::Closed]);

    h.advance_ms(1_000);
    assert_eq!(h.sink.payloads(), vec![vec![1]], "end 之前的条目照常由定时器排空");
}

#[test]
fn destroy_stops_future_events() {
    let h = harness();
    h.batcher.resume();
    h.write_all([1]);
    h.batcher.end();
    h.batcher.destroy();
    h.advance_ms(1_100);

    assert!(h.sink.is_empty(), "destroy 之后不得产生任何事件");
    assert!(!h.batcher.is_writable());
    assert!(!h.batcher.is_readable());
    assert_eq!(h.runtime.pending_timers(), 0);
}

#[test]
fn destroy_cancels_an_armed_timer() {
    let h = harness();
    h.batcher.resume();
    h.write_all([1]);
    h.settle();
    assert_eq!(h.runtime.pending_timers(), 1);

    h.batcher.destroy();
    assert_eq!(h.runtime.pending_timers(), 0);
    assert!(!h.batcher.stats().timer_armed);
}

#[test]
fn errors_pending_at_destroy_are_suppressed() {
    let h = harness();
    h.write_all(1..=11);
    h.batcher.destroy();
    h.write_all([12]);
    h.settle();

    assert!(h.sink.is_empty(), "销毁前后登记的错误都不得送达");
}

#[test]
fn destroy_is_idempotent() {
    let h = harness();
    h.batcher.destroy();
    h.batcher.destroy();
    h.batcher.end();
    h.settle();
    assert!(h.batcher.stats().destroyed);
    assert!(h.sink.is_empty());
}

#[test]
fn closed_sentinel_rejects_every_write() {
    let h = harness_with(default_config().with_batch_overflow(-1));
    assert!(h.batcher.is_writable(), "可写标记只由 end/destroy 清除");
    h.write_all([1, 2]);
    h.settle();

    assert_eq!(h.sink.errors(), vec![BatchError::Closed, BatchError::Closed]);
    assert_eq!(h.batcher.stats().queued, 0);
}

#[test]
fn zero_overflow_falls_back_to_default_limit() {
    let h = harness_with(default_config().with_batch_overflow(0));
    assert!(h.batcher.is_writable());
    h.write_all(1..=11);
    h.settle();

    assert!(h.sink.is_empty(), "batch_overflow = 0 视为未设置，不得拒绝任何写入");
    assert_eq!(h.batcher.stats().queued, 11);
}
