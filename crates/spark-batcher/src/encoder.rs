//! 批次编码器：把一批条目转换为交给 Sink 的负载。
//!
//! # 模块定位（Why）
//! - 引擎不解释条目与负载的结构，编码完全委托给调用方；
//! - 编码在处理轮次内同步执行，编码器属于受信协作者：其 panic 直接沿轮次向外展开，引擎不做捕获。
//! - 调用编码器时引擎不持有内部借用，编码器可以持有句柄查询或写入引擎，新写入推迟到后续轮次。
//!
//! # 结构概览（What）
//! - [`Encoder`]：编码 trait，闭包 `FnMut(Vec<T>) -> P` 自动实现；
//! - [`ConcatEncoder`]：默认编码器，按写入顺序拼接字节；
//! - [`IdentityEncoder`]：负载即批次本身，适合下游自行序列化的场景。

use bytes::{BufMut, Bytes, BytesMut};

/// 将一个批次编码为负载。
pub trait Encoder<T> {
    /// 编码结果。
    type Payload;

    /// 编码一个非空批次，批次内顺序即写入顺序。
    fn encode(&mut self, batch: Vec<T>) -> Self::Payload;
}

impl<T, P, F> Encoder<T> for F
where
    F: FnMut(Vec<T>) -> P,
{
    type Payload = P;

    fn encode(&mut self, batch: Vec<T>) -> P {
        self(batch)
    }
}

/// 默认编码器：把条目字节首尾相接，不插入分隔符。
#[derive(Clone, Copy, Debug, Default)]
pub struct ConcatEncoder;

impl<T> Encoder<T> for ConcatEncoder
where
    T: AsRef<[u8]>,
{
    type Payload = Bytes;

    fn encode(&mut self, batch: Vec<T>) -> Bytes {
        let capacity = batch.iter().map(|item| item.as_ref().len()).sum();
        let mut buffer = BytesMut::with_capacity(capacity);
        for item in &batch {
            buffer.put_slice(item.as_ref());
        }
        buffer.freeze()
    }
}

/// 原样返回批次。
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityEncoder;

impl<T> Encoder<T> for IdentityEncoder {
    type Payload = Vec<T>;

    fn encode(&mut self, batch: Vec<T>) -> Vec<T> {
        batch
    }
}
