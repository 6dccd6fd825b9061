use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};

use bytes::BytesMut;
use conch_core::error::codes;
use conch_core::{CoreError, Result};

use crate::ChunkedBufConfig;

/// 单个定长存储块：`rpos..wpos` 为待读区，`wpos..chunk_size` 为空闲区。
///
/// 块一经分配长度即固定为配置的块尺寸（`BytesMut::zeroed`），
/// 读写进度完全由两个游标表达，`rpos <= wpos <= chunk_size` 恒成立。
#[derive(Debug)]
struct Chunk {
    data: BytesMut,
    rpos: usize,
    wpos: usize,
}

impl Chunk {
    fn new(chunk_size: usize) -> Self {
        Self {
            data: BytesMut::zeroed(chunk_size),
            rpos: 0,
            wpos: 0,
        }
    }

    /// 当前待读字节数。
    fn readable(&self) -> usize {
        self.wpos - self.rpos
    }
}

/// `ChunkedBuf` 是按固定尺寸分块的 FIFO 字节队列。
///
/// # 设计动机（Why）
/// - I/O 引擎需要在“任意长度的用户写入”与“一次一个系统调用”的节奏之间
///   缓存字节流；分块结构让增长与收缩都以块为单位，避免大段 `memmove`；
/// - 锁定视图协议（[`locked_read`](Self::locked_read) /
///   [`locked_write`](Self::locked_write)）把内核系统调用直接指向内部存储，
///   省掉热路径上的中间拷贝，同时对非 I/O 调用方保留普通队列语义。
///
/// # 契约说明（What）
/// - **不变量**：`len()` 等于所有块待读字节之和；块内 `rpos <= wpos`；
///   队首块一旦从读侧完全耗尽（读游标走到块尾）立即释放；
/// - **溢出**：上限检查发生在追加之前——一次 [`write`](Self::write) 要么
///   全部入队要么返回 [`codes::BUFFER_OVERFLOW`]，不存在部分入队；
/// - **视图独占**：两类视图都要求 `&mut self`，由借用检查器保证不会并存；
///   提交长度超过授予长度视为调用方编码错误，触发 panic 而非错误返回。
///
/// # 设计取舍（Trade-offs）
/// - 块用 `BytesMut::zeroed` 预初始化，视图因此是纯安全切片；
///   代价是每块分配时多一次清零，对 4 KiB 级别的块可以忽略；
/// - 连续可读段以单块为界：跨块数据需要两次视图授予，调用方
///   （典型为引擎的冲刷循环）本就按循环消费，不构成额外负担。
#[derive(Debug)]
pub struct ChunkedBuf {
    chunks: VecDeque<Chunk>,
    len: usize,
    chunk_size: usize,
    limit: usize,
}

impl ChunkedBuf {
    /// 以给定配置创建空缓冲。
    pub fn new(config: ChunkedBufConfig) -> Self {
        Self {
            chunks: VecDeque::new(),
            len: 0,
            chunk_size: config.chunk_size(),
            limit: config.limit(),
        }
    }

    /// 当前驻留的字节总数。
    pub fn len(&self) -> usize {
        self.len
    }

    /// 缓冲是否为空。
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 单块容量（字节）。
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 当前字节上限，`0` 表示不限。
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 设置或替换字节上限（`0` = 不限）。
    ///
    /// 仅影响后续写入：已驻留字节即使超过新上限也不会被丢弃，
    /// 只是后续追加会被拒绝，直到读取腾出空间。
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// 释放全部块并清空缓冲。
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    /// 追加一段字节，按需分配新块。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：若设置了上限，`len() + data.len()` 不得超过上限，
    ///   否则返回 [`codes::BUFFER_OVERFLOW`] 且**不写入任何字节**；
    /// - **后置条件**：成功时 `data` 全部入队，`len()` 增加 `data.len()`。
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_capacity_for(data.len())?;
        let mut rest = data;
        while !rest.is_empty() {
            let chunk_size = self.chunk_size;
            let tail = self.writable_tail();
            let take = rest.len().min(chunk_size - tail.wpos);
            tail.data[tail.wpos..tail.wpos + take].copy_from_slice(&rest[..take]);
            tail.wpos += take;
            self.len += take;
            rest = &rest[take..];
        }
        Ok(())
    }

    /// 从队首拷出至多 `dest.len()` 字节，返回实际拷出数。
    ///
    /// 完全耗尽的队首块随即释放；`dest` 超过驻留量时只拷出驻留部分。
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < dest.len() && self.len > 0 {
            let take = {
                let front = self.readable_front();
                let take = front.readable().min(dest.len() - copied);
                dest[copied..copied + take]
                    .copy_from_slice(&front.data[front.rpos..front.rpos + take]);
                take
            };
            self.consume(take);
            copied += take;
        }
        copied
    }

    /// 锁定最大连续可读段（以单块为界），缓冲为空时返回 `None`。
    ///
    /// 调用方读取视图内容后以 [`ReadView::commit`] 提交实际消费量；
    /// 直接丢弃视图等价于提交 0 字节。
    pub fn locked_read(&mut self) -> Option<ReadView<'_>> {
        if self.len == 0 {
            return None;
        }
        let granted = self.readable_front().readable();
        debug_assert!(granted > 0, "非空缓冲的队首块必有待读字节");
        Some(ReadView {
            buf: self,
            granted,
        })
    }

    /// 锁定尾块空闲区供直接写入，尾块已满时先分配新块。
    ///
    /// # 契约说明（What）
    /// - 授予长度不超过单块剩余空间，且在设置上限时被钳制到
    ///   `limit - len()`，锁定视图协议因此**不可能**突破上限；
    /// - 缓冲已达上限时返回 [`codes::BUFFER_OVERFLOW`]；
    /// - 调用方写入后以 [`WriteView::commit`] 发布实际生产量，
    ///   直接丢弃视图等价于提交 0 字节。
    pub fn locked_write(&mut self) -> Result<WriteView<'_>> {
        if self.limit != 0 && self.len >= self.limit {
            return Err(overflow_error(self.limit));
        }
        let headroom = if self.limit == 0 {
            usize::MAX
        } else {
            self.limit - self.len
        };
        let chunk_size = self.chunk_size;
        let tail = self.writable_tail();
        let granted = (chunk_size - tail.wpos).min(headroom);
        Ok(WriteView {
            buf: self,
            granted,
        })
    }

    /// 校验追加 `additional` 字节是否会突破上限。
    fn ensure_capacity_for(&self, additional: usize) -> Result<()> {
        if self.limit != 0 && self.len.saturating_add(additional) > self.limit {
            return Err(overflow_error(self.limit));
        }
        Ok(())
    }

    /// 返回仍有空闲区的尾块，必要时分配新块。
    fn writable_tail(&mut self) -> &mut Chunk {
        let needs_chunk = match self.chunks.back() {
            Some(tail) => tail.wpos == self.chunk_size,
            None => true,
        };
        if needs_chunk {
            self.chunks.push_back(Chunk::new(self.chunk_size));
        }
        match self.chunks.back_mut() {
            Some(tail) => tail,
            None => unreachable!("上一步已保证尾块存在"),
        }
    }

    /// 返回队首块；仅在 `len > 0` 时调用。
    fn readable_front(&self) -> &Chunk {
        match self.chunks.front() {
            Some(front) => front,
            None => unreachable!("len > 0 已保证队首块存在"),
        }
    }

    /// 从读侧消费 `n` 字节并释放走到块尾的队首块。
    fn consume(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let release = {
            let front = match self.chunks.front_mut() {
                Some(front) => front,
                None => unreachable!("消费前应持有非空缓冲"),
            };
            debug_assert!(n <= front.readable());
            front.rpos += n;
            front.rpos == self.chunk_size
        };
        self.len -= n;
        if release {
            self.chunks.pop_front();
        }
    }

    /// 从写侧发布 `n` 字节（锁定写视图的提交路径）。
    fn produce(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let tail = match self.chunks.back_mut() {
            Some(tail) => tail,
            None => unreachable!("写视图在授予时已保证尾块存在"),
        };
        tail.wpos += n;
        self.len += n;
    }
}

fn overflow_error(limit: usize) -> CoreError {
    CoreError::new(
        codes::BUFFER_OVERFLOW,
        format!("缓冲字节上限 {limit} 已用尽"),
    )
}

/// 锁定的只读视图：指向队首块中最大的连续待读段。
///
/// 解引用得到授予的切片；[`commit`](Self::commit) 是作用域化的提交步骤，
/// 提交量计入消费并可能触发队首块释放。未提交即丢弃不消费任何字节。
#[derive(Debug)]
pub struct ReadView<'a> {
    buf: &'a mut ChunkedBuf,
    granted: usize,
}

impl ReadView<'_> {
    /// 授予的可读长度。
    pub fn granted(&self) -> usize {
        self.granted
    }

    /// 提交实际消费的字节数。
    ///
    /// # Panics
    /// `consumed` 超过授予长度时 panic：视图边界在授予时即已固定，
    /// 越界提交属于调用方编码错误。
    pub fn commit(self, consumed: usize) {
        assert!(
            consumed <= self.granted,
            "读视图提交 {consumed} 字节，超出授予的 {} 字节",
            self.granted
        );
        self.buf.consume(consumed);
    }
}

impl Deref for ReadView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        let front = self.buf.readable_front();
        &front.data[front.rpos..front.rpos + self.granted]
    }
}

/// 锁定的可写视图：指向尾块的空闲区。
///
/// 解引用得到可直接写入的切片；[`commit`](Self::commit) 发布实际生产量。
/// 未提交即丢弃不发布任何字节。
#[derive(Debug)]
pub struct WriteView<'a> {
    buf: &'a mut ChunkedBuf,
    granted: usize,
}

impl WriteView<'_> {
    /// 授予的可写长度。
    pub fn granted(&self) -> usize {
        self.granted
    }

    /// 发布实际写入的字节数。
    ///
    /// # Panics
    /// `produced` 超过授予长度时 panic，理由同 [`ReadView::commit`]。
    pub fn commit(self, produced: usize) {
        assert!(
            produced <= self.granted,
            "写视图提交 {produced} 字节，超出授予的 {} 字节",
            self.granted
        );
        self.buf.produce(produced);
    }
}

impl Deref for WriteView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        let tail = match self.buf.chunks.back() {
            Some(tail) => tail,
            None => unreachable!("写视图在授予时已保证尾块存在"),
        };
        &tail.data[tail.wpos..tail.wpos + self.granted]
    }
}

impl DerefMut for WriteView<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        let tail = match self.buf.chunks.back_mut() {
            Some(tail) => tail,
            None => unreachable!("写视图在授予时已保证尾块存在"),
        };
        &mut tail.data[tail.wpos..tail.wpos + self.granted]
    }
}
