use std::num::NonZeroUsize;
use std::os::fd::RawFd;

use bytes::Bytes;
use conch_buffer::ChunkedBuf;
use conch_core::error::codes;
use conch_core::{CoreError, Result};
use tracing::{debug, trace};

use crate::handler::{ReadHandler, StallHandler};
use crate::sys::{self, SyscallFailure};
use crate::EngineConfig;

/// `AioEngine` 把一个非阻塞描述符与输入/输出两个分块缓冲装配为
/// 反应器式 I/O 的执行半部。
///
/// # 设计背景（Why）
/// - 交互式 Shell 框架的连接处理要求“永不阻塞调用线程”：写方可能随时
///   产生任意长度的输出，读方则要按协议节奏切块消费；引擎用两个
///   [`ChunkedBuf`] 吸收两侧速率差，系统调用只在外部循环报告就绪时发生；
/// - 读写系统调用直接指向缓冲的锁定视图（授予-提交协议），
///   热路径上没有中间拷贝。
///
/// # 契约说明（What）
/// - **串行访问**：单线程协作式设计，同一实例的任意两个操作不得并发，
///   回调中不得重入引擎；
/// - **描述符**：构造时校验并强制非阻塞模式；引擎独占使用权但不持有
///   生命周期——析构**不会**关闭描述符，调用方需维持其在引擎存续期内
///   有效且保持非阻塞；
/// - **阈值**：读回调收到的块长恒满足 `min <= len`，设置上界时
///   `len <= max`；`min` 默认 1，`max` 默认不限；
/// - **析构**：释放两个缓冲（未冲刷数据随之丢弃），遗忘描述符。
///
/// # 失败语义（Trade-offs）
/// - would-block / interrupted 被吸收为停滞或排空结束，不以错误出现；
/// - 溢出（[`codes::BUFFER_OVERFLOW`]）是对应方向的硬失败，引擎仍可
///   查询诊断，但该方向逻辑上已破损；
/// - 其余描述符故障以 [`codes::AIO_IO`] 上报，调用方应销毁引擎。
pub struct AioEngine {
    fd: RawFd,
    in_buf: ChunkedBuf,
    out_buf: ChunkedBuf,
    min_read: usize,
    max_read: Option<NonZeroUsize>,
    read_handler: Option<Box<dyn ReadHandler>>,
    stall_handler: Option<Box<dyn StallHandler>>,
}

impl std::fmt::Debug for AioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AioEngine")
            .field("fd", &self.fd)
            .field("in_buf", &self.in_buf)
            .field("out_buf", &self.out_buf)
            .field("min_read", &self.min_read)
            .field("max_read", &self.max_read)
            .field("read_handler", &self.read_handler.is_some())
            .field("stall_handler", &self.stall_handler.is_some())
            .finish()
    }
}

impl AioEngine {
    /// 绑定描述符并构造引擎。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：`fd` 指向一个已打开的描述符；
    /// - **副作用**：描述符被切换为非阻塞模式，该模式在引擎存续期内
    ///   必须保持；
    /// - **失败**：描述符非法或模式切换失败时返回 [`codes::AIO_BIND`]，
    ///   不产生任何副作用残留。
    pub fn bind(fd: RawFd, config: EngineConfig) -> Result<Self> {
        sys::set_nonblocking(fd).map_err(|err| {
            CoreError::new(codes::AIO_BIND, format!("无法将描述符 {fd} 切换为非阻塞模式"))
                .with_cause(err)
        })?;
        Ok(Self {
            fd,
            in_buf: ChunkedBuf::new(config.input_buffer()),
            out_buf: ChunkedBuf::new(config.output_buffer()),
            min_read: config.min_read(),
            max_read: config.max_read(),
            read_handler: None,
            stall_handler: None,
        })
    }

    /// 绑定的描述符。
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// 输出缓冲当前积压的字节数（停滞诊断用）。
    pub fn pending_output(&self) -> usize {
        self.out_buf.len()
    }

    /// 输入缓冲当前驻留、尚未达到分发阈值的字节数。
    pub fn buffered_input(&self) -> usize {
        self.in_buf.len()
    }

    /// 当前读分发阈值 `(min, max)`。
    pub fn read_limits(&self) -> (usize, Option<NonZeroUsize>) {
        (self.min_read, self.max_read)
    }

    /// 设置读回调；未设置时已排空的输入被静默丢弃。
    pub fn set_read_handler(&mut self, handler: impl ReadHandler + 'static) {
        self.read_handler = Some(Box::new(handler));
    }

    /// 设置停滞回调。
    pub fn set_stall_handler(&mut self, handler: impl StallHandler + 'static) {
        self.stall_handler = Some(Box::new(handler));
    }

    /// 调整读分发阈值。
    ///
    /// # 契约说明（What）
    /// - `min >= 1`，且设置上界时 `min <= max`；
    /// - 违反约束返回 [`codes::AIO_CONFIG`]，原阈值保持不变。
    pub fn set_read_limits(&mut self, min: usize, max: Option<NonZeroUsize>) -> Result<()> {
        if min < 1 {
            return Err(CoreError::new(
                codes::AIO_CONFIG,
                "读阈值下界必须至少为 1 字节",
            ));
        }
        if let Some(max) = max {
            if min > max.get() {
                return Err(CoreError::new(
                    codes::AIO_CONFIG,
                    format!("读阈值组合非法：min {min} 大于 max {max}"),
                ));
            }
        }
        self.min_read = min;
        self.max_read = max;
        Ok(())
    }

    /// 替换写方向溢出上限（`0` = 不限）。
    pub fn set_write_overflow(&mut self, limit: usize) {
        self.out_buf.set_limit(limit);
    }

    /// 替换读方向溢出上限（`0` = 不限）。
    pub fn set_read_overflow(&mut self, limit: usize) {
        self.in_buf.set_limit(limit);
    }

    /// 把 `data` 拷入输出缓冲并立即尝试一轮非阻塞冲刷。
    ///
    /// # 契约说明（What）
    /// - **溢出**：入队会突破写上限时整体失败（[`codes::BUFFER_OVERFLOW`]），
    ///   不写入任何字节；
    /// - **停滞**：内核未能全量吸收属于成功路径，停滞回调会收到积压长度，
    ///   调用方应在描述符再次可写时调用 [`flush_out`](Self::flush_out)；
    /// - **返回**：成功时为 `data.len()`；本调用永不阻塞。
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if let Err(err) = self.out_buf.write(data) {
            debug!(fd = self.fd, requested = data.len(), "写入超出输出缓冲上限");
            return Err(err);
        }
        self.flush_out()?;
        Ok(data.len())
    }

    /// 冲刷循环：只要输出缓冲仍有数据，就取最大连续已读视图发起一次
    /// 非阻塞写。
    ///
    /// # 执行步骤（How）
    /// 1. 全量写入 → 提交并继续循环；
    /// 2. 部分写入（写出少于授予量）→ 提交实际写出量，视作停滞：
    ///    通知停滞回调后结束本轮；
    /// 3. would-block / interrupted → 同样视作停滞；
    /// 4. 其余故障 → 以 [`codes::AIO_IO`] 中止，引擎不在内部重试。
    ///
    /// 返回本次调用实际写入描述符的总字节数；空缓冲时返回 `Ok(0)`
    /// 且无任何副作用。
    pub fn flush_out(&mut self) -> Result<usize> {
        let mut total = 0usize;
        loop {
            let view = match self.out_buf.locked_read() {
                Some(view) => view,
                None => break,
            };
            let granted = view.granted();
            match sys::write(self.fd, &view) {
                Ok(n) => {
                    view.commit(n);
                    total += n;
                    if n < granted {
                        trace!(fd = self.fd, wrote = n, granted, "部分写入，进入停滞");
                        self.notify_stall();
                        break;
                    }
                }
                Err(SyscallFailure::Transient(err)) => {
                    view.commit(0);
                    trace!(fd = self.fd, error = %err, "内核暂不可写，进入停滞");
                    self.notify_stall();
                    break;
                }
                Err(SyscallFailure::Fatal(err)) => {
                    view.commit(0);
                    return Err(CoreError::new(
                        codes::AIO_IO,
                        format!("描述符 {} 写入失败", self.fd),
                    )
                    .with_cause(err));
                }
            }
        }
        Ok(total)
    }

    /// 排空循环：反复把内核数据直读进输入缓冲的锁定写视图，
    /// 每次提交后按阈值切块分发。
    ///
    /// # 执行步骤（How）
    /// 1. 锁定写视图（输入缓冲已达读上限时以
    ///    [`codes::BUFFER_OVERFLOW`] 失败）；
    /// 2. 发起一次非阻塞读并提交实际读取量；
    /// 3. would-block / interrupted → 本轮排空无错结束（当前无更多数据）；
    ///    读到 0 字节（对端关闭）同样结束本轮；
    /// 4. 每次成功提交后执行内部分发循环（见 [`dispatch`](Self::dispatch)）；
    /// 5. 仅当上一次读**填满**了整个授予视图时才继续外层循环——
    ///    读不满即推定内核已排空，省掉一次注定 would-block 的系统调用。
    ///
    /// 返回本次调用读取的总字节数。
    pub fn drain_in(&mut self) -> Result<usize> {
        let mut total = 0usize;
        loop {
            let mut view = self.in_buf.locked_write()?;
            let granted = view.granted();
            match sys::read(self.fd, &mut view) {
                Ok(0) => {
                    view.commit(0);
                    debug!(fd = self.fd, "读到 0 字节，对端已关闭写方向");
                    break;
                }
                Ok(n) => {
                    view.commit(n);
                    total += n;
                    self.dispatch();
                    if n < granted {
                        break;
                    }
                }
                Err(SyscallFailure::Transient(_)) => {
                    view.commit(0);
                    break;
                }
                Err(SyscallFailure::Fatal(err)) => {
                    view.commit(0);
                    return Err(CoreError::new(
                        codes::AIO_IO,
                        format!("描述符 {} 读取失败", self.fd),
                    )
                    .with_cause(err));
                }
            }
        }
        Ok(total)
    }

    /// 内部分发循环：驻留量达到 `min` 即切块交给读回调。
    ///
    /// 块长取驻留全量（`max` 不限时）或 `min(驻留量, max)`；
    /// 块是为本次分发新分配的独立 [`Bytes`]，所有权随回调转移。
    /// 未设置读回调时按同样节奏消费并丢弃。
    fn dispatch(&mut self) {
        while self.in_buf.len() >= self.min_read {
            let stored = self.in_buf.len();
            let copy_len = match self.max_read {
                None => stored,
                Some(max) => stored.min(max.get()),
            };
            let mut block = vec![0u8; copy_len];
            let copied = self.in_buf.read(&mut block);
            debug_assert_eq!(copied, copy_len, "驻留量检查已保证足量");
            let block = Bytes::from(block);
            match self.read_handler.as_mut() {
                Some(handler) => {
                    // 返回值预留给未来的取消语义，当前忽略。
                    let _ = handler.on_data(block);
                }
                None => {
                    trace!(fd = self.fd, discarded = copy_len, "未设置读回调，丢弃输入");
                }
            }
        }
    }

    fn notify_stall(&mut self) {
        let pending = self.out_buf.len();
        debug!(fd = self.fd, pending, "输出停滞");
        if let Some(handler) = self.stall_handler.as_mut() {
            let _ = handler.on_stall(pending);
        }
    }
}
