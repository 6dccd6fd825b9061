//! `engine_contract` 集成测试：在真实 Unix 套接字对上验证 I/O 引擎契约。
//!
//! # 测试总览（Why）
//! - 构造面：非法描述符拒绝、强制非阻塞、阈值配置校验；
//! - 写路径：入队即冲刷、顺序与完整性、溢出硬失败、停滞回调与续刷收敛；
//! - 读路径：按阈值切块分发、下界延迟分发、读溢出、对端关闭与致命故障。
//!
//! # 手法说明（How）
//! - 以 `UnixStream::pair` 提供描述符，引擎侧经 `SO_SNDBUF` 收窄发送缓冲
//!   制造停滞；对端切换为非阻塞后由测试线程自行排空；
//! - 回调以捕获 `Arc<Mutex<_>>` 的闭包实现，借毯式实现直接充当能力 trait。

use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use conch_aio::{AioEngine, EngineConfig, HandlerFlow};
use conch_core::error::codes;

fn pair() -> (UnixStream, UnixStream) {
    UnixStream::pair().expect("创建套接字对失败")
}

/// 把描述符的发送缓冲收窄到内核允许的下限附近，便于制造停滞。
fn shrink_send_buffer(fd: RawFd) {
    let size: libc::c_int = 4096;
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_SNDBUF,
            (&size as *const libc::c_int).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    assert_eq!(rc, 0, "setsockopt(SO_SNDBUF) 失败");
}

/// 非阻塞地排空对端，按 `step` 字节一批收集。
fn drain_peer(peer: &mut UnixStream, step: usize, sink: &mut Vec<u8>) {
    let mut chunk = vec![0u8; step];
    loop {
        match peer.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => sink.extend_from_slice(&chunk[..n]),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(err) => panic!("对端读取失败: {err}"),
        }
    }
}

#[test]
fn bind_rejects_invalid_descriptor() {
    let err = AioEngine::bind(-1, EngineConfig::default()).expect_err("非法描述符必须拒绝构造");
    assert_eq!(err.code(), codes::AIO_BIND);
}

#[test]
fn bind_forces_nonblocking_mode() {
    let (a, _b) = pair();
    let engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    let flags = unsafe { libc::fcntl(engine.fd(), libc::F_GETFL) };
    assert!(flags >= 0);
    assert!(
        flags & libc::O_NONBLOCK != 0,
        "构造后描述符必须处于非阻塞模式"
    );
}

/// 写路径基线：socket 空闲时 `write` 入队即全量冲刷，对端按序收到原文。
#[test]
fn write_flushes_immediately_in_order() {
    let (a, mut b) = pair();
    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    assert_eq!(engine.write(b"hello ").expect("写入失败"), 6);
    assert_eq!(engine.write(b"conch").expect("写入失败"), 5);
    assert_eq!(engine.pending_output(), 0, "空闲 socket 应被一次冲净");

    b.set_read_timeout(Some(Duration::from_secs(1))).unwrap();
    let mut got = [0u8; 11];
    b.read_exact(&mut got).expect("对端应收到全部字节");
    assert_eq!(&got, b"hello conch");
}

/// 幂等性：输出缓冲为空时 `flush_out` 返回 0 且不触发任何回调。
#[test]
fn flush_on_empty_buffer_is_noop() {
    let (a, _b) = pair();
    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    let stalls = Arc::new(Mutex::new(Vec::<usize>::new()));
    let probe = stalls.clone();
    engine.set_stall_handler(move |pending: usize| {
        probe.lock().unwrap().push(pending);
        HandlerFlow::Continue
    });
    assert_eq!(engine.flush_out().expect("空缓冲冲刷不应失败"), 0);
    assert!(stalls.lock().unwrap().is_empty(), "空冲刷不得上报停滞");
}

/// 溢出是硬失败：越限写入整体拒绝，缓冲内容与积压计数不受影响。
#[test]
fn write_overflow_rejects_without_partial_enqueue() {
    let (a, _b) = pair();
    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    engine.set_write_overflow(8);
    let err = engine.write(&[0u8; 16]).expect_err("越限写入必须失败");
    assert_eq!(err.code(), codes::BUFFER_OVERFLOW);
    assert_eq!(engine.pending_output(), 0, "失败写入不得残留字节");
    assert_eq!(engine.write(b"ok").expect("上限内写入应恢复成功"), 2);
}

/// 端到端（§写侧）：一次大块写入 + 反复冲刷 + 对端慢速排空，
/// 最终对端字节流与源完全一致，且停滞回调至少触发一次。
#[test]
fn slow_peer_roundtrip_with_stall() {
    const TOTAL: usize = 300_000;
    let (a, mut b) = pair();
    shrink_send_buffer(a.as_raw_fd());
    b.set_nonblocking(true).unwrap();

    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    engine.set_write_overflow(TOTAL + 1);
    let stalls = Arc::new(Mutex::new(Vec::<usize>::new()));
    let probe = stalls.clone();
    engine.set_stall_handler(move |pending: usize| {
        probe.lock().unwrap().push(pending);
        HandlerFlow::Continue
    });

    let source: Vec<u8> = (0..TOTAL).map(|i| (i % 251) as u8).collect();
    assert_eq!(engine.write(&source).expect("上限内写入应成功"), TOTAL);
    assert!(engine.pending_output() > 0, "收窄的发送缓冲必然产生积压");

    let mut received = Vec::with_capacity(TOTAL);
    let mut rounds = 0;
    while received.len() < TOTAL {
        drain_peer(&mut b, 1000, &mut received);
        engine.flush_out().expect("续刷不应失败");
        rounds += 1;
        assert!(rounds < 10_000, "冲刷-排空循环未收敛");
    }
    assert_eq!(received, source, "对端字节流必须与源逐字节一致");
    assert_eq!(engine.pending_output(), 0);
    let stalls = stalls.lock().unwrap();
    assert!(!stalls.is_empty(), "慢速对端下停滞回调应至少触发一次");
    assert!(stalls.iter().all(|pending| *pending > 0));
}

/// 端到端（§读侧）：`min = max = 5000` 时回调只收到恰好 5000 字节的块，
/// 不足一块的尾部留在输入缓冲中。
#[test]
fn read_limits_slice_exact_blocks() {
    const CHUNK: usize = 2000;
    const ROUNDS: usize = 11; // 共 22_000 字节 → 4 个整块 + 2000 字节尾部
    let (a, mut b) = pair();
    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    engine
        .set_read_limits(5000, NonZeroUsize::new(5000))
        .expect("合法阈值");

    let blocks = Arc::new(Mutex::new(Vec::<Bytes>::new()));
    let sink = blocks.clone();
    engine.set_read_handler(move |block: Bytes| {
        sink.lock().unwrap().push(block);
        HandlerFlow::Continue
    });

    let source: Vec<u8> = (0..CHUNK * ROUNDS).map(|i| (i % 199) as u8).collect();
    for round in 0..ROUNDS {
        b.write_all(&source[round * CHUNK..(round + 1) * CHUNK])
            .expect("对端写入失败");
        engine.drain_in().expect("排空不应失败");
    }

    let blocks = blocks.lock().unwrap();
    assert_eq!(blocks.len(), 4);
    assert!(
        blocks.iter().all(|block| block.len() == 5000),
        "有界阈值下每块必须恰好 5000 字节"
    );
    let delivered: Vec<u8> = blocks.iter().flat_map(|block| block.iter().copied()).collect();
    assert_eq!(&delivered[..], &source[..20_000], "分发流必须与源前缀一致");
    assert_eq!(engine.buffered_input(), 2000, "不足一块的尾部应继续驻留");
}

/// 阈值下界：驻留量不足 `min` 时不分发；一旦达到，`max` 不限时整段交付。
#[test]
fn min_threshold_defers_dispatch() {
    let (a, mut b) = pair();
    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    engine.set_read_limits(4, None).expect("合法阈值");

    let blocks = Arc::new(Mutex::new(Vec::<Bytes>::new()));
    let sink = blocks.clone();
    engine.set_read_handler(move |block: Bytes| {
        sink.lock().unwrap().push(block);
        HandlerFlow::Continue
    });

    b.write_all(b"abc").unwrap();
    engine.drain_in().expect("排空不应失败");
    assert!(blocks.lock().unwrap().is_empty(), "未达下界不得分发");
    assert_eq!(engine.buffered_input(), 3);

    b.write_all(b"de").unwrap();
    engine.drain_in().expect("排空不应失败");
    let blocks = blocks.lock().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(&blocks[0][..], b"abcde", "max 不限时应整段交付驻留量");
    assert_eq!(engine.buffered_input(), 0);
}

/// 未设置读回调时输入被静默消费，不在缓冲中积累。
#[test]
fn missing_read_handler_discards_input() {
    let (a, mut b) = pair();
    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    b.write_all(b"discard me").unwrap();
    let n = engine.drain_in().expect("排空不应失败");
    assert_eq!(n, 10);
    assert_eq!(engine.buffered_input(), 0, "无回调时输入应被丢弃而非驻留");
}

/// 阈值校验失败时返回配置错误且原阈值保持不变。
#[test]
fn invalid_read_limits_leave_state_unchanged() {
    let (a, _b) = pair();
    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    let err = engine.set_read_limits(0, None).expect_err("min = 0 非法");
    assert_eq!(err.code(), codes::AIO_CONFIG);
    let err = engine
        .set_read_limits(6, NonZeroUsize::new(5))
        .expect_err("min > max 非法");
    assert_eq!(err.code(), codes::AIO_CONFIG);
    assert_eq!(engine.read_limits(), (1, None), "失败的配置不得生效");
}

/// 读方向溢出：分发阈值拦不住的积压一旦触顶，排空以溢出错误中止。
#[test]
fn read_overflow_is_reported_from_drain() {
    let (a, mut b) = pair();
    let config = EngineConfig::new().with_read_overflow(1024);
    let mut engine = AioEngine::bind(a.as_raw_fd(), config).expect("构造失败");
    engine.set_read_limits(100_000, None).expect("合法阈值");

    b.write_all(&[7u8; 4096]).unwrap();
    let err = engine.drain_in().expect_err("触顶后排空必须失败");
    assert_eq!(err.code(), codes::BUFFER_OVERFLOW);
    assert_eq!(engine.buffered_input(), 1024, "上限内的字节应完好驻留");
}

/// 对端关闭写方向后，排空以 0 字节无错结束。
#[test]
fn peer_shutdown_ends_drain_without_error() {
    let (a, b) = pair();
    let mut engine = AioEngine::bind(a.as_raw_fd(), EngineConfig::default()).expect("构造失败");
    drop(b);
    assert_eq!(engine.drain_in().expect("对端关闭不是错误"), 0);
}

/// 致命故障：描述符失效后排空以 `aio.io` 上报，调用方应销毁引擎。
#[test]
fn fatal_descriptor_error_is_reported() {
    let (a, _b) = pair();
    let fd = a.into_raw_fd();
    let mut engine = AioEngine::bind(fd, EngineConfig::default()).expect("构造失败");
    let rc = unsafe { libc::close(fd) };
    assert_eq!(rc, 0);
    let err = engine.drain_in().expect_err("失效描述符必须上报致命错误");
    assert_eq!(err.code(), codes::AIO_IO);
}
