//! 裸描述符系统调用的最小封装与 errno 分类。
//!
//! # 模块定位（Why）
//! - 引擎的全部平台接触面收敛在此：`fcntl` 模式切换与单次非阻塞读写；
//! - errno 在这里一次性折算为 [`Transient`](SyscallFailure::Transient) /
//!   [`Fatal`](SyscallFailure::Fatal) 两类，上层决策永远基于
//!   [`std::io::ErrorKind`]，不比对平台错误码。

use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// 单次系统调用的失败形态。
///
/// 瞬态（would-block / interrupted）与致命故障在类型层面分开，
/// 引擎据此选择“吸收为停滞/排空结束”或“上报致命错误”，
/// 不需要在调用点重复解读 `io::Error`。
#[derive(Debug, Error)]
pub(crate) enum SyscallFailure {
    /// 描述符暂时无法推进（`EAGAIN`/`EWOULDBLOCK`/`EINTR` 一类）。
    #[error("描述符暂时无法推进: {0}")]
    Transient(io::Error),
    /// 其余一切 I/O 故障，对引擎而言是致命的。
    #[error("致命 I/O 故障: {0}")]
    Fatal(io::Error),
}

fn classify(err: io::Error) -> SyscallFailure {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => SyscallFailure::Transient(err),
        _ => SyscallFailure::Fatal(err),
    }
}

/// 校验描述符有效并强制其进入非阻塞模式。
///
/// 已处于非阻塞模式时不再重复 `F_SETFL`，避免多余的系统调用。
pub(crate) fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl 的 F_GETFL/F_SETFL 对任意整数描述符都是内存安全的，
    // 非法描述符由返回值 -1 + errno 表达。
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if flags & libc::O_NONBLOCK != 0 {
        return Ok(());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// 发起一次非阻塞读，目标为调用方提供的缓冲切片。
pub(crate) fn read(fd: RawFd, buf: &mut [u8]) -> Result<usize, SyscallFailure> {
    // SAFETY: 指针与长度来自同一有效切片，内核至多写入 buf.len() 字节。
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(classify(io::Error::last_os_error()))
    } else {
        Ok(n as usize)
    }
}

/// 发起一次非阻塞写。
pub(crate) fn write(fd: RawFd, buf: &[u8]) -> Result<usize, SyscallFailure> {
    // SAFETY: 指针与长度来自同一有效切片，内核只读取 buf.len() 字节。
    let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(classify(io::Error::last_os_error()))
    } else {
        Ok(n as usize)
    }
}
