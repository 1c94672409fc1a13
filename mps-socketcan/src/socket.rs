//! Thin wrappers over the raw `PF_CAN` socket calls.

use std::{ffi::CString, fmt, io, mem, os::raw::c_int, ptr};
use libc::{
    bind, can_frame, close, if_nametoindex, sa_family_t, setsockopt, sockaddr, sockaddr_can,
    socket, socklen_t, write, AF_CAN, CAN_RAW, EINPROGRESS, PF_CAN, SOCK_RAW,
};

/// Tries to open a raw CAN socket bound to `addr`.
pub fn raw_open_socket(addr: &CanAddr) -> io::Result<c_int> {
    let fd = unsafe { socket(PF_CAN, SOCK_RAW, CAN_RAW) };

    if fd == -1 {
        return Err(io::Error::last_os_error());
    }

    let ret = unsafe { bind(fd, addr.as_sockaddr_ptr(), CanAddr::len() as socklen_t) };

    if ret == -1 {
        let err = io::Error::last_os_error();
        unsafe { close(fd) };
        Err(err)
    } else {
        Ok(fd)
    }
}

/// Write a single frame to the socket, fd.
pub fn raw_write_frame(fd: c_int, frame: &can_frame) -> io::Result<()> {
    let n = mem::size_of::<can_frame>();
    let ret = unsafe { write(fd, (frame as *const can_frame).cast(), n) };
    check_written(ret, n)
}

/// Maps the return of `write(2)` for an `n` byte frame.
///
/// A short write leaves errno untouched, so it gets its own error.
#[inline]
pub(crate) fn check_written(ret: isize, n: usize) -> io::Result<()> {
    match ret {
        ret if ret < 0 => Err(io::Error::last_os_error()),
        ret if ret as usize == n => Ok(()),
        ret => Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write of {} of {} bytes", ret, n),
        )),
    }
}

/// Sets a collection of multiple socket options with one call.
pub fn set_socket_option_mult<T>(
    fd: c_int,
    level: c_int,
    name: c_int,
    values: &[T],
) -> io::Result<()> {
    let ret = if values.is_empty() {
        // can't pass in a ptr to a 0-len slice
        unsafe { setsockopt(fd, level, name, ptr::null(), 0) }
    } else {
        unsafe {
            setsockopt(
                fd,
                level,
                name,
                values.as_ptr().cast(),
                mem::size_of_val(values) as socklen_t,
            )
        }
    };

    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// A zeroed C `can_frame`.
#[inline(always)]
pub fn can_frame_default() -> can_frame {
    unsafe { mem::zeroed() }
}

/// Check an error return value for timeouts.
pub trait ShouldRetry {
    /// If `true`, the error is probably due to a timeout.
    fn should_retry(&self) -> bool;
}

impl ShouldRetry for io::Error {
    fn should_retry(&self) -> bool {
        match self.kind() {
            // EAGAIN and EWOULDBLOCK
            io::ErrorKind::WouldBlock => true,
            _ => matches!(self.raw_os_error(), Some(errno) if errno == EINPROGRESS),
        }
    }
}

/// CAN socket address, compatible with `sockaddr_can`.
///
/// Created from an interface name like "can0" or "vcan0", or directly from an
/// interface index. Index zero reads from all interfaces.
#[derive(Clone, Copy)]
pub struct CanAddr(sockaddr_can);

impl CanAddr {
    pub fn new(ifindex: u32) -> Self {
        let mut addr = Self::default();
        addr.0.can_ifindex = ifindex as c_int;
        addr
    }

    /// Try to create an address from an interface name.
    pub fn from_iface(ifname: &str) -> io::Result<Self> {
        let ifname = CString::new(ifname)?;
        let ifindex = unsafe { if_nametoindex(ifname.as_ptr()) };
        if ifindex == 0 {
            Err(io::Error::last_os_error())
        }
        else {
            Ok(Self::new(ifindex))
        }
    }

    pub fn as_sockaddr_ptr(&self) -> *const sockaddr {
        (&self.0 as *const sockaddr_can).cast()
    }

    pub fn len() -> usize {
        mem::size_of::<sockaddr_can>()
    }
}

impl Default for CanAddr {
    fn default() -> Self {
        let mut addr: sockaddr_can = unsafe { mem::zeroed() };
        addr.can_family = AF_CAN as sa_family_t;
        Self(addr)
    }
}

impl fmt::Debug for CanAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CanAddr {{ can_family: {}, can_ifindex: {} }}",
            self.0.can_family, self.0.can_ifindex
        )
    }
}
