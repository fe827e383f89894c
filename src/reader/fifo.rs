use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Open a named pipe read-only without blocking on a missing writer.
///
/// Reads on the returned file report `WouldBlock` while the pipe is empty
/// and a writer is attached, and end-of-stream once no writer remains.
pub fn open_nonblocking(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// Create a named pipe at `path` with the given permission bits.
pub fn create(path: &Path, mode: libc::mode_t) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: c_path is a valid NUL-terminated CString.
    let ret = unsafe { libc::mkfifo(c_path.as_ptr(), mode) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
