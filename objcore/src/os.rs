//! Host OS boundary: register state of an interrupted thread and directory
//! entry classification.
//!
//! Everything platform specific sits behind [`Platform`]; exactly one
//! implementation is compiled in and exported as [`HostPlatform`].
use std::{
    ffi::{CStr, CString, OsStr, OsString, c_void},
    io,
    os::unix::ffi::{OsStrExt, OsStringExt},
    path::{Path, PathBuf},
};

use log::trace;

mod signals;

pub use signals::{ContextRecorder, ContextSample};

#[cfg(any(target_os = "freebsd", target_os = "netbsd"))]
mod bsd;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

#[cfg(any(target_os = "freebsd", target_os = "netbsd"))]
pub use bsd::Bsd as HostPlatform;
#[cfg(target_os = "linux")]
pub use linux::Linux as HostPlatform;
#[cfg(target_os = "macos")]
pub use macos::MacOs as HostPlatform;

/// Per-OS access to machine contexts and directory entries.
///
/// The context accessors run inside signal handlers: they must only read the
/// already captured state. No allocation, no locks, no type checks.
pub trait Platform {
    /// What the kernel passes as the third argument of an `SA_SIGINFO`
    /// handler.
    type Context;
    type DirEntry;

    fn stack_pointer(context: &Self::Context) -> usize;
    fn program_counter(context: &Self::Context) -> usize;

    /// The filesystem did not report a type, a stat is needed.
    fn is_unknown_type(entry: &Self::DirEntry) -> bool;
    fn is_directory(entry: &Self::DirEntry) -> bool;
}

pub type MachineContext = <HostPlatform as Platform>::Context;
pub type RawDirEntry = <HostPlatform as Platform>::DirEntry;

/// # Safety
/// `uap` must be the context pointer the kernel handed to an `SA_SIGINFO`
/// handler, and the handler must not have returned yet
#[inline]
pub unsafe fn context_from_raw<'a>(uap: *mut c_void) -> &'a MachineContext {
    // SAFETY: by contract
    unsafe { &*uap.cast::<MachineContext>() }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: OsString,
    pub is_directory: bool,
}

struct DirStream(*mut libc::DIR);

impl Drop for DirStream {
    fn drop(&mut self) {
        // SAFETY: opened by opendir, closed exactly once
        unsafe { libc::closedir(self.0) };
    }
}

/// List `path` without `.` and `..`. Entries whose type the filesystem does
/// not report are classified with a stat.
pub fn read_directory(path: &Path) -> io::Result<Vec<DirectoryEntry>> {
    let c_path = CString::new(path.as_os_str().as_bytes())?;
    // SAFETY: valid C string
    let dir = unsafe { libc::opendir(c_path.as_ptr()) };
    if dir.is_null() {
        return Err(io::Error::last_os_error());
    }
    let stream = DirStream(dir);

    let mut entries = Vec::new();
    loop {
        // SAFETY: stream is open
        let raw = unsafe { libc::readdir(stream.0) };
        if raw.is_null() {
            break;
        }
        // SAFETY: readdir returned a valid entry, valid until the next call
        let entry: &RawDirEntry = unsafe { &*raw };
        // SAFETY: d_name is NUL terminated
        let name = unsafe { CStr::from_ptr(entry.d_name.as_ptr()) };
        let name = name.to_bytes();
        if name == b"." || name == b".." {
            continue;
        }
        let name = OsString::from_vec(name.to_vec());

        let is_directory = classify(path, &name, entry);
        entries.push(DirectoryEntry { name, is_directory });
    }
    Ok(entries)
}

/// Whether `entry`, named `name` inside `dir`, is a directory. Falls back to
/// a stat when the entry carries no type.
fn classify(dir: &Path, name: &OsStr, entry: &RawDirEntry) -> bool {
    if !HostPlatform::is_unknown_type(entry) {
        return HostPlatform::is_directory(entry);
    }
    let full: PathBuf = dir.join(name);
    trace!("unknown entry type, stat {}", full.display());
    std::fs::metadata(&full).is_ok_and(|meta| meta.is_dir())
}
