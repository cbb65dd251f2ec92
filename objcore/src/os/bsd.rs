//! FreeBSD and NetBSD on amd64.
use super::Platform;

pub struct Bsd;

// machine/mcontext.h
#[cfg(target_os = "netbsd")]
const REG_RIP: usize = 21;
#[cfg(target_os = "netbsd")]
const REG_RSP: usize = 24;

impl Platform for Bsd {
    type Context = libc::ucontext_t;
    type DirEntry = libc::dirent;

    #[cfg(target_os = "freebsd")]
    #[inline]
    fn stack_pointer(context: &Self::Context) -> usize {
        context.uc_mcontext.mc_rsp as usize
    }

    #[cfg(target_os = "freebsd")]
    #[inline]
    fn program_counter(context: &Self::Context) -> usize {
        context.uc_mcontext.mc_rip as usize
    }

    #[cfg(target_os = "netbsd")]
    #[inline]
    fn stack_pointer(context: &Self::Context) -> usize {
        context.uc_mcontext.__gregs[REG_RSP] as usize
    }

    #[cfg(target_os = "netbsd")]
    #[inline]
    fn program_counter(context: &Self::Context) -> usize {
        context.uc_mcontext.__gregs[REG_RIP] as usize
    }

    #[inline]
    fn is_unknown_type(entry: &Self::DirEntry) -> bool {
        entry.d_type == libc::DT_UNKNOWN
    }

    #[inline]
    fn is_directory(entry: &Self::DirEntry) -> bool {
        entry.d_type == libc::DT_DIR
    }
}
