use super::Platform;

pub struct MacOs;

impl Platform for MacOs {
    type Context = libc::ucontext_t;
    type DirEntry = libc::dirent;

    // uc_mcontext is a pointer on Darwin, filled in by the kernel before the
    // handler runs.

    #[cfg(target_arch = "x86_64")]
    #[inline]
    fn stack_pointer(context: &Self::Context) -> usize {
        // SAFETY: valid for the lifetime of the context
        unsafe { (*context.uc_mcontext).__ss.__rsp as usize }
    }

    #[cfg(target_arch = "x86_64")]
    #[inline]
    fn program_counter(context: &Self::Context) -> usize {
        // SAFETY: valid for the lifetime of the context
        unsafe { (*context.uc_mcontext).__ss.__rip as usize }
    }

    #[cfg(target_arch = "aarch64")]
    #[inline]
    fn stack_pointer(context: &Self::Context) -> usize {
        // SAFETY: valid for the lifetime of the context
        unsafe { (*context.uc_mcontext).__ss.__sp as usize }
    }

    #[cfg(target_arch = "aarch64")]
    #[inline]
    fn program_counter(context: &Self::Context) -> usize {
        // SAFETY: valid for the lifetime of the context
        unsafe { (*context.uc_mcontext).__ss.__pc as usize }
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
