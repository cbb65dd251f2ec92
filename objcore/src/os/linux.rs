use super::Platform;

pub struct Linux;

impl Platform for Linux {
    type Context = libc::ucontext_t;
    type DirEntry = libc::dirent;

    #[cfg(target_arch = "x86_64")]
    #[inline]
    fn stack_pointer(context: &Self::Context) -> usize {
        context.uc_mcontext.gregs[libc::REG_RSP as usize] as usize
    }

    #[cfg(target_arch = "x86_64")]
    #[inline]
    fn program_counter(context: &Self::Context) -> usize {
        context.uc_mcontext.gregs[libc::REG_RIP as usize] as usize
    }

    #[cfg(target_arch = "aarch64")]
    #[inline]
    fn stack_pointer(context: &Self::Context) -> usize {
        context.uc_mcontext.sp as usize
    }

    #[cfg(target_arch = "aarch64")]
    #[inline]
    fn program_counter(context: &Self::Context) -> usize {
        context.uc_mcontext.pc as usize
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_registers_from_context() {
        // SAFETY: ucontext_t is plain old data
        let mut context: libc::ucontext_t = unsafe { std::mem::zeroed() };
        #[cfg(target_arch = "x86_64")]
        {
            context.uc_mcontext.gregs[libc::REG_RSP as usize] = 0x7fff_0000;
            context.uc_mcontext.gregs[libc::REG_RIP as usize] = 0x40_1000;
        }
        #[cfg(target_arch = "aarch64")]
        {
            context.uc_mcontext.sp = 0x7fff_0000;
            context.uc_mcontext.pc = 0x40_1000;
        }
        assert_eq!(Linux::stack_pointer(&context), 0x7fff_0000);
        assert_eq!(Linux::program_counter(&context), 0x40_1000);
    }
}
