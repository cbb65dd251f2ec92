use std::{
    ffi::{c_int, c_void},
    io, mem, ptr,
    sync::atomic::{AtomicUsize, Ordering},
};

use log::debug;

use super::{HostPlatform, Platform, context_from_raw};

static LAST_STACK_POINTER: AtomicUsize = AtomicUsize::new(0);
static LAST_PROGRAM_COUNTER: AtomicUsize = AtomicUsize::new(0);
static SAMPLES: AtomicUsize = AtomicUsize::new(0);

/// Registers of the thread a recorded signal interrupted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ContextSample {
    pub stack_pointer: usize,
    pub program_counter: usize,
    /// Signals recorded so far, including this one.
    pub count: usize,
}

extern "C" fn record_context(
    _signal: c_int,
    _info: *mut libc::siginfo_t,
    uap: *mut c_void,
) {
    // SAFETY: installed with SA_SIGINFO
    let context = unsafe { context_from_raw(uap) };
    LAST_STACK_POINTER
        .store(HostPlatform::stack_pointer(context), Ordering::Relaxed);
    LAST_PROGRAM_COUNTER
        .store(HostPlatform::program_counter(context), Ordering::Relaxed);
    SAMPLES.fetch_add(1, Ordering::Release);
}

/// Records the interrupted stack pointer and program counter whenever its
/// signal arrives. Samples are process wide, shared by every recorder.
#[derive(Debug)]
pub struct ContextRecorder {
    signal: c_int,
}

impl ContextRecorder {
    pub fn install(signal: c_int) -> io::Result<Self> {
        // SAFETY: sigaction is plain old data, zero is a valid empty action
        let mut action: libc::sigaction = unsafe { mem::zeroed() };
        let handler: extern "C" fn(c_int, *mut libc::siginfo_t, *mut c_void) =
            record_context;
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = libc::SA_SIGINFO | libc::SA_RESTART;
        // SAFETY: valid pointers
        let rc = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, ptr::null_mut())
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        debug!("context recorder installed for signal {signal}");
        Ok(Self { signal })
    }

    #[inline]
    pub fn signal(&self) -> c_int {
        self.signal
    }

    /// The most recent sample, `None` before the first recorded signal.
    pub fn last_sample(&self) -> Option<ContextSample> {
        let count = SAMPLES.load(Ordering::Acquire);
        (count > 0).then(|| ContextSample {
            stack_pointer: LAST_STACK_POINTER.load(Ordering::Relaxed),
            program_counter: LAST_PROGRAM_COUNTER.load(Ordering::Relaxed),
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_the_interrupted_thread() {
        let recorder =
            ContextRecorder::install(libc::SIGUSR2).expect("sigaction");
        assert_eq!(recorder.signal(), libc::SIGUSR2);
        let before = recorder.last_sample().map_or(0, |s| s.count);

        let marker = 0u64;
        // SAFETY: handler installed above
        assert_eq!(unsafe { libc::raise(libc::SIGUSR2) }, 0);

        let sample = recorder.last_sample().expect("one sample");
        assert!(sample.count > before);
        assert_ne!(sample.program_counter, 0);
        let here = &raw const marker as usize;
        assert!(sample.stack_pointer.abs_diff(here) < 1024 * 1024);
    }

    #[test]
    fn invalid_signal_is_rejected() {
        let err = ContextRecorder::install(-1).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }
}
