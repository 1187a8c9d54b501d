//! Controlling-terminal mode snapshot
//!
//! Hidden prompts switch echo off until the read returns. Exiting while a
//! read is still blocked skips that restore, so the command captures the
//! mode up front and puts it back on the cancel path.

#[cfg(unix)]
mod imp {
    use std::fs::File;
    use std::os::unix::io::AsRawFd;

    pub struct TerminalState {
        pub(super) tty: File,
        pub(super) saved: libc::termios,
    }

    impl TerminalState {
        /// `None` when there is no controlling terminal
        pub fn capture() -> Option<Self> {
            let tty = File::open("/dev/tty").ok()?;
            // SAFETY: termios is plain data; tcgetattr overwrites it on success
            let mut saved: libc::termios = unsafe { std::mem::zeroed() };
            // SAFETY: the descriptor stays open for as long as `tty` lives
            if unsafe { libc::tcgetattr(tty.as_raw_fd(), &mut saved) } != 0 {
                return None;
            }
            Some(Self { tty, saved })
        }

        pub fn restore(&self) {
            // SAFETY: same descriptor and a termios filled by tcgetattr
            let rc = unsafe { libc::tcsetattr(self.tty.as_raw_fd(), libc::TCSANOW, &self.saved) };
            if rc != 0 {
                tracing::warn!("Failed to restore terminal mode");
            }
        }
    }
}

#[cfg(not(unix))]
mod imp {
    pub struct TerminalState;

    impl TerminalState {
        pub fn capture() -> Option<Self> {
            None
        }

        pub fn restore(&self) {}
    }
}

pub use imp::TerminalState;

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_restore_puts_echo_back() {
        // Headless runs have no controlling terminal
        let Some(state) = TerminalState::capture() else {
            return;
        };
        let fd = state.tty.as_raw_fd();

        let mut muted = state.saved;
        muted.c_lflag &= !libc::ECHO;
        assert_eq!(unsafe { libc::tcsetattr(fd, libc::TCSANOW, &muted) }, 0);

        state.restore();

        let mut now: libc::termios = unsafe { std::mem::zeroed() };
        assert_eq!(unsafe { libc::tcgetattr(fd, &mut now) }, 0);
        assert_eq!(now.c_lflag & libc::ECHO, state.saved.c_lflag & libc::ECHO);
    }
}
