// Tue Jan 13 2026 - Alex

use bitflags::bitflags;
use std::fmt;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Protection: u8 {
        const READ = 0b001;
        const WRITE = 0b010;
        const EXECUTE = 0b100;
    }
}

impl Protection {
    /// Reads the `rwx` prefix of a maps permission field such as `r-xp`.
    pub fn from_perms(perms: &str) -> Self {
        let bytes = perms.as_bytes();
        let mut protection = Self::empty();
        if bytes.first() == Some(&b'r') {
            protection |= Self::READ;
        }
        if bytes.get(1) == Some(&b'w') {
            protection |= Self::WRITE;
        }
        if bytes.get(2) == Some(&b'x') {
            protection |= Self::EXECUTE;
        }
        protection
    }

    pub fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_execute(self) -> bool {
        self.contains(Self::EXECUTE)
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.can_read() { 'r' } else { '-' },
            if self.can_write() { 'w' } else { '-' },
            if self.can_execute() { 'x' } else { '-' },
        )
    }
}
