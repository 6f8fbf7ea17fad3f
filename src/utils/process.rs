// Tue Jan 13 2026 - Alex

use libc::pid_t;
use serde::Serialize;
use std::fs;
use std::path::Path;

const MAX_PARENT_DEPTH: usize = 128;

pub struct ProcessUtils;

#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub pid: pid_t,
    pub name: String,
    pub cmdline: String,
}

/// The few `/proc/<pid>/stat` fields this crate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFields {
    pub parent: pid_t,
    pub vsize: u64,
    pub rss_pages: i64,
}

impl StatFields {
    /// Parses a stat line. The command name sits in parentheses and may
    /// contain spaces, so fields are counted from the last `)`.
    pub fn parse(contents: &str) -> Option<Self> {
        let close = contents.rfind(')')?;
        let fields: Vec<&str> = contents[close + 1..].split_whitespace().collect();
        Some(Self {
            parent: fields.get(1)?.parse().ok()?,
            vsize: fields.get(20)?.parse().ok()?,
            rss_pages: fields.get(21)?.parse().ok()?,
        })
    }
}

impl ProcessUtils {
    pub fn list_processes() -> Vec<ProcessInfo> {
        let entries = match fs::read_dir("/proc") {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Cannot list /proc: {}", e);
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<pid_t>().ok())
            .filter(|&pid| pid > 0)
            .filter_map(Self::process_info)
            .collect()
    }

    pub fn process_info(pid: pid_t) -> Option<ProcessInfo> {
        let base = Path::new("/proc").join(pid.to_string());
        let raw = fs::read(base.join("cmdline")).ok()?;
        let cmdline = String::from_utf8_lossy(&raw).replace('\0', " ").trim_end().to_string();
        let name = fs::read_to_string(base.join("comm"))
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default();
        Some(ProcessInfo { pid, name, cmdline })
    }

    /// Processes whose command line contains `pattern`, in `/proc` order.
    pub fn find_processes_by_name(pattern: &str) -> Vec<ProcessInfo> {
        Self::list_processes()
            .into_iter()
            .filter(|p| p.cmdline.contains(pattern))
            .collect()
    }

    pub fn process_exists(pid: pid_t) -> bool {
        Path::new("/proc").join(pid.to_string()).exists()
    }

    fn stat(pid: pid_t) -> Option<StatFields> {
        let contents = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        StatFields::parse(&contents)
    }

    pub fn parent_pid(pid: pid_t) -> Option<pid_t> {
        Self::stat(pid).map(|stat| stat.parent)
    }

    /// Walks up from `child` looking for `parent`, giving up after a fixed
    /// depth, at init, or at a self-parented entry.
    pub fn is_child_of(child: pid_t, parent: pid_t) -> bool {
        let mut pid = child;
        for _ in 0..MAX_PARENT_DEPTH {
            let Some(next) = Self::parent_pid(pid) else {
                return false;
            };
            if next == parent {
                return true;
            }
            if next <= 1 || next == pid {
                return false;
            }
            pid = next;
        }
        false
    }

    pub fn resident_memory_kb(pid: pid_t) -> Option<u64> {
        let stat = Self::stat(pid)?;
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if page_size <= 0 {
            return None;
        }
        Some(stat.rss_pages.max(0) as u64 * (page_size as u64 / 1024))
    }

    pub fn current_pid() -> pid_t {
        std::process::id() as pid_t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_with_spaces_in_name() {
        let line = "4242 (avm host (x)) S 17 4242 4242 0 -1 4194560 1 0 0 0 3 1 0 0 20 0 4 0 99 123456789 2048 18446744073709551615";
        let stat = StatFields::parse(line).unwrap();
        assert_eq!(stat.parent, 17);
        assert_eq!(stat.vsize, 123456789);
        assert_eq!(stat.rss_pages, 2048);
        assert!(StatFields::parse("12 (short) S").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_process() {
        let pid = ProcessUtils::current_pid();
        assert!(ProcessUtils::process_exists(pid));
        assert!(ProcessUtils::parent_pid(pid).is_some());
        assert!(ProcessUtils::resident_memory_kb(pid).unwrap_or(0) > 0);

        let info = ProcessUtils::process_info(pid).unwrap();
        assert!(!info.cmdline.is_empty());
        let first_arg = info.cmdline.split(' ').next().unwrap().to_string();
        assert!(ProcessUtils::find_processes_by_name(&first_arg).iter().any(|p| p.pid == pid));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_is_child_of() {
        let pid = ProcessUtils::current_pid();
        let parent = ProcessUtils::parent_pid(pid).unwrap();
        assert!(ProcessUtils::is_child_of(pid, parent));
        assert!(!ProcessUtils::is_child_of(pid, pid));
        assert!(!ProcessUtils::process_exists(-1));
    }
}
