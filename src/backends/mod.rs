// Backend trait definitions and core types

pub mod connection_table;
pub mod process;

/// Backend priority ranking (higher = better)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackendPriority {
    Good = 2, // Solid implementation (/proc parsing)
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    Best = 4, // Optimal (native APIs)
}
