use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Windows,
    Linux,
    MacOs,
    Unknown,
}

impl PlatformKind {
    /// Platform this binary was built for.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` style name.
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => PlatformKind::Windows,
            "linux" => PlatformKind::Linux,
            "macos" => PlatformKind::MacOs,
            _ => PlatformKind::Unknown,
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformKind::Windows => "Windows",
            PlatformKind::Linux => "Linux",
            PlatformKind::MacOs => "macOS",
            PlatformKind::Unknown => "unknown platform",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_names() {
        assert_eq!(PlatformKind::from_os("windows"), PlatformKind::Windows);
        assert_eq!(PlatformKind::from_os("linux"), PlatformKind::Linux);
        assert_eq!(PlatformKind::from_os("macos"), PlatformKind::MacOs);
        assert_eq!(PlatformKind::from_os("freebsd"), PlatformKind::Unknown);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn current_on_linux() {
        assert_eq!(PlatformKind::current(), PlatformKind::Linux);
    }
}
