//! Environment report for troubleshooting (`pplx debug`).

use crate::config::ConfigStore;
use crate::credentials::{Resolver, API_KEY_ENV_VAR};
use std::fmt;
use std::path::PathBuf;

/// Snapshot of everything that affects how pplx runs.
#[derive(Debug, Clone)]
pub struct Report {
    pub version: &'static str,
    pub os: String,
    pub shell: String,
    pub stdout_is_tty: bool,
    pub config_path: PathBuf,
    pub config_exists: bool,
    pub env_key_set: bool,
    /// Masked key and its source, or why no key was found.
    pub key_status: String,
}

/// Gather a report using `resolver` for the key.
pub fn gather(store: &ConfigStore, resolver: &Resolver<'_>, env_key_set: bool) -> Report {
    let config_exists = store.path().exists();
    let key_status = match resolver.resolve_with_source() {
        Ok((key, source)) => format!("{} (from {})", key.masked(), source.describe()),
        Err(e) => e.to_string(),
    };

    Report {
        version: env!("CARGO_PKG_VERSION"),
        os: get_os_info(),
        shell: get_shell(),
        stdout_is_tty: atty::is(atty::Stream::Stdout),
        config_path: store.path().to_path_buf(),
        config_exists,
        env_key_set,
        key_status,
    }
}

/// Gather a report for this process.
pub fn gather_current(store: &ConfigStore) -> Report {
    let env_key_set = std::env::var_os(API_KEY_ENV_VAR).is_some();
    gather(store, &Resolver::from_env(store), env_key_set)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        writeln!(f, "pplx version: {}", self.version)?;
        writeln!(f, "OS: {}", self.os)?;
        writeln!(f, "Shell: {}", self.shell)?;
        writeln!(f, "Stdout is a terminal: {}", yes_no(self.stdout_is_tty))?;
        writeln!(
            f,
            "Config file: {} (exists: {})",
            self.config_path.display(),
            yes_no(self.config_exists)
        )?;
        writeln!(f, "{} set: {}", API_KEY_ENV_VAR, yes_no(self.env_key_set))?;
        writeln!(f, "API key: {}", self.key_status)?;
        write!(f, "Unicode test: àáâãäåæçèéêëìíîïðñòóôõö÷øùúûüýþÿ")
    }
}

fn get_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "unknown".to_string())
}

fn get_os_info() -> String {
    #[cfg(unix)]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("uname").arg("-srm").output() {
            if output.status.success() {
                return String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
        }
    }

    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_report_masks_key() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"));
        store
            .save(&Config {
                api_key: "pplx-0123456789abcdef".to_string(),
            })
            .unwrap();

        let report = gather(&store, &Resolver::new(None, &store), false);
        let text = report.to_string();
        assert!(report.config_exists);
        assert!(text.contains("pplx-************cdef (from config file)"));
        assert!(!text.contains("0123456789"));
    }

    #[test]
    fn test_report_without_key() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"));

        let report = gather(&store, &Resolver::new(None, &store), false);
        assert!(report.key_status.contains("pplx configure"));
        assert!(!report.os.is_empty());
    }
}
