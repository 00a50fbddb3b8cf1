use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tracing::debug;

use crate::error::{ProbeError, ProbeResult};
use crate::identity::DiagnosticCandidate;

const WINDOWS_INSTALL_PATHS: &[&str] = &[
    r"C:\Program Files\smartmontools\bin\smartctl.exe",
    r"C:\Program Files\smartmontools\smartctl.exe",
    r"C:\Program Files (x86)\smartmontools\bin\smartctl.exe",
    r"C:\Program Files (x86)\smartmontools\smartctl.exe",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// `smartctl -a`: identity plus every health section.
    Full,
    /// `smartctl -i`: identity only, enough for candidate matching.
    IdentityOnly,
}

impl QueryMode {
    fn flag(self) -> &'static str {
        match self {
            QueryMode::Full => "-a",
            QueryMode::IdentityOnly => "-i",
        }
    }
}

/// Source of raw SMART documents for a device handle.
pub trait DiagnosticSource {
    fn query(&self, handle: &str, hint: Option<&str>, mode: QueryMode) -> ProbeResult<Value>;

    /// Locally visible diagnostic targets. Failures yield an empty list.
    fn scan_candidates(&self) -> Vec<DiagnosticCandidate>;
}

/// Location of the smartctl executable, resolved once per process and passed
/// explicitly to everything that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartctlTool {
    path: PathBuf,
}

impl SmartctlTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the executable from an explicit path, then `PATH`, then the
    /// default smartmontools install locations on Windows.
    pub fn discover(explicit: Option<&Path>) -> Option<Self> {
        if let Some(path) = explicit {
            return path.is_file().then(|| Self::new(path));
        }
        if let Ok(path) = which::which("smartctl") {
            return Some(Self::new(path));
        }
        if cfg!(windows) {
            return WINDOWS_INSTALL_PATHS
                .iter()
                .map(Path::new)
                .find(|path| path.is_file())
                .map(Self::new);
        }
        None
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First line of `smartctl --version`, if the tool runs at all.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.path).arg("--version").output().ok()?;
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone)]
pub struct SmartctlSource {
    tool: SmartctlTool,
}

impl SmartctlSource {
    pub fn new(tool: SmartctlTool) -> Self {
        Self { tool }
    }
}

impl DiagnosticSource for SmartctlSource {
    fn query(&self, handle: &str, hint: Option<&str>, mode: QueryMode) -> ProbeResult<Value> {
        let mut command = Command::new(self.tool.path());
        command.args([mode.flag(), "-j"]);
        if let Some(hint) = hint {
            command.args(["-d", hint]);
        }
        command.arg(handle);
        debug!("running {:?}", command);

        let output = command.output().map_err(|err| {
            ProbeError::SourceUnavailable(format!(
                "failed to run {}: {}",
                self.tool.path().display(),
                err
            ))
        })?;

        // The exit status is a bitmask of drive conditions; any JSON on stdout is usable.
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(ProbeError::SourceUnavailable(if stderr.is_empty() {
                format!("smartctl failed for {handle}")
            } else {
                stderr.to_string()
            }));
        }
        parse_document(&stdout, handle)
    }

    fn scan_candidates(&self) -> Vec<DiagnosticCandidate> {
        match Command::new(self.tool.path()).arg("--scan-open").output() {
            Ok(output) => parse_scan_open(&String::from_utf8_lossy(&output.stdout)),
            Err(err) => {
                debug!("smartctl --scan-open failed: {}", err);
                Vec::new()
            }
        }
    }
}

pub fn parse_document(text: &str, handle: &str) -> ProbeResult<Value> {
    serde_json::from_str(text).map_err(|err| {
        ProbeError::MalformedSource(format!(
            "smartctl returned non-JSON output for {handle}: {err}"
        ))
    })
}

/// Parses `smartctl --scan-open` lines such as
/// `/dev/sda -d sat # /dev/sda [SAT], ATA device`.
pub fn parse_scan_open(text: &str) -> Vec<DiagnosticCandidate> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let parts = line.split_whitespace().collect::<Vec<_>>();
            match parts.as_slice() {
                [handle, "-d", hint, ..] => Some(DiagnosticCandidate::new(*handle, Some(*hint))),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{parse_document, parse_scan_open, SmartctlTool};
    use crate::error::ProbeError;
    use crate::identity::DiagnosticCandidate;

    #[test]
    fn parses_scan_open_output() {
        let text = include_str!("../../../fixtures/smartctl-scan-open.txt");
        let candidates = parse_scan_open(text);
        assert_eq!(
            candidates,
            vec![
                DiagnosticCandidate::new("/dev/sda", Some("sat")),
                DiagnosticCandidate::new("/dev/nvme0", Some("nvme")),
                DiagnosticCandidate::new("/dev/csmi0,0", Some("ata")),
            ]
        );
    }

    #[test]
    fn scan_open_ignores_noise() {
        assert!(parse_scan_open("").is_empty());
        assert!(parse_scan_open("# comment only\n\n/dev/sdb\n/dev/sdc -x sat\n").is_empty());
    }

    #[test]
    fn non_json_output_is_malformed() {
        let err = parse_document("smartctl 7.4 ... not json", "/dev/sda").unwrap_err();
        assert!(matches!(err, ProbeError::MalformedSource(_)));

        let doc = parse_document("{\"smart_status\":{\"passed\":true}}", "/dev/sda")
            .expect("valid json");
        assert_eq!(doc["smart_status"]["passed"], true);
    }

    #[test]
    fn explicit_missing_path_is_not_discovered() {
        let missing = Path::new("/definitely/not/here/smartctl");
        assert_eq!(SmartctlTool::discover(Some(missing)), None);
    }

    #[test]
    fn explicit_existing_path_is_used() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = dir.path().join("smartctl");
        std::fs::write(&fake, b"").expect("write fake tool");
        let tool = SmartctlTool::discover(Some(&fake)).expect("tool");
        assert_eq!(tool.path(), fake.as_path());
    }
}
