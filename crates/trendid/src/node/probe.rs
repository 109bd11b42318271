use crate::{RandSource, ThreadRandom};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Why a probe could not read the environment.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProbeError {
    #[error("{0}")]
    Unavailable(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A capability that reads some identifying bytes from the environment.
///
/// Probes never block and never retry; on failure the resolver moves on to
/// the next probe and ultimately to a random value.
pub trait IdentityProbe: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Returns identifying bytes, or why none could be read.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] when the environment does not provide the
    /// information this probe looks for.
    fn probe(&self) -> Result<Vec<u8>, ProbeError>;
}

/// Reads the hardware (MAC) addresses of all network interfaces from sysfs.
///
/// Interfaces are visited in name order and all-zero addresses (loopback,
/// tunnels) are skipped. The result is every interface name followed by its
/// address bytes, so two hosts only produce the same bytes if they share both.
#[derive(Clone, Debug)]
pub struct HardwareAddressProbe {
    root: PathBuf,
}

impl HardwareAddressProbe {
    /// Default sysfs location of network interfaces on Linux.
    pub const SYSFS_NET: &'static str = "/sys/class/net";

    pub fn new() -> Self {
        Self::with_root(Self::SYSFS_NET)
    }

    /// Reads interfaces from `root` instead of `/sys/class/net`. Each
    /// interface is a directory containing an `address` file.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_address(dir: &Path) -> Option<Vec<u8>> {
        let text = fs::read_to_string(dir.join("address")).ok()?;
        let bytes = text
            .trim()
            .split(':')
            .map(|octet| u8::from_str_radix(octet, 16))
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        (!bytes.is_empty() && bytes.iter().any(|&b| b != 0)).then_some(bytes)
    }
}

impl Default for HardwareAddressProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProbe for HardwareAddressProbe {
    fn name(&self) -> &'static str {
        "hardware-address"
    }

    fn probe(&self) -> Result<Vec<u8>, ProbeError> {
        let mut interfaces = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect::<Vec<_>>();
        interfaces.sort();

        let mut out = Vec::new();
        for dir in interfaces {
            let Some(address) = Self::read_address(&dir) else {
                continue;
            };
            if let Some(name) = dir.file_name() {
                out.extend_from_slice(name.as_encoded_bytes());
            }
            out.extend_from_slice(&address);
        }

        if out.is_empty() {
            return Err(ProbeError::Unavailable("no hardware address found"));
        }
        Ok(out)
    }
}

/// Returns the OS process id as 4 big-endian bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessIdProbe;

impl IdentityProbe for ProcessIdProbe {
    fn name(&self) -> &'static str {
        "process-id"
    }

    fn probe(&self) -> Result<Vec<u8>, ProbeError> {
        Ok(std::process::id().to_be_bytes().to_vec())
    }
}

/// Describes the running program as `<executable>@<host>`.
///
/// Used when no process id is available; the descriptor is long enough that
/// the resolver hashes it.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvironmentProbe;

impl EnvironmentProbe {
    /// `HOSTNAME` wins (the pod name under Kubernetes); otherwise the
    /// operating system is asked.
    fn host() -> Option<String> {
        Self::host_or_system(std::env::var("HOSTNAME").ok())
    }

    fn host_or_system(from_env: Option<String>) -> Option<String> {
        let trimmed = |host: String| Some(host.trim().to_owned()).filter(|h| !h.is_empty());
        from_env.and_then(trimmed).or_else(|| {
            hostname::get()
                .ok()
                .and_then(|host| trimmed(host.to_string_lossy().into_owned()))
        })
    }
}

impl IdentityProbe for EnvironmentProbe {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn probe(&self) -> Result<Vec<u8>, ProbeError> {
        let exe = std::env::current_exe()?;
        let host = Self::host().ok_or(ProbeError::Unavailable("host name not found"))?;
        Ok(format!("{}@{host}", exe.display()).into_bytes())
    }
}

/// Always succeeds with eight random bytes.
///
/// Handy as a stand-in for environment probes in tests, or to opt out of
/// environment probing entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomProbe<R = ThreadRandom> {
    rand: R,
}

impl<R: RandSource> RandomProbe<R> {
    pub fn new(rand: R) -> Self {
        Self { rand }
    }
}

impl<R> IdentityProbe for RandomProbe<R>
where
    R: RandSource + Send + Sync,
{
    fn name(&self) -> &'static str {
        "random"
    }

    fn probe(&self) -> Result<Vec<u8>, ProbeError> {
        Ok(self.rand.rand().to_be_bytes().to_vec())
    }
}
