use std::io;
use std::path::PathBuf;
use std::process::Command;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
}

impl HostOs {
    /// Directory name of the per-OS bundled clang tree.
    pub fn clang_dir(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::MacOs => "mac",
        }
    }
}

#[allow(unused_parens)] // cfg_match is a macro that exists
pub fn host_os() -> io::Result<HostOs> {
    cfg_match::cfg_match! {
        unix => ({
            let kernel = Command::new("uname").arg("-s").output()?;

            if !kernel.status.success() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "Could not determine host system name (executing `uname -s` failed)",
                ));
            }

            let kernel = core::str::from_utf8(&kernel.stdout)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
                .trim();

            match kernel {
                "Linux" => Ok(HostOs::Linux),
                "Darwin" => Ok(HostOs::MacOs),
                x => Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("No bundled toolchain for host system {}", x),
                )),
            }
        }),
        _ => (Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Cannot determine the host system on this platform",
        )))
    }
}

/// Queries the active macOS SDK root via `xcrun`. A failing query is fatal;
/// clang cannot build anything useful without a sysroot there.
pub fn macos_sdk_path() -> io::Result<PathBuf> {
    let sdk = Command::new("xcrun").arg("--show-sdk-path").output()?;

    if !sdk.status.success() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "Could not determine the SDK root (executing `xcrun --show-sdk-path` failed)",
        ));
    }

    let sdk = core::str::from_utf8(&sdk.stdout)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        .trim();

    Ok(PathBuf::from(sdk))
}
