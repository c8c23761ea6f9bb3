use std::io;
use std::path::Path;
use std::process::Command;

#[allow(unused_parens)] // Removing the parenthesis makes the macro fail to parse
pub fn is_executable(m: &std::fs::Permissions) -> bool {
    cfg_match::cfg_match! {
        unix => ({
            use std::os::unix::fs::PermissionsExt;

            (m.mode() & 0o111) != 0
        }),
        _ => true
    }
}

/// Hands the process over to `binary` with the given argument vector.
///
/// On Unix this replaces the process image and only ever returns the exec
/// error. Elsewhere it spawns the binary, waits, and exits with the child's
/// status, so the caller observes the same contract: a return value is
/// always a failure to start the toolchain.
#[allow(unused_parens)]
pub fn exec(binary: &Path, args: &[String]) -> io::Error {
    cfg_match::cfg_match! {
        unix => ({
            use std::os::unix::process::CommandExt;

            Command::new(binary).args(args).exec()
        }),
        _ => (match Command::new(binary).args(args).status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(-1)),
            Err(e) => e,
        })
    }
}
