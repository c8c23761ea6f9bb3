use std::io;
use std::path::Path;

use crate::config::LkConfig;

/// Derives the `-mcpu=` flag for an LK ARM build from the project's
/// generated config header, e.g. `ARM_CPU_CORTEX_A7` becomes
/// `-mcpu=cortex-a7`. The active project is named by the environment
/// variable in `cfg.project_env`.
pub fn mcpu_flag(cfg: &LkConfig, root: &Path) -> io::Result<String> {
    let project = std::env::var(&cfg.project_env).map_err(|_| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "{} must be set in the environment to the active LK project",
                cfg.project_env
            ),
        )
    })?;

    mcpu_flag_for_project(cfg, root, &project)
}

fn mcpu_flag_for_project(cfg: &LkConfig, root: &Path, project: &str) -> io::Result<String> {
    let header = root.join(cfg.config_header.render(project)?);

    let contents = std::fs::read_to_string(&header).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Could not read LK config header {}: {}", header.display(), e),
        )
    })?;

    let cpu = find_cpu_token(&contents).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("No ARM_CPU_* token in {}", header.display()),
        )
    })?;

    Ok(format!("-mcpu={}", cpu))
}

/// Scans header text for the first `ARM_CPU_<FAMILY>` token and renders the
/// family the way gcc spells it: lowercase, `_` mapped to `-`.
fn find_cpu_token(contents: &str) -> Option<String> {
    const PREFIX: &str = "ARM_CPU_";

    let mut rest = contents;

    while let Some(pos) = rest.find(PREFIX) {
        rest = &rest[pos + PREFIX.len()..];

        let len = rest
            .bytes()
            .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
            .count();

        if len != 0 {
            return Some(rest[..len].to_ascii_lowercase().replace('_', "-"));
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::{find_cpu_token, mcpu_flag_for_project};
    use crate::config::LkConfig;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ccwrap-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn cortex_a7_token_becomes_mcpu_flag() {
        assert_eq!(
            find_cpu_token("#define ARM_CPU_CORTEX_A7 1\n"),
            Some("cortex-a7".to_string())
        );
    }

    #[test]
    fn cortex_m4_token_becomes_mcpu_flag() {
        assert_eq!(
            find_cpu_token("// lk\n#define WITH_SMP 0\n#define ARM_CPU_CORTEX_M4 1\n"),
            Some("cortex-m4".to_string())
        );
    }

    #[test]
    fn first_token_wins() {
        assert_eq!(
            find_cpu_token("#define ARM_CPU_CORTEX_M0 1\n#define ARM_CPU_CORTEX_A9 1\n"),
            Some("cortex-m0".to_string())
        );
    }

    #[test]
    fn no_token_is_none() {
        assert_eq!(find_cpu_token("#define WITH_SMP 0\n"), None);
        assert_eq!(find_cpu_token("#define ARM_CPU_ \n"), None);
    }

    #[test]
    fn header_read_yields_flag() {
        let root = scratch_dir("lk-header");
        std::fs::create_dir_all(root.join("third_party/lk/build-disco")).unwrap();
        std::fs::write(
            root.join("third_party/lk/build-disco/config.h"),
            "#define ARM_CPU_CORTEX_A7 1\n",
        )
        .unwrap();

        let flag = mcpu_flag_for_project(&LkConfig::default(), &root, "disco").unwrap();

        assert_eq!(flag, "-mcpu=cortex-a7");
    }

    #[test]
    fn header_without_token_fails() {
        let root = scratch_dir("lk-no-token");
        std::fs::create_dir_all(root.join("third_party/lk/build-disco")).unwrap();
        std::fs::write(
            root.join("third_party/lk/build-disco/config.h"),
            "#define WITH_SMP 0\n",
        )
        .unwrap();

        let err = mcpu_flag_for_project(&LkConfig::default(), &root, "disco").unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn missing_header_fails() {
        let root = scratch_dir("lk-missing");

        assert!(mcpu_flag_for_project(&LkConfig::default(), &root, "nonesuch").is_err());
    }
}
