use std::fs::File;
use std::io::{self, Read as _};
use std::path::{Path, PathBuf};

use serde_derive::{Deserialize, Serialize};

use crate::helpers::{FormatArg, FormatSpec, FormatString};
use crate::log::{log, LogLevel};

/// Toolchain binary locations and LK project settings.
///
/// Every table and field is optional; unset fields keep the defaults below,
/// which describe the reference build environment. The file is named by
/// `CCWRAP_CONFIG` when that variable is set (and must then exist), else
/// `.ccwrap.toml` in the current directory when present.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WrapperConfig {
    pub gnu: GnuConfig,
    pub clang: ClangConfig,
    pub arm: ArmConfig,
    pub arm64: Arm64Config,
    pub lk: LkConfig,
    pub mips: MipsConfig,
    pub nacl: NaclConfig,
    pub emscripten: EmscriptenConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GnuConfig {
    pub cc: PathBuf,
    pub cxx: PathBuf,
}

impl Default for GnuConfig {
    fn default() -> Self {
        Self {
            cc: PathBuf::from("/usr/bin/gcc"),
            cxx: PathBuf::from("/usr/bin/g++"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClangConfig {
    /// Root of the bundled clang checkout. The per-OS directory and `bin`
    /// are appended at dispatch time. Relative paths resolve against
    /// `CCWRAP_ROOT`.
    pub root: PathBuf,
}

impl Default for ClangConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("third_party/clang"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArmConfig {
    pub cc: PathBuf,
    pub cxx: PathBuf,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            cc: PathBuf::from("/usr/bin/arm-linux-gnueabihf-gcc-4.8"),
            cxx: PathBuf::from("/usr/bin/arm-linux-gnueabihf-g++-4.8"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Arm64Config {
    pub cc: PathBuf,
    pub cxx: PathBuf,
}

impl Default for Arm64Config {
    fn default() -> Self {
        Self {
            cc: PathBuf::from("/usr/bin/aarch64-linux-gnu-gcc-4.8"),
            cxx: PathBuf::from("/usr/bin/aarch64-linux-gnu-g++-4.8"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct LkConfig {
    pub cc: PathBuf,
    pub cxx: PathBuf,
    /// Environment variable naming the active LK project.
    pub project_env: String,
    /// Template for the generated project config header; `{}` substitutes
    /// the project name. Relative paths resolve against `CCWRAP_ROOT`.
    pub config_header: FormatString,
}

impl Default for LkConfig {
    fn default() -> Self {
        Self {
            cc: PathBuf::from("/usr/bin/arm-none-eabi-gcc"),
            cxx: PathBuf::from("/usr/bin/arm-none-eabi-g++"),
            project_env: "LK_PROJECT".to_string(),
            config_header: FormatString {
                args: vec![FormatArg {
                    leading_text: "third_party/lk/build-".to_string(),
                    fmt: FormatSpec::Default,
                }],
                rest: "/config.h".to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MipsConfig {
    pub cc: PathBuf,
    pub cxx: PathBuf,
}

impl Default for MipsConfig {
    fn default() -> Self {
        Self {
            cc: PathBuf::from(
                "/tmp/toolchain-mips_34kc_gcc-5.1.0_musl-1.1.9/bin/mips-openwrt-linux-musl-gcc",
            ),
            cxx: PathBuf::from(
                "/tmp/toolchain-mips_34kc_gcc-5.1.0_musl-1.1.9/bin/mips-openwrt-linux-musl-g++",
            ),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NaclConfig {
    pub bindir: PathBuf,
}

impl Default for NaclConfig {
    fn default() -> Self {
        Self {
            bindir: PathBuf::from("/usr/local/nacl_sdk/pepper_45/toolchain/linux_pnacl/bin"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmscriptenConfig {
    pub bindir: PathBuf,
}

impl Default for EmscriptenConfig {
    fn default() -> Self {
        Self {
            bindir: PathBuf::from("/usr/local/emsdk_portable/emscripten/master"),
        }
    }
}

impl WrapperConfig {
    pub fn load() -> io::Result<WrapperConfig> {
        match std::env::var_os("CCWRAP_CONFIG") {
            Some(path) => Self::load_file(Path::new(&path), true),
            None => Self::load_file(Path::new(".ccwrap.toml"), false),
        }
    }

    fn load_file(path: &Path, required: bool) -> io::Result<WrapperConfig> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if !required && e.kind() == io::ErrorKind::NotFound => {
                return Ok(WrapperConfig::default())
            }
            Err(e) => {
                return Err(io::Error::new(
                    e.kind(),
                    format!("Could not open config file {}: {}", path.display(), e),
                ))
            }
        };

        let mut text = String::new();
        file.read_to_string(&mut text)?;

        let cfg = Self::parse(&text)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {}", path.display(), e)))?;

        log!(LogLevel::Verbose, "Using toolchain config {}", path.display());

        Ok(cfg)
    }

    fn parse(text: &str) -> Result<WrapperConfig, toml::de::Error> {
        toml::from_str(text)
    }
}
