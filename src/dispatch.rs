use std::io;
use std::path::{Path, PathBuf};

use crate::config::{ClangConfig, WrapperConfig};
use crate::helpers;
use crate::host::{self, HostOs};
use crate::lk;
use crate::log::{log, LogLevel};
use crate::os;

/// Sentinel enabling the address sanitizer. Spelled as a library path so
/// build files can pass it through linker-flag variables unmodified.
pub const ASAN_SENTINEL: &str = "-L/FLETCH_ASAN";

const ASAN_FLAG: &str = "-fsanitize=address";
const UBSAN_TRAP_FLAG: &str = "-fsanitize-undefined-trap-on-error";

const CLANG_DEFINE: &str = "-DFLETCH_CLANG";
const CLANG_LIBPATH: &str = "-L/FLETCH_CLANG";

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Driver {
    C,
    Cxx,
}

impl Driver {
    /// Picks the driver from `argv[0]`. The binary is installed twice, once
    /// under a C name and once under a C++ name, and build systems point
    /// `CC`/`CXX` at those.
    pub fn from_program_name(prg_name: &str) -> Driver {
        let base = Path::new(prg_name)
            .file_name()
            .and_then(|x| x.to_str())
            .unwrap_or(prg_name);

        if base.contains("++") || base.contains("cxx") {
            Driver::Cxx
        } else {
            Driver::C
        }
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Toolchain {
    Gnu,
    Clang,
    Arm,
    Arm64,
    Lk,
    LkArm,
    Mips,
    Nacl,
    Emscripten,
}

struct Sentinel {
    define: &'static str,
    libpath: &'static str,
    selects: Toolchain,
}

/// Selection priority. For each entry the define spelling is checked before
/// the library-path spelling; the first sentinel present anywhere in the
/// argument list wins.
const SENTINELS: &[Sentinel] = &[
    Sentinel {
        define: CLANG_DEFINE,
        libpath: CLANG_LIBPATH,
        selects: Toolchain::Clang,
    },
    Sentinel {
        define: "-DFLETCH_ARM",
        libpath: "-L/FLETCH_ARM",
        selects: Toolchain::Arm,
    },
    Sentinel {
        define: "-DFLETCH_ARM64",
        libpath: "-L/FLETCH_ARM64",
        selects: Toolchain::Arm64,
    },
    Sentinel {
        define: "-DFLETCH_LK",
        libpath: "-L/FLETCH_LK",
        selects: Toolchain::Lk,
    },
    Sentinel {
        define: "-DFLETCH_LKARM",
        libpath: "-L/FLETCH_LKARM",
        selects: Toolchain::LkArm,
    },
    Sentinel {
        define: "-DFLETCH_MIPS",
        libpath: "-L/FLETCH_MIPS",
        selects: Toolchain::Mips,
    },
    Sentinel {
        define: "-DFLETCH_NACL",
        libpath: "-L/FLETCH_NACL",
        selects: Toolchain::Nacl,
    },
    Sentinel {
        define: "-DFLETCH_EMSCRIPTEN",
        libpath: "-L/FLETCH_EMSCRIPTEN",
        selects: Toolchain::Emscripten,
    },
];

/// A fully resolved compiler invocation, ready to exec.
#[derive(Debug)]
pub struct Invocation {
    pub binary: PathBuf,
    pub args: Vec<String>,
}

impl core::fmt::Display for Invocation {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "'{}'", self.binary.display())?;
        for arg in &self.args {
            write!(f, " '{}'", arg)?;
        }
        Ok(())
    }
}

/// Applies the sanitizer rewrite and picks the toolchain, stripping
/// library-path sentinels from `args`. Touches nothing outside the argument
/// list; define sentinels stay in place since the real compiler accepts
/// them as ordinary defines.
pub fn select(args: &mut Vec<String>) -> Toolchain {
    if args.iter().any(|a| a == ASAN_SENTINEL) {
        args.retain(|a| a != ASAN_SENTINEL);

        // clang is the only toolchain here whose ubsan can trap in place
        // rather than link a runtime.
        let trap = args
            .iter()
            .any(|a| a == CLANG_DEFINE || a == CLANG_LIBPATH);

        let head = core::iter::once(ASAN_FLAG)
            .chain(trap.then_some(UBSAN_TRAP_FLAG))
            .map(String::from);

        args.splice(0..0, head);
    }

    for sentinel in SENTINELS {
        if args.iter().any(|a| a == sentinel.define) {
            return sentinel.selects;
        }

        if args.iter().any(|a| a == sentinel.libpath) {
            args.retain(|a| a != sentinel.libpath);
            return sentinel.selects;
        }
    }

    Toolchain::Gnu
}

/// Path of the bundled clang binary for a host OS.
pub fn clang_binary(cfg: &ClangConfig, root: &Path, host: HostOs, driver: Driver) -> PathBuf {
    let mut path = root.join(&cfg.root);
    path.push(host.clang_dir());
    path.push("bin");
    path.push(match driver {
        Driver::C => "clang",
        Driver::Cxx => "clang++",
    });
    path
}

/// Builds the final invocation for an argument list: sanitizer rewrite,
/// toolchain selection, and toolchain-specific argument transforms. Fails
/// on any resolution error without having started a process.
pub fn plan(driver: Driver, cfg: &WrapperConfig, mut args: Vec<String>) -> io::Result<Invocation> {
    let toolchain = select(&mut args);

    log!(LogLevel::Debug, "Selected {:?} toolchain", toolchain);

    let binary = match toolchain {
        Toolchain::Gnu => match driver {
            Driver::C => cfg.gnu.cc.clone(),
            Driver::Cxx => cfg.gnu.cxx.clone(),
        },
        Toolchain::Clang => {
            let host = host::host_os()?;

            if host == HostOs::MacOs {
                let sdk = host::macos_sdk_path()?;
                args.push("-isysroot".to_string());
                args.push(sdk.display().to_string());
            }

            clang_binary(&cfg.clang, &helpers::project_root(), host, driver)
        }
        Toolchain::Arm => match driver {
            Driver::C => cfg.arm.cc.clone(),
            Driver::Cxx => cfg.arm.cxx.clone(),
        },
        Toolchain::Arm64 => match driver {
            Driver::C => cfg.arm64.cc.clone(),
            Driver::Cxx => cfg.arm64.cxx.clone(),
        },
        Toolchain::Lk => match driver {
            Driver::C => cfg.lk.cc.clone(),
            Driver::Cxx => cfg.lk.cxx.clone(),
        },
        Toolchain::LkArm => {
            args.insert(0, lk::mcpu_flag(&cfg.lk, &helpers::project_root())?);

            match driver {
                Driver::C => cfg.lk.cc.clone(),
                Driver::Cxx => cfg.lk.cxx.clone(),
            }
        }
        Toolchain::Mips => {
            // The musl toolchain's libc is missing pieces the runtime
            // papers over when this is defined.
            args.insert(0, "-DNEED_PRINTF".to_string());

            match driver {
                Driver::C => cfg.mips.cc.clone(),
                Driver::Cxx => cfg.mips.cxx.clone(),
            }
        }
        Toolchain::Nacl => {
            args.insert(0, "-U__STRICT_ANSI__".to_string());

            cfg.nacl.bindir.join(match driver {
                Driver::C => "pnacl-clang",
                Driver::Cxx => "pnacl-clang++",
            })
        }
        Toolchain::Emscripten => cfg.emscripten.bindir.join(match driver {
            Driver::C => "emcc",
            Driver::Cxx => "em++",
        }),
    };

    let binary = helpers::resolve_program(&binary)?;

    Ok(Invocation { binary, args })
}

/// Logs the resolved command line and hands the process over to the
/// toolchain. Returns only when the exec itself fails.
pub fn run(invocation: Invocation) -> io::Result<()> {
    log!(LogLevel::Exec, "{}", invocation.binary.display());
    log!(LogLevel::Exec, "{}", invocation);

    let err = os::exec(&invocation.binary, &invocation.args);

    Err(io::Error::new(
        err.kind(),
        format!("Could not execute {}: {}", invocation.binary.display(), err),
    ))
}

#[cfg(test)]
mod test {
    use super::{clang_binary, plan, select, Driver, Toolchain};
    use crate::config::WrapperConfig;
    use crate::host::HostOs;
    use std::path::Path;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn no_sentinel_selects_gnu_and_keeps_args() {
        let cfg = WrapperConfig::default();
        let inv = plan(Driver::C, &cfg, args(&["-O2", "-c", "foo.c"])).unwrap();

        assert_eq!(inv.binary, Path::new("/usr/bin/gcc"));
        assert_eq!(inv.args, args(&["-O2", "-c", "foo.c"]));
    }

    #[test]
    fn driver_picks_cc_or_cxx_binary() {
        let cfg = WrapperConfig::default();

        let cxx = plan(Driver::Cxx, &cfg, args(&["-c", "foo.cc"])).unwrap();
        assert_eq!(cxx.binary, Path::new("/usr/bin/g++"));

        let arm_c = plan(Driver::C, &cfg, args(&["-DFLETCH_ARM", "-c", "foo.c"])).unwrap();
        assert_eq!(arm_c.binary, Path::new("/usr/bin/arm-linux-gnueabihf-gcc-4.8"));

        let arm_cxx = plan(Driver::Cxx, &cfg, args(&["-DFLETCH_ARM", "-c", "foo.cc"])).unwrap();
        assert_eq!(
            arm_cxx.binary,
            Path::new("/usr/bin/arm-linux-gnueabihf-g++-4.8")
        );
    }

    #[test]
    fn define_sentinel_stays_in_final_args() {
        let cfg = WrapperConfig::default();
        let inv = plan(Driver::C, &cfg, args(&["-DFLETCH_ARM", "-c", "foo.c"])).unwrap();

        assert_eq!(inv.args, args(&["-DFLETCH_ARM", "-c", "foo.c"]));
    }

    #[test]
    fn libpath_sentinel_is_stripped_from_final_args() {
        let cfg = WrapperConfig::default();
        let inv = plan(Driver::C, &cfg, args(&["-L/FLETCH_ARM", "-c", "foo.c"])).unwrap();

        assert_eq!(inv.args, args(&["-c", "foo.c"]));
    }

    #[test]
    fn both_arm_spellings_resolve_the_same_binary() {
        let cfg = WrapperConfig::default();

        let by_define = plan(Driver::C, &cfg, args(&["-DFLETCH_ARM", "-c", "foo.c"])).unwrap();
        let by_libpath = plan(Driver::C, &cfg, args(&["-L/FLETCH_ARM", "-c", "foo.c"])).unwrap();

        assert_eq!(by_define.binary, by_libpath.binary);
    }

    #[test]
    fn arm64_sentinels_select_arm64() {
        let mut a = args(&["-DFLETCH_ARM64", "-c", "foo.c"]);
        assert_eq!(select(&mut a), Toolchain::Arm64);

        let mut b = args(&["-L/FLETCH_ARM64", "-c", "foo.c"]);
        assert_eq!(select(&mut b), Toolchain::Arm64);
        assert_eq!(b, args(&["-c", "foo.c"]));
    }

    #[test]
    fn asan_sentinel_is_rewritten() {
        let mut a = args(&["-c", "-L/FLETCH_ASAN", "foo.c"]);
        let toolchain = select(&mut a);

        assert_eq!(toolchain, Toolchain::Gnu);
        assert_eq!(a, args(&["-fsanitize=address", "-c", "foo.c"]));
    }

    #[test]
    fn asan_with_clang_adds_trap_flag() {
        let mut a = args(&["-L/FLETCH_ASAN", "-DFLETCH_CLANG", "-c", "foo.c"]);
        let toolchain = select(&mut a);

        assert_eq!(toolchain, Toolchain::Clang);
        assert_eq!(
            a,
            args(&[
                "-fsanitize=address",
                "-fsanitize-undefined-trap-on-error",
                "-DFLETCH_CLANG",
                "-c",
                "foo.c"
            ])
        );
    }

    #[test]
    fn asan_without_clang_has_no_trap_flag() {
        let mut a = args(&["-L/FLETCH_ASAN", "-DFLETCH_ARM", "-c", "foo.c"]);
        select(&mut a);

        assert!(!a.iter().any(|x| x == "-fsanitize-undefined-trap-on-error"));
        assert!(!a.iter().any(|x| x == "-L/FLETCH_ASAN"));
    }

    #[test]
    fn priority_is_table_order_not_argument_order() {
        let mut a = args(&["-DFLETCH_MIPS", "-DFLETCH_ARM", "-c", "foo.c"]);
        assert_eq!(select(&mut a), Toolchain::Arm);

        let mut b = args(&["-DFLETCH_ARM", "-DFLETCH_MIPS", "-c", "foo.c"]);
        assert_eq!(select(&mut b), Toolchain::Arm);

        let mut c = args(&["-L/FLETCH_EMSCRIPTEN", "-DFLETCH_LK", "-c", "foo.c"]);
        assert_eq!(select(&mut c), Toolchain::Lk);
        // The losing library-path sentinel stays; only the winner's spelling
        // is stripped, matching single-sentinel invocations in practice.
    }

    #[test]
    fn mips_prepends_need_printf() {
        let cfg = WrapperConfig::default();
        let inv = plan(Driver::C, &cfg, args(&["-DFLETCH_MIPS", "-c", "foo.c"])).unwrap();

        assert_eq!(
            inv.args,
            args(&["-DNEED_PRINTF", "-DFLETCH_MIPS", "-c", "foo.c"])
        );
        assert!(inv.binary.ends_with("mips-openwrt-linux-musl-gcc"));
    }

    #[test]
    fn nacl_prepends_strict_ansi_undef() {
        let cfg = WrapperConfig::default();
        let inv = plan(Driver::Cxx, &cfg, args(&["-L/FLETCH_NACL", "-c", "foo.cc"])).unwrap();

        assert_eq!(inv.args, args(&["-U__STRICT_ANSI__", "-c", "foo.cc"]));
        assert!(inv.binary.ends_with("pnacl-clang++"));
    }

    #[test]
    fn emscripten_resolves_bindir_driver() {
        let cfg = WrapperConfig::default();

        let c = plan(Driver::C, &cfg, args(&["-DFLETCH_EMSCRIPTEN", "-c", "x.c"])).unwrap();
        assert!(c.binary.ends_with("emcc"));

        let cxx = plan(Driver::Cxx, &cfg, args(&["-DFLETCH_EMSCRIPTEN", "-c", "x.cc"])).unwrap();
        assert!(cxx.binary.ends_with("em++"));
    }

    #[test]
    fn lk_selects_embedded_gcc_without_cpu_probe() {
        let cfg = WrapperConfig::default();
        let inv = plan(Driver::C, &cfg, args(&["-DFLETCH_LK", "-c", "foo.c"])).unwrap();

        assert_eq!(inv.binary, Path::new("/usr/bin/arm-none-eabi-gcc"));
        assert_eq!(inv.args, args(&["-DFLETCH_LK", "-c", "foo.c"]));
    }

    #[test]
    fn lkarm_without_project_env_fails_before_exec() {
        let mut cfg = WrapperConfig::default();
        cfg.lk.project_env = "CCWRAP_TEST_UNSET_PROJECT_VAR".to_string();

        let err = plan(Driver::C, &cfg, args(&["-DFLETCH_LKARM", "-c", "foo.c"])).unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn clang_binary_paths_follow_host_os() {
        let cfg = WrapperConfig::default();

        assert_eq!(
            clang_binary(&cfg.clang, Path::new("/checkout"), HostOs::Linux, Driver::C),
            Path::new("/checkout/third_party/clang/linux/bin/clang")
        );
        assert_eq!(
            clang_binary(&cfg.clang, Path::new("/checkout"), HostOs::MacOs, Driver::Cxx),
            Path::new("/checkout/third_party/clang/mac/bin/clang++")
        );
    }

    #[test]
    fn driver_from_program_name() {
        assert_eq!(Driver::from_program_name("cc_wrapper"), Driver::C);
        assert_eq!(Driver::from_program_name("/x/y/cc_wrapper"), Driver::C);
        assert_eq!(Driver::from_program_name("cxx_wrapper"), Driver::Cxx);
        assert_eq!(Driver::from_program_name("/x/y/ccwrap++"), Driver::Cxx);
        assert_eq!(Driver::from_program_name("ccwrap"), Driver::C);
    }

    #[test]
    fn display_quotes_every_argument() {
        let cfg = WrapperConfig::default();
        let inv = plan(Driver::C, &cfg, args(&["-c", "a b.c"])).unwrap();

        assert_eq!(inv.to_string(), "'/usr/bin/gcc' '-c' 'a b.c'");
    }
}
