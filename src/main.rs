use std::io::{self, IsTerminal as _};

mod config;
mod dispatch;
mod helpers;
mod host;
mod lk;
mod log;
mod os;

use log::LogLevel;

fn main() {
    let mut args = std::env::args();

    let prg_name = args.next().unwrap_or_else(|| "ccwrap".to_string());

    log::use_term_formatting(std::io::stderr().is_terminal());

    if let Some(level) = std::env::var_os("CCWRAP_LOG") {
        match level.to_str().and_then(|x| x.parse::<LogLevel>().ok()) {
            Some(level) => log::set_logging_level(level),
            None => {
                eprintln!("{}: Unknown log level {:?}", prg_name, level);
                std::process::exit(1);
            }
        }
    }

    match real_main(&prg_name, args.collect()) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("{}: {}", prg_name, e);

            std::process::exit(1);
        }
    }
}

fn real_main(prg_name: &str, args: Vec<String>) -> io::Result<()> {
    // Real compiler invocations always carry at least one flag or input
    // file, so these cannot collide with anything a build system passes.
    match args.first().map(|x| &**x) {
        Some("--help") => {
            print_help(prg_name);
            return Ok(());
        }
        Some("--version") => {
            print_version();
            return Ok(());
        }
        _ => {}
    }

    let driver = dispatch::Driver::from_program_name(prg_name);
    let cfg = config::WrapperConfig::load()?;

    let invocation = dispatch::plan(driver, &cfg, args)?;

    dispatch::run(invocation)
}

fn print_help(prg_name: &str) {
    println!("Usage: {} [COMPILER ARGS...]", prg_name);
    println!("Compiler wrapper selecting a toolchain from sentinel flags");
    println!();
    println!("Install under a name containing `++` or `cxx` to wrap the C++ driver.");
    println!("Recognized sentinels (exact match, anywhere in the argument list):");
    println!("\t-L/FLETCH_ASAN\t\tenable the address sanitizer");
    println!("\t-DFLETCH_CLANG\t\tbundled clang (also -L/FLETCH_CLANG)");
    println!("\t-DFLETCH_ARM\t\tARM cross gcc (also -L/FLETCH_ARM)");
    println!("\t-DFLETCH_ARM64\t\tARM64 cross gcc (also -L/FLETCH_ARM64)");
    println!("\t-DFLETCH_LK\t\tLK embedded gcc (also -L/FLETCH_LK)");
    println!("\t-DFLETCH_LKARM\t\tLK embedded gcc, CPU from project config (also -L/FLETCH_LKARM)");
    println!("\t-DFLETCH_MIPS\t\tMIPS cross gcc (also -L/FLETCH_MIPS)");
    println!("\t-DFLETCH_NACL\t\tPNaCl clang (also -L/FLETCH_NACL)");
    println!("\t-DFLETCH_EMSCRIPTEN\tEmscripten (also -L/FLETCH_EMSCRIPTEN)");
    println!();
    println!("Toolchain paths come from the config file named by CCWRAP_CONFIG");
    println!("(default .ccwrap.toml), with built-in defaults otherwise.");
}

fn print_version() {
    println!("ccwrap v{}", env!("CARGO_PKG_VERSION"));
}
