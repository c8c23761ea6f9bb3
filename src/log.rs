use std::sync::atomic::{AtomicUsize, Ordering};

static LOG_LEVEL: AtomicUsize = AtomicUsize::new(LogLevel::Exec as usize);

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off,
    Fatal,
    Error,
    Warning,
    Exec,
    Verbose,
    Debug,
}

#[inline]
pub fn current_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) & (!0 >> 1) {
        0 => LogLevel::Off,
        1 => LogLevel::Fatal,
        2 => LogLevel::Error,
        3 => LogLevel::Warning,
        4 => LogLevel::Exec,
        5 => LogLevel::Verbose,
        6 => LogLevel::Debug,
        val => panic!("Unknown logging level {}", val),
    }
}

#[inline]
pub fn set_logging_level(level: LogLevel) {
    let val = level as usize;
    let _ = LOG_LEVEL.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
        Some((prev & !(!0 >> 1)) | val)
    });
}

#[inline]
pub fn use_term_formatting(use_term_fmt: bool) {
    let _ = LOG_LEVEL.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
        Some((prev & (!0 >> 1)) | ((use_term_fmt as usize) << (usize::BITS - 1)))
    });
}

impl core::str::FromStr for LogLevel {
    type Err = ();

    fn from_str(x: &str) -> Result<Self, ()> {
        match x {
            "off" => Ok(LogLevel::Off),
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "exec" => Ok(LogLevel::Exec),
            "verbose" => Ok(LogLevel::Verbose),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(()),
        }
    }
}

fn print_color_code(n: u8, f: &mut core::fmt::Formatter, use_term_fmt: bool) -> core::fmt::Result {
    if use_term_fmt {
        let code = if n < 8 { 30 + n } else { 90 + (n & 7) };
        f.write_fmt(format_args!("\x1B[{:02}m", code))
    } else {
        Ok(())
    }
}

fn print_reset(f: &mut core::fmt::Formatter, use_term_fmt: bool) -> core::fmt::Result {
    if use_term_fmt {
        f.write_str("\x1B[0m")
    } else {
        Ok(())
    }
}

impl core::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.display_prefix(f, (LOG_LEVEL.load(Ordering::Relaxed) & !(!0 >> 1)) != 0)
    }
}

impl LogLevel {
    pub fn display_prefix(
        &self,
        f: &mut core::fmt::Formatter,
        use_term_fmt: bool,
    ) -> core::fmt::Result {
        match self {
            LogLevel::Off => panic!("Logging at level `Off` is forbidden"),
            LogLevel::Fatal => {
                f.write_str("[")?;
                print_color_code(1, f, use_term_fmt)?;
                f.write_str("FATAL")?;
                print_reset(f, use_term_fmt)?;
                f.write_str("] ")
            }
            LogLevel::Error => {
                f.write_str("[")?;
                print_color_code(9, f, use_term_fmt)?;
                f.write_str("ERROR")?;
                print_reset(f, use_term_fmt)?;
                f.write_str("] ")
            }
            LogLevel::Warning => {
                f.write_str("[")?;
                print_color_code(11, f, use_term_fmt)?;
                f.write_str("WARN")?;
                print_reset(f, use_term_fmt)?;
                f.write_str("] ")
            }
            LogLevel::Exec => f.write_str("[EXEC] "),
            LogLevel::Verbose => Ok(()),
            LogLevel::Debug => {
                f.write_str("[")?;
                print_color_code(7, f, use_term_fmt)?;
                f.write_str("DEBUG")?;
                print_reset(f, use_term_fmt)?;
                f.write_str("] ")
            }
        }
    }
}

#[doc(hidden)]
#[inline]
pub fn __log_print(level: LogLevel, f: core::fmt::Arguments) {
    use std::io::Write;
    if level <= current_level() {
        writeln!(std::io::stderr(), "{}{}", level, f).expect("Error writing to STDERR stream")
    }
}

macro_rules! log{
    ($level:expr, $($fmt:tt)*) => {
        $crate::log::__log_print($level, ::core::format_args!($($fmt)*))
    };
}

pub(crate) use log;

#[cfg(test)]
mod test {
    use super::LogLevel;

    #[test]
    fn level_order_is_increasing_verbosity() {
        assert!(LogLevel::Off < LogLevel::Fatal);
        assert!(LogLevel::Warning < LogLevel::Exec);
        assert!(LogLevel::Exec < LogLevel::Verbose);
        assert!(LogLevel::Verbose < LogLevel::Debug);
    }

    #[test]
    fn level_names_parse() {
        assert_eq!("exec".parse::<LogLevel>(), Ok(LogLevel::Exec));
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("loud".parse::<LogLevel>(), Err(()));
    }
}
