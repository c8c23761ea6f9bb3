use std::io;
use std::path::{Component, Path, PathBuf};

/// A path template for generated files, e.g. `third_party/lk/build-{}/config.h`.
///
/// `{}` and `{project}` substitute the active project name; `{{` and `}}` are
/// literal braces.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct FormatString {
    pub args: Vec<FormatArg>,
    pub rest: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct FormatArg {
    pub leading_text: String,
    pub fmt: FormatSpec,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum FormatSpec {
    EscapeLeftBrace,  // {{
    EscapeRightBrace, // }}
    Default,          // {}
    Keyed(String),    // {project}
}

impl core::fmt::Display for FormatString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for arg in &self.args {
            f.write_str(&arg.leading_text)?;
            match &arg.fmt {
                FormatSpec::EscapeLeftBrace => f.write_str("{{")?,
                FormatSpec::EscapeRightBrace => f.write_str("}}")?,
                FormatSpec::Default => f.write_str("{}")?,
                FormatSpec::Keyed(key) => f.write_fmt(format_args!("{{{}}}", key))?,
            }
        }
        f.write_str(&self.rest)
    }
}

impl FormatString {
    pub fn render(&self, project: &str) -> io::Result<String> {
        let mut out = String::new();
        for arg in &self.args {
            out.push_str(&arg.leading_text);
            match &arg.fmt {
                FormatSpec::EscapeLeftBrace => out.push('{'),
                FormatSpec::EscapeRightBrace => out.push('}'),
                FormatSpec::Default => out.push_str(project),
                FormatSpec::Keyed(key) if key == "project" => out.push_str(project),
                FormatSpec::Keyed(key) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Unknown key {} in path template", key),
                    ))
                }
            }
        }
        out.push_str(&self.rest);
        Ok(out)
    }
}

impl core::str::FromStr for FormatString {
    type Err = String;

    fn from_str(mut x: &str) -> Result<Self, String> {
        let mut args = Vec::new();

        loop {
            let brace = match x.find(['{', '}']) {
                Some(pos) => pos,
                None => break,
            };

            let leading_text = x[..brace].to_string();
            let rest = &x[brace + 1..];

            let fmt = match (x.as_bytes()[brace], rest.as_bytes().first().copied()) {
                (b'{', Some(b'{')) => {
                    x = &rest[1..];
                    FormatSpec::EscapeLeftBrace
                }
                (b'}', Some(b'}')) => {
                    x = &rest[1..];
                    FormatSpec::EscapeRightBrace
                }
                (b'}', _) => return Err(format!("Unmatched `}}` in `{}`", x)),
                (_, _) => match rest.split_once('}') {
                    Some(("", tail)) => {
                        x = tail;
                        FormatSpec::Default
                    }
                    Some((key, tail)) => {
                        x = tail;
                        FormatSpec::Keyed(key.to_string())
                    }
                    None => return Err(format!("Unmatched `{{` in `{}`", x)),
                },
            };

            args.push(FormatArg { leading_text, fmt });
        }

        Ok(FormatString {
            args,
            rest: x.to_string(),
        })
    }
}

impl<'de> serde::Deserialize<'de> for FormatString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct FormatStringVisitor;

        impl<'de> serde::de::Visitor<'de> for FormatStringVisitor {
            type Value = FormatString;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a path template containing plain text, substitutions like {} or {project}, and escaped {{ and }} sequences")
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse()
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(FormatStringVisitor)
    }
}

impl serde::Serialize for FormatString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let st = self.to_string();

        serializer.serialize_str(&st)
    }
}

/// Base directory against which relative resource paths (the bundled clang
/// tree, the LK config header) are resolved.
pub fn project_root() -> PathBuf {
    std::env::var_os("CCWRAP_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn which<S: AsRef<Path> + ?Sized>(prg: &S) -> io::Result<PathBuf> {
    let path = std::env::var_os("PATH")
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "PATH not set"))?;

    for mut file in std::env::split_paths(&path) {
        file.push(prg);
        if !std::env::consts::EXE_EXTENSION.is_empty() {
            file.set_extension(std::env::consts::EXE_EXTENSION);
        }

        if let Ok(perms) = std::fs::metadata(&file) {
            if crate::os::is_executable(&perms.permissions()) {
                return Ok(file);
            }
        }
    }

    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("Program {} not found in PATH", prg.as_ref().display()),
    ))
}

/// A configured toolchain binary given as a bare name is searched on PATH;
/// anything carrying a directory component is used as-is and left for exec
/// to reject if it does not exist.
pub fn resolve_program(prg: &Path) -> io::Result<PathBuf> {
    let mut components = prg.components();

    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => which(prg),
        _ => Ok(prg.to_path_buf()),
    }
}
