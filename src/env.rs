//! Environment variables
//!
//! Every variable is a zero-sized type implementing [`EnvVar`]: its name, a
//! description for the generated docs and a typed parser. Command line flags
//! take precedence; these only provide the defaults.

use std::env;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

pub trait EnvVar<T> {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn default_value() -> T;

    fn parse(value: &str) -> EnvResult<T>;

    /// Parsed value, or the default when the variable is unset or empty.
    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) if !value.trim().is_empty() => Self::parse(&value),
            _ => Ok(Self::default_value()),
        }
    }
}

fn parse_path(value: &str) -> EnvResult<PathBuf> {
    Ok(PathBuf::from(shellexpand::tilde(value.trim()).into_owned()))
}

/// Directories used by a run
pub mod paths {
    use super::*;

    pub struct Output;
    impl EnvVar<PathBuf> for Output {
        const NAME: &'static str = "MINDTOUCH_OUTPUT";
        const DESCRIPTION: &'static str = "Directory the archive is written to";

        fn default_value() -> PathBuf {
            PathBuf::from("/output")
        }

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value)
        }
    }

    pub struct Tmp;
    impl EnvVar<PathBuf> for Tmp {
        const NAME: &'static str = "MINDTOUCH_TMP";
        const DESCRIPTION: &'static str = "Directory for temporary files, including the API response cache";

        fn default_value() -> PathBuf {
            PathBuf::from("/output/tmp")
        }

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value)
        }
    }

    pub struct ZimuiDist;
    impl EnvVar<PathBuf> for ZimuiDist {
        const NAME: &'static str = "MINDTOUCH_ZIMUI_DIST";
        const DESCRIPTION: &'static str = "Build directory of the reader UI bundle";

        fn default_value() -> PathBuf {
            PathBuf::from("../zimui/dist")
        }

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value)
        }
    }

    pub struct MathjaxDist;
    impl EnvVar<PathBuf> for MathjaxDist {
        const NAME: &'static str = "MINDTOUCH_MATHJAX_DIST";
        const DESCRIPTION: &'static str = "MathJax distribution stored under mathjax/ in the archive";

        fn default_value() -> PathBuf {
            PathBuf::from("../mathjax")
        }

        fn parse(value: &str) -> EnvResult<PathBuf> {
            parse_path(value)
        }
    }
}

pub mod logging {
    use super::*;

    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "MINDTOUCH_LOG_LEVEL";
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn default_value() -> String {
            "info".to_string()
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid log level '{}'. Use: trace, debug, info, warn, error", value),
                }),
            }
        }
    }
}

/// Every variable, read at once.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub output: PathBuf,
    pub tmp: PathBuf,
    pub zimui_dist: PathBuf,
    pub mathjax_dist: PathBuf,
    pub log_level: String,
}

impl EnvConfig {
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            output: paths::Output::get()?,
            tmp: paths::Tmp::get()?,
            zimui_dist: paths::ZimuiDist::get()?,
            mathjax_dist: paths::MathjaxDist::get()?,
            log_level: logging::LogLevel::get()?,
        })
    }
}

fn doc_line<T: fmt::Debug, V: EnvVar<T>>() -> String {
    format!("- `{}`: {} (default: {:?})\n", V::NAME, V::DESCRIPTION, V::default_value())
}

pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    docs.push_str("## Paths\n\n");
    docs.push_str(&doc_line::<PathBuf, paths::Output>());
    docs.push_str(&doc_line::<PathBuf, paths::Tmp>());
    docs.push_str(&doc_line::<PathBuf, paths::ZimuiDist>());
    docs.push_str(&doc_line::<PathBuf, paths::MathjaxDist>());

    docs.push_str("\n## Logging\n\n");
    docs.push_str(&doc_line::<String, logging::LogLevel>());

    docs
}
