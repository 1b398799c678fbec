use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Compact,
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Pretty => "pretty",
            Format::Compact => "compact",
            Format::Json => "json",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// An `EnvFilter` directive string, e.g. `"info"` or `"prana_engine=debug,warn"`.
    pub level: String,
    pub format: Format,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: Format::Pretty }
    }
}

impl LogConfig {
    /// Reads `PRANA_LOG_FORMAT` (`pretty`|`compact`|`json`) and falls back to
    /// defaults for anything unset or unrecognized. `RUST_LOG` is applied
    /// separately by [`crate::init`] (it takes priority over `level`).
    #[must_use]
    pub fn from_env() -> Self {
        let format = match std::env::var("PRANA_LOG_FORMAT").as_deref() {
            Ok("json") => Format::Json,
            Ok("compact") => Format::Compact,
            _ => Format::Pretty,
        };
        Self { level: "info".to_string(), format }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_display() {
        assert_eq!(Format::Json.to_string(), "json");
    }
}
