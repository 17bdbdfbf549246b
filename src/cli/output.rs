use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
}

/// Resolve whether to emit ANSI colors from the `--no-color` flag and the
/// configured `color` setting (`auto|always|never`).
pub fn detect_color(color_flag: bool, setting: &str) -> bool {
    if !color_flag {
        return false;
    }
    match setting {
        "always" => true,
        "never" => false,
        _ => std::env::var("NO_COLOR").is_err() && std::io::stdout().is_terminal(),
    }
}

/// Serialize `value` as JSON honouring `--pretty`.
pub fn to_json<T: serde::Serialize>(value: &T, opts: &OutputOptions) -> serde_json::Result<String> {
    if opts.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_color_flag_wins() {
        assert!(!detect_color(false, "always"));
    }

    #[test]
    fn explicit_settings() {
        assert!(detect_color(true, "always"));
        assert!(!detect_color(true, "never"));
    }

    #[test]
    fn format_from_name() {
        assert_eq!(OutputFormat::from_name("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_name("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::from_name("yaml"), OutputFormat::Text);
    }

    #[test]
    fn to_json_pretty_and_compact() {
        let compact = OutputOptions {
            format: OutputFormat::Json,
            pretty: false,
            use_color: false,
        };
        let pretty = OutputOptions {
            pretty: true,
            ..compact.clone()
        };
        let value = serde_json::json!({"a": 1});
        assert_eq!(to_json(&value, &compact).unwrap(), r#"{"a":1}"#);
        assert!(to_json(&value, &pretty).unwrap().contains('\n'));
    }
}
