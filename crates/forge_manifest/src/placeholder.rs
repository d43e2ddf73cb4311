//! Placeholder tokens for deferred template expressions.

use std::fmt;

use regex::Regex;
use tracing::trace;

use crate::error::{ManifestError, ManifestResult};
use crate::value::Value;

/// Opening delimiter of a template expression.
pub const OPEN_DELIMITER: &str = "{{";
/// Closing delimiter of a template expression.
pub const CLOSE_DELIMITER: &str = "}}";

/// A raw string that must reach the output exactly as given.
///
/// The wrapped text is never quoted or escaped by the emitter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder(String);

impl Placeholder {
    /// Wrap a raw expression after checking that its delimiters and quotes balance.
    pub fn new(raw: impl Into<String>) -> ManifestResult<Self> {
        let raw = raw.into();
        validate_expression(&raw)?;
        Ok(Self(raw))
    }

    /// Wrap a raw expression without validation.
    ///
    /// For built-in expressions known to be well formed.
    pub fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Placeholder {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check delimiter and quote balance of a raw expression string.
///
/// Text outside `{{ ... }}` is free-form. Inside an expression, `"..."`
/// (with backslash escapes) and `` `...` `` literals must be closed before
/// the closing delimiter, and expressions do not nest.
pub fn validate_expression(raw: &str) -> ManifestResult<()> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    let mut inside = false;
    let mut in_double = false;
    let mut in_backtick = false;

    while i < bytes.len() {
        let rest = &bytes[i..];

        if !inside {
            if rest.starts_with(OPEN_DELIMITER.as_bytes()) {
                inside = true;
                i += OPEN_DELIMITER.len();
                continue;
            }
            if rest.starts_with(CLOSE_DELIMITER.as_bytes()) {
                return Err(ManifestError::malformed(
                    raw,
                    format!("unexpected '{}' at byte {}", CLOSE_DELIMITER, i),
                ));
            }
            i += 1;
            continue;
        }

        match bytes[i] {
            b'\\' if in_double => {
                i += 2;
                continue;
            }
            b'"' if !in_backtick => in_double = !in_double,
            b'`' if !in_double => in_backtick = !in_backtick,
            _ if in_double || in_backtick => {}
            _ if rest.starts_with(CLOSE_DELIMITER.as_bytes()) => {
                inside = false;
                i += CLOSE_DELIMITER.len();
                continue;
            }
            _ if rest.starts_with(OPEN_DELIMITER.as_bytes()) => {
                return Err(ManifestError::malformed(
                    raw,
                    format!("nested '{}' at byte {}", OPEN_DELIMITER, i),
                ));
            }
            _ => {}
        }
        i += 1;
    }

    if in_double || in_backtick {
        return Err(ManifestError::malformed(raw, "unterminated string literal"));
    }
    if inside {
        return Err(ManifestError::malformed(
            raw,
            format!("missing closing '{}'", CLOSE_DELIMITER),
        ));
    }
    Ok(())
}

/// Preprocessing pass that turns literal strings containing template
/// expressions into [`Placeholder`] values.
pub struct PlaceholderScanner {
    pattern: Regex,
}

impl Default for PlaceholderScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderScanner {
    pub fn new() -> Self {
        Self {
            // Match {{ ... }} across lines
            pattern: Regex::new(r"(?s)\{\{.*?\}\}").unwrap(),
        }
    }

    /// Whether a literal string contains a template expression.
    pub fn is_expression(&self, s: &str) -> bool {
        self.pattern.is_match(s)
    }

    /// Tag every string scalar holding an expression. Mapping keys are left alone.
    pub fn tag(&self, value: Value) -> ManifestResult<Value> {
        Ok(match value {
            Value::String(s) if self.is_expression(&s) => {
                trace!("Tagging placeholder {:?}", s);
                Value::Placeholder(Placeholder::new(s)?)
            }
            Value::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(|item| self.tag(item))
                    .collect::<ManifestResult<_>>()?,
            ),
            Value::Mapping(mapping) => Value::Mapping(
                mapping
                    .into_iter()
                    .map(|(k, v)| Ok((k, self.tag(v)?)))
                    .collect::<ManifestResult<Vec<_>>>()?
                    .into_iter()
                    .collect(),
            ),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_and_unwrap() {
        let p = Placeholder::new("{{ .Values.image.tag }}").unwrap();
        assert_eq!(p.as_str(), "{{ .Values.image.tag }}");
        assert!(Value::from(p.clone()).is_placeholder());
        assert_eq!(p.into_inner(), "{{ .Values.image.tag }}");
    }

    #[test]
    fn test_accepts_quotes_inside_expression() {
        assert!(Placeholder::new(r#"{{ .Chart.Version | replace "+" "_" }}"#).is_ok());
        assert!(Placeholder::new(r#"{{ printf "%s-%s" .Release.Name "}}" }}"#).is_ok());
        assert!(Placeholder::new(r#"{{ "a \" b" }}"#).is_ok());
        assert!(Placeholder::new("{{ `raw }} text` }}").is_ok());
    }

    #[test]
    fn test_accepts_text_around_expressions() {
        assert!(Placeholder::new("{{ .Values.repo }}:{{ .Values.tag }}").is_ok());
        assert!(Placeholder::new("prefix-{{ .Release.Name }}-suffix").is_ok());
        assert!(Placeholder::new("{{- toYaml .Values.resources | nindent 12 }}").is_ok());
    }

    #[test]
    fn test_rejects_unbalanced_delimiters() {
        assert!(matches!(
            Placeholder::new("{{ .Values.x"),
            Err(ManifestError::MalformedExpression { .. })
        ));
        assert!(Placeholder::new(".Values.x }}").is_err());
        assert!(Placeholder::new("{{ {{ .Values.x }} }}").is_err());
    }

    #[test]
    fn test_rejects_unbalanced_quotes() {
        assert!(Placeholder::new(r#"{{ default "x .Values.y }}"#).is_err());
        assert!(Placeholder::new("{{ `open }}").is_err());
    }

    #[test]
    fn test_scanner_tags_nested_strings() {
        let scanner = PlaceholderScanner::new();
        let tree: Value = serde_yaml::from_str(
            "metadata:\n  name: \"{{ .Release.Name }}\"\n  namespace: default\nports:\n- \"{{ .Values.port }}\"\n",
        )
        .unwrap();

        let tagged = scanner.tag(tree).unwrap();
        assert!(tagged.pointer(["metadata", "name"]).unwrap().is_placeholder());
        assert!(!tagged.pointer(["metadata", "namespace"]).unwrap().is_placeholder());
        assert!(tagged.get("ports").unwrap().as_sequence().unwrap()[0].is_placeholder());
    }

    #[test]
    fn test_scanner_surfaces_malformed_expression() {
        let scanner = PlaceholderScanner::new();
        let tree = Value::from(vec!["{{ \"oops }}"]);
        assert!(scanner.tag(tree).is_err());
    }
}
