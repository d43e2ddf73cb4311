//! Placeholder-aware YAML emission.
//!
//! [`YamlEmitter`] writes block-style YAML straight from a [`Value`] tree.
//! Literal strings are quoted only when a YAML 1.1 or 1.2 reader would
//! otherwise misread them; [`Value::Placeholder`] text is written verbatim.
//!
//! [`repair_quoted_placeholders`] is a textual pass for YAML produced by
//! other emitters (for example `serde_yaml`), which always quote strings
//! starting with `{`.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

use crate::placeholder::{validate_expression, CLOSE_DELIMITER, OPEN_DELIMITER};
use crate::split::join_documents;
use crate::value::{Mapping, Value};

const INDENT: usize = 2;

/// Characters that cannot start a plain scalar.
const INDICATORS: &str = "-?:,[]{}#&*!|>'\"%@`";

#[derive(Clone, Copy)]
enum Position {
    MapValue,
    SequenceItem,
}

/// Block-style YAML emitter.
pub struct YamlEmitter {
    reserved: Regex,
}

impl Default for YamlEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlEmitter {
    pub fn new() -> Self {
        Self {
            // Plain scalars that resolve to null, bool, number, timestamp or merge key
            reserved: Regex::new(concat!(
                r"^(?:",
                r"~|(?i:null|true|false|yes|no|on|off|y|n)",
                r"|[-+]?(?:\.[0-9_]+|[0-9][0-9_]*(?:\.[0-9_]*)?)(?:[eE][-+]?[0-9]+)?",
                r"|[-+]?0x[0-9a-fA-F_]+|[-+]?0o[0-7_]+|[-+]?0b[01_]+",
                r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+(?:\.[0-9_]*)?",
                r"|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN)",
                r"|[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}(?:[Tt ].*)?",
                r"|<<|=",
                r")$"
            ))
            .unwrap(),
        }
    }

    /// Serialize one value as a single YAML document.
    pub fn emit(&self, value: &Value) -> String {
        let mut out = String::new();
        match value {
            Value::Mapping(m) if !m.is_empty() => self.write_mapping(&mut out, m, 0, false),
            Value::Sequence(items) if !items.is_empty() => {
                self.write_sequence(&mut out, items, 0, false)
            }
            Value::Mapping(_) => out.push_str("{}\n"),
            Value::Sequence(_) => out.push_str("[]\n"),
            scalar => self.write_scalar(&mut out, scalar, INDENT),
        }
        // Kept trailing lines of a `|+` block would be lost to document trimming.
        if out.ends_with("\n\n") {
            out.push_str("...\n");
        }
        out
    }

    /// Serialize several values as one multi-document blob.
    pub fn emit_documents(&self, documents: &[Value]) -> String {
        let docs: Vec<String> = documents
            .iter()
            .map(|doc| self.emit(doc).trim_end().to_string())
            .collect();
        join_documents(&docs)
    }

    fn write_mapping(&self, out: &mut String, mapping: &Mapping, indent: usize, first_inline: bool) {
        for (i, (key, value)) in mapping.iter().enumerate() {
            if !(first_inline && i == 0) {
                push_indent(out, indent);
            }
            out.push_str(&self.format_key(key));
            out.push(':');
            self.write_node(out, value, indent, Position::MapValue);
        }
    }

    fn write_sequence(&self, out: &mut String, items: &[Value], indent: usize, first_inline: bool) {
        for (i, item) in items.iter().enumerate() {
            if !(first_inline && i == 0) {
                push_indent(out, indent);
            }
            out.push('-');
            self.write_node(out, item, indent, Position::SequenceItem);
        }
    }

    /// Write a value following a `key:` or `-` indicator at `indent`.
    fn write_node(&self, out: &mut String, value: &Value, indent: usize, position: Position) {
        let nested = indent + INDENT;
        match (value, position) {
            (Value::Mapping(m), _) if m.is_empty() => out.push_str(" {}\n"),
            (Value::Sequence(items), _) if items.is_empty() => out.push_str(" []\n"),
            (Value::Mapping(m), Position::MapValue) => {
                out.push('\n');
                self.write_mapping(out, m, nested, false);
            }
            (Value::Mapping(m), Position::SequenceItem) => {
                out.push(' ');
                self.write_mapping(out, m, nested, true);
            }
            (Value::Sequence(items), Position::MapValue) => {
                out.push('\n');
                self.write_sequence(out, items, nested, false);
            }
            (Value::Sequence(items), Position::SequenceItem) => {
                out.push(' ');
                self.write_sequence(out, items, nested, true);
            }
            (scalar, _) => {
                out.push(' ');
                self.write_scalar(out, scalar, nested);
            }
        }
    }

    /// Write a scalar and its line break. Block scalar content goes at `content_indent`.
    fn write_scalar(&self, out: &mut String, value: &Value, content_indent: usize) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::Placeholder(p) if p.as_str().contains('\n') => {
                write_literal_block(out, p.as_str(), content_indent);
                return;
            }
            Value::Placeholder(p) => out.push_str(p.as_str()),
            Value::String(s) if s.contains('\n') && literal_block_allowed(s) => {
                write_literal_block(out, s, content_indent);
                return;
            }
            Value::String(s) => out.push_str(&self.format_string(s)),
            Value::Mapping(_) | Value::Sequence(_) => {
                unreachable!("collections are handled by write_node")
            }
        }
        out.push('\n');
    }

    /// Render a literal string on one line, quoting only when required.
    pub fn format_string(&self, s: &str) -> String {
        if self.needs_quotes(s) {
            double_quote(s)
        } else {
            s.to_string()
        }
    }

    fn format_key(&self, key: &str) -> String {
        self.format_string(key)
    }

    /// Whether a literal string must be quoted to read back as the same string.
    pub fn needs_quotes(&self, s: &str) -> bool {
        let (Some(first), Some(last)) = (s.chars().next(), s.chars().last()) else {
            return true;
        };

        first.is_whitespace()
            || last.is_whitespace()
            || INDICATORS.contains(first)
            || s.starts_with("...")
            || s.contains(": ")
            || s.contains(":\t")
            || s.ends_with(':')
            || s.contains(" #")
            || s.contains("\t#")
            || s.chars().any(is_special_char)
            || self.reserved.is_match(s)
    }
}

/// Serialize one value as a YAML document with a default [`YamlEmitter`].
pub fn to_yaml_string(value: &Value) -> String {
    YamlEmitter::new().emit(value)
}

fn push_indent(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}

fn is_special_char(c: char) -> bool {
    c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}')
}

/// A multi-line string can use `|` when every line reads back unchanged.
///
/// Strings ending in blank lines are double-quoted instead: `|+` only keeps
/// them while nothing downstream trims the document.
fn literal_block_allowed(s: &str) -> bool {
    let first_line = s.split('\n').next().unwrap_or_default();
    !first_line.is_empty()
        && !first_line.starts_with([' ', '\t'])
        && !s.ends_with("\n\n")
        && !s.chars().any(|c| c != '\n' && is_special_char(c))
        && s.split('\n').all(|line| !line.ends_with([' ', '\t']))
}

/// Write `s` as a `|` block with its lines at `indent`.
///
/// Placeholders always take this path when multi-line, so the header carries an
/// explicit indentation indicator when the first content line starts with blanks.
fn write_literal_block(out: &mut String, s: &str, indent: usize) {
    let trailing = s.len() - s.trim_end_matches('\n').len();
    let (chomping, body) = match trailing {
        0 => ("-", s),
        1 => ("", &s[..s.len() - 1]),
        _ => ("+", &s[..s.len() - 1]),
    };
    let leading_blank = body
        .split('\n')
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with([' ', '\t']));

    out.push('|');
    if leading_blank {
        let _ = write!(out, "{}", INDENT);
    }
    out.push_str(chomping);
    out.push('\n');
    for line in body.split('\n') {
        if !line.is_empty() {
            push_indent(out, indent);
            out.push_str(line);
        }
        out.push('\n');
    }
}

fn double_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\u{1b}' => out.push_str("\\e"),
            '\u{85}' => out.push_str("\\N"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            c if is_special_char(c) => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Strips one layer of quotes from lines whose value is wholly a placeholder.
///
/// Handles `key: '...'`, `key: "..."`, `- '...'` and bare quoted lines.
/// Lines whose unquoted text is not a well-formed expression are left as they are.
pub struct QuoteRepair {
    pattern: Regex,
}

impl QuoteRepair {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(
                r##"^(?P<prefix>[ ]*(?:-[ ]+)*(?:[^\s'"#-][^'"#]*?:[ ]+)?)(?P<value>'\{\{.*\}\}'|"\{\{.*\}\}")[ ]*$"##,
            )
            .unwrap(),
        }
    }

    pub fn repair(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            let (content, ending) = match line.strip_suffix('\n') {
                Some(content) => (content, "\n"),
                None => (line, ""),
            };

            let repaired = self.pattern.captures(content).and_then(|caps| {
                let value = caps.name("value")?.as_str();
                let inner = unquote(value)?;
                if inner.starts_with(OPEN_DELIMITER)
                    && inner.ends_with(CLOSE_DELIMITER)
                    && !inner.contains('\n')
                    && validate_expression(&inner).is_ok()
                {
                    Some(format!("{}{}", &caps["prefix"], inner))
                } else {
                    None
                }
            });

            match repaired {
                Some(fixed) => out.push_str(&fixed),
                None => out.push_str(content),
            }
            out.push_str(ending);
        }
        out
    }
}

impl Default for QuoteRepair {
    fn default() -> Self {
        Self::new()
    }
}

/// [`QuoteRepair::repair`] with a shared, lazily built instance.
pub fn repair_quoted_placeholders(text: &str) -> String {
    static REPAIR: OnceLock<QuoteRepair> = OnceLock::new();
    REPAIR.get_or_init(QuoteRepair::new).repair(text)
}

/// Undo single- or double-quoted scalar escaping. `None` when the text is not one scalar.
fn unquote(value: &str) -> Option<String> {
    let inner = &value[1..value.len() - 1];
    if value.starts_with('\'') {
        if inner.replace("''", "").contains('\'') {
            return None;
        }
        return Some(inner.replace("''", "'"));
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return None,
            '\\' => match chars.next()? {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                '/' => out.push('/'),
                't' => out.push('\t'),
                _ => return None,
            },
            c => out.push(c),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::Placeholder;
    use crate::split::split_documents;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_block_layout() {
        let value = yaml(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\nspec:\n  ports:\n  - port: 80\n    protocol: TCP\n  selector: {}\n  tags: []\n",
        );
        let out = to_yaml_string(&value);
        assert_eq!(
            out,
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\nspec:\n  ports:\n    - port: 80\n      protocol: TCP\n  selector: {}\n  tags: []\n"
        );
    }

    #[test]
    fn test_placeholder_is_verbatim() {
        let mut m = Mapping::new();
        m.insert(
            "version",
            Placeholder::new(r#"{{ .Chart.Version | replace "+" "_" }}"#).unwrap(),
        );
        m.insert(
            "args",
            Value::Sequence(vec![Value::placeholder("{{ .Values.arg }}").unwrap()]),
        );

        let out = to_yaml_string(&Value::Mapping(m));
        assert_eq!(
            out,
            "version: {{ .Chart.Version | replace \"+\" \"_\" }}\nargs:\n  - {{ .Values.arg }}\n"
        );
    }

    #[test]
    fn test_literal_strings_are_quoted_when_needed() {
        let emitter = YamlEmitter::new();
        assert_eq!(emitter.format_string("nginx"), "nginx");
        assert_eq!(emitter.format_string("1.0.0"), "1.0.0");
        assert_eq!(emitter.format_string("app.kubernetes.io/name"), "app.kubernetes.io/name");
        assert_eq!(emitter.format_string(""), "\"\"");
        assert_eq!(emitter.format_string("true"), "\"true\"");
        assert_eq!(emitter.format_string("No"), "\"No\"");
        assert_eq!(emitter.format_string("8080"), "\"8080\"");
        assert_eq!(emitter.format_string("1e3"), "\"1e3\"");
        assert_eq!(emitter.format_string("0x1F"), "\"0x1F\"");
        assert_eq!(emitter.format_string("~"), "\"~\"");
        assert_eq!(emitter.format_string("a: b"), "\"a: b\"");
        assert_eq!(emitter.format_string("-leading"), "\"-leading\"");
        assert_eq!(emitter.format_string("say \"hi\""), "say \"hi\"");
        assert_eq!(emitter.format_string("tab\there"), "\"tab\\there\"");
        assert_eq!(emitter.format_string("{{ not tagged }}"), "\"{{ not tagged }}\"");
    }

    #[test]
    fn test_multiline_strings_use_literal_block() {
        let mut m = Mapping::new();
        m.insert("script", "echo one\necho two\n");
        m.insert("stripped", "a\nb");
        let out = to_yaml_string(&Value::Mapping(m));
        assert_eq!(out, "script: |\n  echo one\n  echo two\nstripped: |-\n  a\n  b\n");
    }

    #[test]
    fn test_multiline_with_leading_space_is_double_quoted() {
        let emitter = YamlEmitter::new();
        let out = emitter.emit(&Value::from(vec![" indented\nline"]));
        assert_eq!(out, "- \" indented\\nline\"\n");
    }

    #[test]
    fn test_nested_sequences_and_scalars() {
        let value = yaml("- - a\n  - b\n- null\n- 1.5\n- false\n");
        assert_eq!(to_yaml_string(&value), "- - a\n  - b\n- null\n- 1.5\n- false\n");
    }

    #[test]
    fn test_emit_documents() {
        let emitter = YamlEmitter::new();
        let out = emitter.emit_documents(&[yaml("kind: A\n"), yaml("kind: B\n")]);
        assert_eq!(out, "kind: A\n---\nkind: B\n");
    }

    #[test]
    fn test_repair_quoted_placeholders() {
        let text = "name: '{{ .Release.Name }}'\nimage: \"{{ .Values.image }}\"\nargs:\n- '{{ printf ''%s'' .Values.x }}'\nplain: 'keep'\n";
        let out = repair_quoted_placeholders(text);
        assert_eq!(
            out,
            "name: {{ .Release.Name }}\nimage: {{ .Values.image }}\nargs:\n- {{ printf '%s' .Values.x }}\nplain: 'keep'\n"
        );
    }

    #[test]
    fn test_repair_leaves_mixed_values_alone() {
        let text = "a: '{{ .X }}' # comment\nb: '{{ .Y }}:{{ .Z }}'\nc: \"{{ \\u0041 }}\"";
        let out = repair_quoted_placeholders(text);
        assert!(out.starts_with("a: '{{ .X }}' # comment\n"));
        assert!(out.contains("b: {{ .Y }}:{{ .Z }}\n"));
        assert!(out.ends_with("c: \"{{ \\u0041 }}\""));
    }

    #[test]
    fn test_repair_handles_serde_yaml_output() {
        #[derive(serde::Serialize)]
        struct Container {
            name: String,
            image: String,
        }

        let text = serde_yaml::to_string(&vec![Container {
            name: "web".to_string(),
            image: "{{ .Values.image.repository }}".to_string(),
        }])
        .unwrap();

        let out = repair_quoted_placeholders(&text);
        assert!(out.contains("image: {{ .Values.image.repository }}"));
        assert!(out.contains("name: web"));
    }

    #[test]
    fn test_strings_ending_in_blank_lines_are_double_quoted() {
        let mut m = Mapping::new();
        m.insert("script", "echo hi\n\n");
        let out = YamlEmitter::new().emit_documents(&[Value::Mapping(m)]);
        assert_eq!(out, "script: \"echo hi\\n\\n\"\n");

        let parsed: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(parsed.get("script"), Some(&Value::from("echo hi\n\n")));
    }

    #[test]
    fn test_multiline_placeholder_uses_literal_block() {
        let mut data = Mapping::new();
        data.insert(
            "app.conf",
            Placeholder::new_unchecked("host={{ .Values.host }}\nport=80\n"),
        );
        data.insert("other", "x");
        let mut record = Mapping::new();
        record.insert("data", data);

        let out = to_yaml_string(&Value::Mapping(record));
        assert_eq!(
            out,
            "data:\n  app.conf: |\n    host={{ .Values.host }}\n    port=80\n  other: x\n"
        );

        let rendered: Value =
            serde_yaml::from_str(&out.replace("{{ .Values.host }}", "db")).unwrap();
        let data = rendered.get("data").unwrap();
        assert_eq!(data.get("app.conf"), Some(&Value::from("host=db\nport=80\n")));
        assert_eq!(data.get("other"), Some(&Value::from("x")));
    }

    #[test]
    fn test_multiline_placeholder_with_leading_blanks_gets_indent_indicator() {
        let text = "  {{- if .Values.x }}\nfoo\n{{- end }}";
        let out = to_yaml_string(&Value::from(vec![Placeholder::new_unchecked(text)]));
        assert_eq!(out, "- |2-\n    {{- if .Values.x }}\n  foo\n  {{- end }}\n");

        let parsed: Vec<String> = serde_yaml::from_str(&out).unwrap();
        assert_eq!(parsed, vec![text.to_string()]);
    }

    #[test]
    fn test_kept_blank_lines_survive_document_trimming() {
        let mut first = Mapping::new();
        first.insert("body", Placeholder::new_unchecked("{{ .Values.a }}\n\n"));
        let out = YamlEmitter::new().emit_documents(&[Value::Mapping(first), Value::from("b")]);

        let docs = split_documents(&out);
        assert_eq!(docs.len(), 2);
        assert!(docs[0].ends_with("\n..."));
        let parsed: Value = serde_yaml::from_str(&docs[0]).unwrap();
        assert_eq!(parsed.get("body"), Some(&Value::from("{{ .Values.a }}\n\n")));
    }

    #[test]
    fn test_quote_repair_matches_shared_instance() {
        let text = "name: '{{ .Release.Name }}'\n- \"{{ .Values.x }}\"\n";
        let repair = QuoteRepair::new();
        assert_eq!(repair.repair(text), repair_quoted_placeholders(text));
        assert_eq!(repair.repair(text), "name: {{ .Release.Name }}\n- {{ .Values.x }}\n");
    }
}
