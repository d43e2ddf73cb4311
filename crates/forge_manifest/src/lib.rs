//! # forge_manifest
//!
//! Record trees and placeholder-aware YAML serialization for chartforge.
//!
//! Resource builders hand over generic [`Value`] trees. Some string fields
//! are template expressions (`{{ ... }}`) that a downstream engine evaluates;
//! they are carried as [`Placeholder`] values and emitted without quoting or
//! escaping, while every literal string is quoted as YAML requires.
//!
//! ## Features
//!
//! - Closed [`Value`] sum type with insertion-ordered [`Mapping`]
//! - Placeholder validation and automatic tagging ([`PlaceholderScanner`])
//! - Default label injection that never overrides explicit labels
//! - Block-style YAML emission ([`YamlEmitter`]) and a quote-repair pass for
//!   third-party emitter output
//! - Multi-document splitting and joining
//!
//! ## Example
//!
//! ```rust
//! use forge_manifest::{inject_labels, to_yaml_string, Mapping, PlaceholderScanner, Value};
//!
//! let record: Value = serde_yaml::from_str(
//!     "kind: Service\nmetadata:\n  name: \"{{ .Release.Name }}\"\n",
//! )
//! .unwrap();
//!
//! let record = PlaceholderScanner::new().tag(record).unwrap();
//! let mut defaults = Mapping::new();
//! defaults.insert("app.kubernetes.io/managed-by", "chartforge");
//!
//! let yaml = to_yaml_string(&inject_labels(record, &defaults));
//! assert!(yaml.contains("name: {{ .Release.Name }}"));
//! ```

pub mod emit;
pub mod error;
pub mod labels;
pub mod placeholder;
pub mod split;
pub mod value;

pub use emit::{repair_quoted_placeholders, to_yaml_string, QuoteRepair, YamlEmitter};
pub use error::{ManifestError, ManifestResult};
pub use labels::{inject_labels, inject_labels_in_place};
pub use placeholder::{validate_expression, Placeholder, PlaceholderScanner};
pub use split::{join_documents, split_documents, DOCUMENT_SEPARATOR};
pub use value::{Mapping, Number, Value};
