//! YAML/JSON parsing and error handling

pub mod diagnostics;
pub mod parser;

pub use diagnostics::{YamlError, YamlSyntaxError};
pub use parser::{parse_json, parse_structured_file, parse_yaml, parse_yaml_file};
