use std::path::Path;

use anyhow::Context;
use calcxml_core::Schema;
use owo_colors::{OwoColorize, Stream};

pub type CliResult<T> = anyhow::Result<T>;

/// Schema from `path`, or the bundled calculator schema.
pub fn load_schema(path: Option<&Path>) -> CliResult<Schema> {
    match path {
        Some(path) => {
            Schema::from_path(path).with_context(|| format!("failed to load schema {}", path.display()))
        }
        None => Ok(Schema::calculator()?),
    }
}

pub fn colorize_ok(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |text| text.bold().green().to_string()).to_string()
}

pub fn colorize_warning(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |text| text.yellow().to_string()).to_string()
}

pub fn colorize_path(path: &Path) -> String {
    let rendered = path.display().to_string();
    rendered.if_supports_color(Stream::Stdout, |text| text.dimmed().to_string()).to_string()
}
