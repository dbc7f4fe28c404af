//! Serializes a result sequence into a `simpleCalculator` result document.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::Writer;

use crate::error::WriteError;
use crate::number::format_double;

pub const ROOT_ELEMENT: &str = "simpleCalculator";
pub const RESULTS_ELEMENT: &str = "expressionResults";
pub const RESULT_ITEM_ELEMENT: &str = "expressionResult";
pub const RESULT_ELEMENT: &str = "result";

pub const DEFAULT_INDENT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultWriter {
    indent: usize,
}

impl Default for ResultWriter {
    fn default() -> Self {
        Self { indent: DEFAULT_INDENT }
    }
}

impl ResultWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spaces per nesting level; `0` writes the document on a single line.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn write<W: Write>(&self, results: &[f64], out: W) -> Result<(), WriteError> {
        let mut writer = if self.indent == 0 {
            Writer::new(out)
        } else {
            Writer::new_with_indent(out, b' ', self.indent)
        };
        writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(XmlEvent::Start(BytesStart::new(ROOT_ELEMENT)))?;
        writer.write_event(XmlEvent::Start(BytesStart::new(RESULTS_ELEMENT)))?;
        for value in results {
            writer.write_event(XmlEvent::Start(BytesStart::new(RESULT_ITEM_ELEMENT)))?;
            writer.write_event(XmlEvent::Start(BytesStart::new(RESULT_ELEMENT)))?;
            writer.write_event(XmlEvent::Text(BytesText::new(&format_double(*value))))?;
            writer.write_event(XmlEvent::End(BytesEnd::new(RESULT_ELEMENT)))?;
            writer.write_event(XmlEvent::End(BytesEnd::new(RESULT_ITEM_ELEMENT)))?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new(RESULTS_ELEMENT)))?;
        writer.write_event(XmlEvent::End(BytesEnd::new(ROOT_ELEMENT)))?;

        let mut out = writer.into_inner();
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }

    pub fn write_to_path(&self, results: &[f64], path: &Path) -> Result<(), WriteError> {
        let file = File::create(path)
            .map_err(|source| WriteError::Create { path: path.to_path_buf(), source })?;
        self.write(results, BufWriter::new(file))?;
        tracing::debug!(path = %path.display(), count = results.len(), "result document written");
        Ok(())
    }

    pub fn render(&self, results: &[f64]) -> Result<String, WriteError> {
        let mut buf = Vec::new();
        self.write(results, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Result path next to `input`: same base name suffixed `Result`, same
/// extension (`xml` when the input has none).
pub fn default_result_path(input: &Path) -> PathBuf {
    let mut name: OsString = input.file_stem().map(OsStr::to_os_string).unwrap_or_default();
    name.push("Result.");
    name.push(input.extension().unwrap_or(OsStr::new("xml")));
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn renders_fixed_document_shape() {
        let xml = ResultWriter::new().render(&[7.0, f64::NAN]).unwrap();
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<simpleCalculator>\n    <expressionResults>\n        <expressionResult>\n            <result>7.0</result>\n        </expressionResult>\n        <expressionResult>\n            <result>NaN</result>\n        </expressionResult>\n    </expressionResults>\n</simpleCalculator>\n";
        assert_eq!(xml, expected);
    }

    #[rstest]
    fn zero_indent_writes_single_line() {
        let xml = ResultWriter::new().with_indent(0).render(&[-2443.75]).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><simpleCalculator><expressionResults>\
<expressionResult><result>-2443.75</result></expressionResult></expressionResults></simpleCalculator>\n"
        );
    }

    #[rstest]
    fn empty_results_still_produce_the_collection() {
        let xml = ResultWriter::new().with_indent(0).render(&[]).unwrap();
        assert!(xml.contains("<expressionResults></expressionResults>"));
    }

    #[rstest]
    #[case("data/sampleTest.xml", "data/sampleTestResult.xml")]
    #[case("in.calc.xml", "in.calcResult.xml")]
    #[case("/tmp/input.txt", "/tmp/inputResult.txt")]
    #[case("noext", "noextResult.xml")]
    fn derives_result_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(default_result_path(Path::new(input)), PathBuf::from(expected));
    }

    #[rstest]
    fn writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        ResultWriter::new().write_to_path(&[1.5], &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<result>1.5</result>"));
    }

    #[rstest]
    fn missing_directory_is_a_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xml");
        let err = ResultWriter::new().write_to_path(&[1.0], &path).unwrap_err();
        assert!(matches!(err, WriteError::Create { .. }));
    }
}
