use std::path::PathBuf;

use clap::Args;

use crate::util::{CliResult, colorize_ok, colorize_path, load_schema};

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(value_name = "DOCUMENT", help = "XML document to validate.")]
    pub document: PathBuf,

    #[arg(long = "schema", value_name = "XSD", help = "XML Schema to validate against. Default: bundled Calculator.xsd.")]
    pub schema: Option<PathBuf>,
}

pub fn run(args: &ValidateArgs) -> CliResult<String> {
    let schema = load_schema(args.schema.as_deref())?;
    match schema.validate_path(&args.document) {
        Ok(()) => {
            tracing::info!(document = %args.document.display(), "XML is valid");
            Ok(format!("{}: {}", colorize_path(&args.document), colorize_ok("valid")))
        }
        Err(error) => anyhow::bail!("{}: invalid: {error}", args.document.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MISSING_OPERATOR, SAMPLE, strip_ansi, write_document};
    use rstest::rstest;

    #[rstest]
    fn bundled_schema_accepts_sample() {
        let dir = tempfile::tempdir().unwrap();
        let document = write_document(dir.path(), "sample.xml", SAMPLE);
        let output = run(&ValidateArgs { document, schema: None }).unwrap();
        assert!(strip_ansi(&output).ends_with(": valid"));
    }

    #[rstest]
    fn invalid_document_reports_the_reason() {
        let dir = tempfile::tempdir().unwrap();
        let document = write_document(dir.path(), "bad.xml", MISSING_OPERATOR);
        let err = run(&ValidateArgs { document, schema: None }).unwrap_err();
        assert!(err.to_string().contains("missing required attribute 'OperationType'"), "{err}");
    }

    #[rstest]
    fn explicit_schema_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_document(
            dir.path(),
            "root.xsd",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"><xs:element name="root"/></xs:schema>"#,
        );
        let document = write_document(dir.path(), "doc.xml", "<root><anything/></root>");
        run(&ValidateArgs { document: document.clone(), schema: Some(schema.clone()) }).unwrap();

        let sample = write_document(dir.path(), "sample.xml", SAMPLE);
        assert!(run(&ValidateArgs { document: sample, schema: Some(schema) }).is_err());
    }

    #[rstest]
    fn unreadable_schema_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let document = write_document(dir.path(), "sample.xml", SAMPLE);
        let err = run(&ValidateArgs { document, schema: Some(dir.path().join("none.xsd")) }).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load schema"));
    }
}
