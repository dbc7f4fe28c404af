use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use calcxml_core::number::format_double;
use calcxml_core::reducer::DEFAULT_OPERATOR_ATTRIBUTE;
use calcxml_core::writer::DEFAULT_INDENT;
use calcxml_core::{Calculator, CalculatorOptions};
use clap::Args;
use serde::Serialize;

use crate::util::{CliResult, colorize_path, colorize_warning, load_schema};

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    #[arg(value_name = "INPUT", help = "Calculator document to solve.")]
    pub input: PathBuf,

    #[arg(
        long = "output",
        short = 'o',
        value_name = "FILE",
        conflicts_with = "stdout",
        help = "Result document path. Default: INPUT's name suffixed with 'Result', next to INPUT."
    )]
    pub output: Option<PathBuf>,

    #[arg(long = "stdout", help = "Print the result document instead of writing a file.")]
    pub stdout: bool,

    #[arg(long = "schema", value_name = "XSD", help = "Validate INPUT against this schema before solving.")]
    pub schema: Option<PathBuf>,

    #[arg(long = "indent", value_name = "N", default_value_t = DEFAULT_INDENT, help = "Spaces per nesting level in the result document (0 = single line).")]
    pub indent: usize,

    #[arg(
        long = "operator-attribute",
        value_name = "NAME",
        default_value = DEFAULT_OPERATOR_ATTRIBUTE,
        help = "Attribute of <operation> that holds the operator code."
    )]
    pub operator_attribute: String,

    #[arg(
        long = "format",
        value_enum,
        default_value_t = SummaryFormat::Text,
        conflicts_with = "stdout",
        help = "Summary format: text (default) or json. Not used with --stdout."
    )]
    pub format: SummaryFormat,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryFormat {
    Text,
    Json,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct SolveSummary {
    input: String,
    output: String,
    /// `xs:double` lexical forms, so NaN and infinities survive JSON.
    results: Vec<String>,
}

pub fn run(args: &SolveArgs) -> CliResult<String> {
    if let Some(schema_path) = &args.schema {
        let schema = load_schema(Some(schema_path.as_path()))?;
        schema
            .validate_path(&args.input)
            .with_context(|| format!("{} does not conform to {}", args.input.display(), schema_path.display()))?;
    }

    let options = CalculatorOptions::new().with_operator_attribute(&args.operator_attribute).with_indent(args.indent);
    let calculator = Calculator::with_options(&args.input, options);
    let results = calculator.solve().with_context(|| format!("failed to solve {}", args.input.display()))?;

    if args.stdout {
        return Ok(calculator.render_results(&results)?.trim_end().to_owned());
    }

    let output = match &args.output {
        Some(path) => {
            calculator
                .write_results_to(&results, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            path.clone()
        }
        None => calculator.write_results(&results)?,
    };

    match args.format {
        SummaryFormat::Text => Ok(render_summary_text(&args.input, &output, &results)),
        SummaryFormat::Json => {
            let summary = SolveSummary {
                input: args.input.display().to_string(),
                output: output.display().to_string(),
                results: results.iter().copied().map(format_double).collect(),
            };
            Ok(serde_json::to_string_pretty(&summary)?)
        }
    }
}

fn render_summary_text(input: &Path, output: &Path, results: &[f64]) -> String {
    let mut text = format!("Solved {} expression(s) from {}\n", results.len(), colorize_path(input));
    for (index, value) in results.iter().enumerate() {
        let rendered = format_double(*value);
        let rendered = if value.is_finite() { rendered } else { colorize_warning(&rendered) };
        let _ = writeln!(text, "  #{:<3} {rendered}", index + 1);
    }
    let _ = write!(text, "Results written to {}", colorize_path(output));
    text
}
