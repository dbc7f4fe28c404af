use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<simpleCalculator>
    <expressions>
        <expression>
            <operation OperationType="SUM"><arg>3</arg><arg>4</arg></operation>
        </expression>
        <expression>
            <operation OperationType="DIV"><arg>5</arg><arg>0</arg></operation>
        </expression>
    </expressions>
</simpleCalculator>
"#;

pub const MISSING_OPERATOR: &str = r#"<simpleCalculator><expressions><expression>
    <operation><arg>1</arg><arg>2</arg></operation>
</expression></expressions></simpleCalculator>"#;

pub fn write_document(dir: &Path, name: &str, xml: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, xml).expect("write test document");
    path
}

pub fn strip_ansi(input: &str) -> Cow<'_, str> {
    if !input.contains('\u{1b}') {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }
    Cow::Owned(result)
}
