use refgen_core::internal::*;

use crate::boilerplate::{dont_modify_comment, license};
use crate::template::{Template, Vars};

/// A generated C++ file, built line by line.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    lines: Vec<String>,
}

impl SourceFile {
    /// A file starting with the license and the "generated" warning.
    pub fn generated_by(generator: &str) -> SourceFile {
        let mut file = SourceFile::default();
        file.push(license());
        file.push(dont_modify_comment(generator));
        file
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn render(&mut self, template: &Template, vars: &Vars) -> RefResult<()> {
        let text = template.render(vars)?;
        self.push(text);
        Ok(())
    }

    pub fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn layout() {
        let mut file = SourceFile::generated_by("matmul");
        file.push("\n#include <gtest/gtest.h>");
        let tpl = Template::parse("int {{ name }} = {{ value }};").unwrap();
        file.render(&tpl, &Vars::new().with("name", "x").with("value", 3)).unwrap();
        let text = file.finish();
        assert!(text.contains(" */\n\n// DO NOT MODIFY BY HAND\n"));
        assert!(text.contains("reference operators.\n\n#include <gtest/gtest.h>\nint x = 3;"));
        assert!(text.ends_with("int x = 3;\n"));
    }

    proptest! {
        #[test]
        fn finish_ends_with_a_newline(chunks in proptest::collection::vec("[a-z}\\n]{0,6}", 0..5)) {
            let mut file = SourceFile::default();
            for chunk in &chunks {
                file.push(chunk.clone());
            }
            let joined = chunks.join("\n");
            let text = file.finish();
            prop_assert!(text.ends_with('\n'));
            prop_assert!(text.starts_with(&joined));
            prop_assert!(text.len() - joined.len() <= 1);
        }
    }
}
