//! Liquid templates for the repetitive parts of the generated files.
use std::fmt::Display;

use lazy_static::lazy_static;
use liquid::model::Value;
use refgen_core::internal::*;

lazy_static! {
    static ref PARSER: Option<liquid::Parser> = liquid::ParserBuilder::with_stdlib().build().ok();
}

pub struct Template(liquid::Template);

impl Template {
    pub fn parse(source: &str) -> RefResult<Template> {
        let parser = PARSER.as_ref().context("Building the liquid parser")?;
        let template = parser.parse(source).context("Parsing fixture template")?;
        Ok(Template(template))
    }

    pub fn render(&self, vars: &Vars) -> RefResult<String> {
        Ok(self.0.render(&vars.0)?)
    }
}

/// Template globals. Every value is rendered through its `Display`.
#[derive(Debug, Clone, Default)]
pub struct Vars(liquid::Object);

impl Vars {
    pub fn new() -> Vars {
        Vars::default()
    }

    pub fn with(mut self, key: &str, value: impl Display) -> Vars {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Display) {
        self.0.insert(key.to_string().into(), Value::scalar(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_values() {
        let tpl = Template::parse("TYPED_TEST({{ case }}, {{ name }}) {").unwrap();
        let vars = Vars::new().with("case", "MaxWindow3Stride1").with("name", 12);
        assert_eq!(tpl.render(&vars).unwrap(), "TYPED_TEST(MaxWindow3Stride1, 12) {");
    }

    #[test]
    fn braces_come_from_values() {
        let tpl = Template::parse("  const std::array<int, 4> in_shape = {{ shape }};").unwrap();
        let vars = Vars::new().with("shape", format_shape(&[1, 4, 4, 2]));
        assert_eq!(
            tpl.render(&vars).unwrap(),
            "  const std::array<int, 4> in_shape = { 1, 4, 4, 2 };"
        );
    }

    #[test]
    fn parser_is_shared() {
        let templates = (0..3)
            .map(|i| Template::parse(&format!("{{{{ v }}}}-{i}")))
            .collect::<RefResult<Vec<_>>>()
            .unwrap();
        let vars = Vars::new().with("v", "x");
        assert_eq!(templates[2].render(&vars).unwrap(), "x-2");
        assert!(PARSER.is_some());
    }

    #[test]
    fn missing_values_fail() {
        let tpl = Template::parse("{{ nope }}").unwrap();
        assert!(tpl.render(&Vars::new()).is_err());
    }
}
