//! Template engine for variable substitution.
//!
//! Templates are parsed once into literal and variable segments. Parsing
//! checks every placeholder against the set of variables the caller can
//! supply, so rendering a parsed template cannot fail.
//!
//! # Syntax
//!
//! - `{name}` - Substitutes the value of variable `name`
//! - `{{` - Renders as literal `{`
//! - `}}` - Renders as literal `}`

use std::collections::HashMap;
use thiserror::Error;

/// Error type for template parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A variable was referenced that the renderer never provides.
    #[error("undefined variable '{name}' at position {position} in template")]
    UndefinedVariable {
        /// The name of the undefined variable.
        name: String,
        /// The position in the template where the variable was found.
        position: usize,
    },
    /// A `{` was found without a matching `}`.
    #[error("unmatched '{{' at position {position} in template")]
    UnmatchedBrace {
        /// The position of the unmatched `{`.
        position: usize,
    },
    /// An empty variable name was found (e.g., `{}`).
    #[error("empty variable name '{{}}' at position {position} in template")]
    EmptyVariableName {
        /// The position of the empty variable.
        position: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed, validated template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`, accepting only placeholders listed in `known`.
    pub fn parse(source: &str, known: &[&str]) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::with_capacity(source.len());
        let mut chars = source.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '{' => {
                    if let Some((_, '{')) = chars.peek() {
                        chars.next();
                        literal.push('{');
                        continue;
                    }

                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                        }
                    }

                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyVariableName { position: pos });
                    }
                    if !known.contains(&name) {
                        return Err(TemplateError::UndefinedVariable {
                            name: name.to_string(),
                            position: pos,
                        });
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(name.to_string()));
                }
                '}' => {
                    // `}}` collapses to one brace; a lone `}` is kept as-is.
                    if let Some((_, '}')) = chars.peek() {
                        chars.next();
                    }
                    literal.push('}');
                }
                _ => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// A template that renders `text` verbatim.
    pub fn literal(text: &str) -> Self {
        Self {
            segments: vec![Segment::Literal(text.to_string())],
        }
    }

    /// Substitute variables. Names absent from `vars` render as empty text.
    pub fn render(&self, vars: &HashMap<&str, String>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    if let Some(value) = vars.get(name.as_str()) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &["name", "greeting", "x", "a", "b", "code"];

    fn vars<'a>(pairs: &[(&'a str, &str)]) -> HashMap<&'a str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    fn render(source: &str, pairs: &[(&'static str, &str)]) -> String {
        Template::parse(source, KNOWN).unwrap().render(&vars(pairs))
    }

    #[test]
    fn test_simple_substitution() {
        let result = render("{greeting}, {name}!", &[("name", "Alice"), ("greeting", "Hello")]);
        assert_eq!(result, "Hello, Alice!");
    }

    #[test]
    fn test_no_variables() {
        assert_eq!(render("Just plain text", &[]), "Just plain text");
        assert_eq!(render("", &[]), "");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(render("Use {{name}} for variables", &[]), "Use {name} for variables");
        assert_eq!(render("a } b", &[]), "a } b");
    }

    #[test]
    fn test_undefined_variable_rejected_at_parse() {
        let err = Template::parse("Hello {unknown}", KNOWN).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UndefinedVariable {
                name: "unknown".to_string(),
                position: 6
            }
        );
    }

    #[test]
    fn test_unmatched_brace_error() {
        let err = Template::parse("Hello {name", KNOWN).unwrap_err();
        assert_eq!(err, TemplateError::UnmatchedBrace { position: 6 });
    }

    #[test]
    fn test_empty_variable_name_error() {
        let err = Template::parse("Hello {}", KNOWN).unwrap_err();
        assert_eq!(err, TemplateError::EmptyVariableName { position: 6 });
    }

    #[test]
    fn test_whitespace_in_variable_name() {
        assert_eq!(render("Hello { name }!", &[("name", "Alice")]), "Hello Alice!");
    }

    #[test]
    fn test_adjacent_and_repeated_variables() {
        assert_eq!(render("{a}{b}", &[("a", "A"), ("b", "B")]), "AB");
        assert_eq!(render("{x}-{x}-{x}", &[("x", "X")]), "X-X-X");
    }

    #[test]
    fn test_braces_in_value_are_not_reparsed() {
        let result = render("Code: {code}", &[("code", "if (x > 0) { return {x}; }")]);
        assert_eq!(result, "Code: if (x > 0) { return {x}; }");
    }

    #[test]
    fn test_missing_value_renders_empty() {
        assert_eq!(render("before{x}after", &[]), "beforeafter");
    }

    #[test]
    fn test_parse_splits_literals_and_variables() {
        let template = Template::parse("{a} and {b}", KNOWN).unwrap();
        assert_eq!(
            template.segments,
            vec![
                Segment::Variable("a".to_string()),
                Segment::Literal(" and ".to_string()),
                Segment::Variable("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_literal_template() {
        let template = Template::literal("{not a var}");
        assert_eq!(template.render(&HashMap::new()), "{not a var}");
    }

    #[test]
    fn test_unicode_in_template_and_values() {
        let result = render("チケット {x} 🎉", &[("x", "日本語")]);
        assert_eq!(result, "チケット 日本語 🎉");
    }

    #[test]
    fn test_error_display() {
        let err = TemplateError::UnmatchedBrace { position: 5 };
        assert_eq!(err.to_string(), "unmatched '{' at position 5 in template");

        let err = TemplateError::EmptyVariableName { position: 3 };
        assert_eq!(
            err.to_string(),
            "empty variable name '{}' at position 3 in template"
        );
    }
}
