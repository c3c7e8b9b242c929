//! Template text to [`TemplateToken`]s.
//!
//! ```text
//! SELECT * FROM t [[WHERE age > {{minAge}}]]
//! └─ Text ──────┘ └─ OptionalGroup ───────┘
//!                    ├─ Text "WHERE age > "
//!                    └─ ParamRef "minAge"
//! ```
//!
//! Optional groups nest. Parameter names are trimmed and limited to
//! letters, digits, `_`, `-` and `.`.

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateToken {
    Text(String),
    ParamRef(String),
    OptionalGroup(Vec<TemplateToken>),
}

impl TemplateToken {
    pub fn text(s: impl Into<String>) -> Self {
        TemplateToken::Text(s.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        TemplateToken::ParamRef(name.into())
    }
}

/// Names of every parameter referenced in `tokens`, including inside groups.
pub fn referenced_params(tokens: &[TemplateToken]) -> Vec<&str> {
    let mut names = Vec::new();
    collect_params(tokens, &mut names);
    names
}

fn collect_params<'a>(tokens: &'a [TemplateToken], names: &mut Vec<&'a str>) {
    for token in tokens {
        match token {
            TemplateToken::Text(_) => {}
            TemplateToken::ParamRef(name) => names.push(name),
            TemplateToken::OptionalGroup(children) => collect_params(children, names),
        }
    }
}

/// Template syntax errors. Offsets are byte positions in the template text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateSyntaxError {
    #[error("Unterminated parameter reference at byte {offset}")]
    UnterminatedReference { offset: usize },

    #[error("Empty parameter reference at byte {offset}")]
    EmptyReference { offset: usize },

    #[error("Invalid parameter name '{name}' at byte {offset}")]
    InvalidName { name: String, offset: usize },

    #[error("Optional clause opened at byte {offset} is never closed")]
    UnclosedGroup { offset: usize },

    #[error("Unexpected ']]' at byte {offset}")]
    UnbalancedClose { offset: usize },
}

/// Parse template text.
pub fn parse_template(text: &str) -> Result<Vec<TemplateToken>, TemplateSyntaxError> {
    let mut parser = Parser::default();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        if rest.starts_with("{{") {
            let close = rest[2..]
                .find("}}")
                .ok_or(TemplateSyntaxError::UnterminatedReference { offset: pos })?;
            let name = rest[2..2 + close].trim();
            if name.is_empty() {
                return Err(TemplateSyntaxError::EmptyReference { offset: pos });
            }
            if !name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
            {
                return Err(TemplateSyntaxError::InvalidName {
                    name: name.to_string(),
                    offset: pos,
                });
            }
            parser.push(TemplateToken::param(name));
            pos += close + 4;
        } else if rest.starts_with("[[") {
            parser.open(pos);
            pos += 2;
        } else if rest.starts_with("]]") {
            parser.close(pos)?;
            pos += 2;
        } else {
            let ch = rest.chars().next().unwrap_or_default();
            parser.text.push(ch);
            pos += ch.len_utf8();
        }
    }

    parser.finish()
}

#[derive(Default)]
struct Parser {
    text: String,
    current: Vec<TemplateToken>,
    /// Enclosing token lists with the offset of their `[[`.
    open_groups: Vec<(usize, Vec<TemplateToken>)>,
}

impl Parser {
    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.current.push(TemplateToken::Text(text));
        }
    }

    fn push(&mut self, token: TemplateToken) {
        self.flush_text();
        self.current.push(token);
    }

    fn open(&mut self, offset: usize) {
        self.flush_text();
        let parent = std::mem::take(&mut self.current);
        self.open_groups.push((offset, parent));
    }

    fn close(&mut self, offset: usize) -> Result<(), TemplateSyntaxError> {
        let Some((_, parent)) = self.open_groups.pop() else {
            return Err(TemplateSyntaxError::UnbalancedClose { offset });
        };
        self.flush_text();
        let children = std::mem::replace(&mut self.current, parent);
        self.current.push(TemplateToken::OptionalGroup(children));
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<TemplateToken>, TemplateSyntaxError> {
        if let Some((offset, _)) = self.open_groups.last() {
            return Err(TemplateSyntaxError::UnclosedGroup { offset: *offset });
        }
        self.flush_text();
        Ok(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TemplateToken::*;

    #[test]
    fn test_parse_optional_clause() {
        let tokens = parse_template("SELECT * FROM t [[WHERE age > {{minAge}}]]").unwrap();
        assert_eq!(
            tokens,
            vec![
                TemplateToken::text("SELECT * FROM t "),
                OptionalGroup(vec![
                    TemplateToken::text("WHERE age > "),
                    TemplateToken::param("minAge"),
                ]),
            ]
        );
    }

    #[test]
    fn test_parse_nested_groups() {
        let tokens = parse_template("a[[b[[{{ c }}]]d]]").unwrap();
        assert_eq!(
            tokens,
            vec![
                TemplateToken::text("a"),
                OptionalGroup(vec![
                    TemplateToken::text("b"),
                    OptionalGroup(vec![TemplateToken::param("c")]),
                    TemplateToken::text("d"),
                ]),
            ]
        );
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse_template("SELECT 'é' { } [ ]").unwrap(),
            vec![TemplateToken::text("SELECT 'é' { } [ ]")]
        );
        assert!(parse_template("").unwrap().is_empty());
    }

    #[test]
    fn test_referenced_params() {
        let tokens = parse_template("{{a}} [[{{b}} [[{{c}}]]]] {{a}}").unwrap();
        assert_eq!(referenced_params(&tokens), vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            parse_template("x {{a"),
            Err(TemplateSyntaxError::UnterminatedReference { offset: 2 })
        );
        assert_eq!(
            parse_template("{{  }}"),
            Err(TemplateSyntaxError::EmptyReference { offset: 0 })
        );
        assert_eq!(
            parse_template("ab [[c"),
            Err(TemplateSyntaxError::UnclosedGroup { offset: 3 })
        );
        assert_eq!(
            parse_template("a]]"),
            Err(TemplateSyntaxError::UnbalancedClose { offset: 1 })
        );
        assert!(matches!(
            parse_template("{{a b}}"),
            Err(TemplateSyntaxError::InvalidName { .. })
        ));
    }
}
