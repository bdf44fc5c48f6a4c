//! Tokenized path templates.
//!
//! A template is a path pattern with embedded `{Field}` tokens, for
//! example:
//!
//! ```text
//! sequences/{Sequence}/{Shot}/{Segment}/v{version:03d}/{Shot}.{frame:04d}.exr
//! ```
//!
//! Numeric tokens may carry a zero-padding format spec (`{version:03d}`).
//! Templates support three operations: substituting a field map into the
//! pattern (`apply_fields`), recovering a field map from a concrete path
//! (`get_fields`), and checking whether a path conforms (`validate`).

use std::collections::BTreeMap;
use std::fmt;

/// Field values carried in and out of templates.
pub type FieldMap = BTreeMap<String, String>;

/// Errors raised by template parsing and resolution.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Malformed template '{template}': {message}")]
    Parse { template: String, message: String },

    #[error("Missing field '{field}' while applying template '{template}' (have: {available})")]
    MissingField {
        template: String,
        field: String,
        available: String,
    },

    #[error("Path '{path}' does not match template '{template}'")]
    NoMatch { template: String, path: String },

    #[error("Unknown template '{name}'")]
    UnknownTemplate { name: String },
}

/// One parsed token of a template pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Field {
        name: String,
        /// Zero-padding width for numeric fields, from a `:0Nd` spec.
        padding: Option<usize>,
    },
}

/// A parsed path template.
#[derive(Debug, Clone)]
pub struct Template {
    raw: String,
    tokens: Vec<Token>,
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Template {
    /// Parse a template pattern.
    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '{' {
                if c == '}' {
                    return Err(TemplateError::Parse {
                        template: pattern.to_string(),
                        message: "unbalanced '}'".to_string(),
                    });
                }
                literal.push(c);
                continue;
            }

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }

            let mut body = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                body.push(c);
            }
            if !closed {
                return Err(TemplateError::Parse {
                    template: pattern.to_string(),
                    message: "unterminated '{'".to_string(),
                });
            }

            let (name, padding) = match body.split_once(':') {
                None => (body.as_str(), None),
                Some((name, spec)) => {
                    let padding = parse_format_spec(spec).ok_or_else(|| TemplateError::Parse {
                        template: pattern.to_string(),
                        message: format!("unsupported format spec '{spec}'"),
                    })?;
                    (name, Some(padding))
                }
            };
            if name.is_empty() {
                return Err(TemplateError::Parse {
                    template: pattern.to_string(),
                    message: "empty field name".to_string(),
                });
            }
            tokens.push(Token::Field {
                name: name.to_string(),
                padding,
            });
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            raw: pattern.to_string(),
            tokens,
        })
    }

    /// The original pattern string.
    pub fn pattern(&self) -> &str {
        &self.raw
    }

    /// Names of all fields referenced by this template, in order of first use.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for token in &self.tokens {
            if let Token::Field { name, .. } = token {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Zero-padding width declared for a field, if any.
    pub fn field_padding(&self, field: &str) -> Option<usize> {
        self.tokens.iter().find_map(|t| match t {
            Token::Field { name, padding } if name == field => *padding,
            _ => None,
        })
    }

    /// Substitute a field map into the pattern.
    ///
    /// Numeric fields with a padding spec are zero-padded. Every field
    /// referenced by the template must be present in the map.
    pub fn apply_fields(&self, fields: &FieldMap) -> Result<String, TemplateError> {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Field { name, padding } => {
                    let value =
                        fields
                            .get(name)
                            .ok_or_else(|| TemplateError::MissingField {
                                template: self.raw.clone(),
                                field: name.clone(),
                                available: fields
                                    .keys()
                                    .cloned()
                                    .collect::<Vec<_>>()
                                    .join(", "),
                            })?;
                    match (padding, value.parse::<u64>()) {
                        (Some(width), Ok(n)) => out.push_str(&format!("{n:0width$}")),
                        _ => out.push_str(value),
                    }
                }
            }
        }
        Ok(out)
    }

    /// Recover the field map from a concrete path.
    ///
    /// Fields are matched non-greedily up to the next literal fragment;
    /// padded fields must be all digits. A field appearing twice must
    /// resolve to the same value both times.
    pub fn get_fields(&self, path: &str) -> Result<FieldMap, TemplateError> {
        let mut fields = FieldMap::new();
        let mut pos = 0usize;
        let no_match = || TemplateError::NoMatch {
            template: self.raw.clone(),
            path: path.to_string(),
        };

        let mut iter = self.tokens.iter().peekable();
        while let Some(token) = iter.next() {
            match token {
                Token::Literal(lit) => {
                    if !path[pos..].starts_with(lit.as_str()) {
                        return Err(no_match());
                    }
                    pos += lit.len();
                }
                Token::Field { name, padding } => {
                    let end = match iter.peek() {
                        Some(Token::Literal(next)) => {
                            pos + path[pos..].find(next.as_str()).ok_or_else(no_match)?
                        }
                        // Two adjacent fields are ambiguous; a padded field
                        // consumes exactly its width, otherwise bail.
                        Some(Token::Field { .. }) => match padding {
                            Some(width) => pos + width,
                            None => return Err(no_match()),
                        },
                        None => path.len(),
                    };
                    if end == pos {
                        return Err(no_match());
                    }
                    // A padded width is a byte count; a slice end past the
                    // path or inside a multibyte character is a non-match,
                    // not a panic.
                    let Some(value) = path.get(pos..end) else {
                        return Err(no_match());
                    };
                    if padding.is_some() && !value.chars().all(|c| c.is_ascii_digit()) {
                        return Err(no_match());
                    }
                    if value.contains('/') {
                        return Err(no_match());
                    }
                    match fields.get(name) {
                        Some(existing) if existing != value => return Err(no_match()),
                        _ => {
                            fields.insert(name.clone(), value.to_string());
                        }
                    }
                    pos = end;
                }
            }
        }

        if pos != path.len() {
            return Err(no_match());
        }
        Ok(fields)
    }

    /// Whether a concrete path conforms to this template.
    pub fn validate(&self, path: &str) -> bool {
        self.get_fields(path).is_ok()
    }

    /// Rewrite the pattern into another token syntax: literals pass
    /// through unchanged, each field is replaced by `f(name)`. A field
    /// the mapping does not know is a missing-field error.
    pub fn transcribe<F>(&self, mut f: F) -> Result<String, TemplateError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Field { name, .. } => match f(name) {
                    Some(replacement) => out.push_str(&replacement),
                    None => {
                        return Err(TemplateError::MissingField {
                            template: self.raw.clone(),
                            field: name.clone(),
                            available: "(token mapping)".to_string(),
                        })
                    }
                },
            }
        }
        Ok(out)
    }
}

/// Parse a `0Nd` style format spec into a padding width.
fn parse_format_spec(spec: &str) -> Option<usize> {
    let digits = spec.strip_prefix('0')?.strip_suffix('d')?;
    digits.parse().ok()
}

/// Named template registry, preserving configuration order.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    order: Vec<String>,
    templates: std::collections::HashMap<String, Template>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(name, pattern)` pairs, keeping their order.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut set = Self::new();
        for (name, pattern) in pairs {
            set.insert(name, Template::parse(pattern)?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, name: impl Into<String>, template: Template) {
        let name = name.into();
        if !self.templates.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.templates.insert(name, template);
    }

    /// Look up a template; unknown names are a configuration-level error.
    pub fn get(&self, name: &str) -> Result<&Template, TemplateError> {
        self.templates
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Iterate templates in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), &self.templates[name]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
