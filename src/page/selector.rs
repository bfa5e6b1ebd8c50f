//! Minimal CSS selector matching
//!
//! Supports what the page contract needs: type selectors, `.class`,
//! `[attr]` / `[attr="value"]`, compounds of those, and the descendant
//! combinator (whitespace).

use thiserror::Error;

use super::Element;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected character '{0}' in selector '{1}'")]
    Unexpected(char, String),

    #[error("Unterminated attribute selector in '{0}'")]
    UnterminatedAttribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

/// One compound selector, e.g. `div.about-header`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (element.attr(&a.name), &a.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}

/// A parsed selector: compounds joined by descendant combinators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compounds: Vec<Compound>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut compounds = Vec::new();
        let mut chars = source.trim().chars().peekable();
        let mut current: Option<Compound> = None;

        while let Some(&c) = chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    chars.next();
                    if let Some(compound) = current.take() {
                        compounds.push(compound);
                    }
                }
                '.' => {
                    chars.next();
                    let name = take_ident(&mut chars);
                    if name.is_empty() {
                        return Err(SelectorError::Unexpected('.', source.to_string()));
                    }
                    current.get_or_insert_with(Compound::default).classes.push(name);
                }
                '[' => {
                    chars.next();
                    let attr = parse_attr(&mut chars, source)?;
                    current.get_or_insert_with(Compound::default).attrs.push(attr);
                }
                c if is_ident_char(c) => {
                    let compound = current.get_or_insert_with(Compound::default);
                    if compound.tag.is_some()
                        || !compound.classes.is_empty()
                        || !compound.attrs.is_empty()
                    {
                        return Err(SelectorError::Unexpected(c, source.to_string()));
                    }
                    compound.tag = Some(take_ident(&mut chars));
                }
                other => return Err(SelectorError::Unexpected(other, source.to_string())),
            }
        }

        if let Some(compound) = current {
            compounds.push(compound);
        }
        if compounds.is_empty() {
            return Err(SelectorError::Empty);
        }

        Ok(Self {
            source: source.trim().to_string(),
            compounds,
        })
    }

    /// The selector text as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `element` matches, given its ancestors ordered root first
    pub fn matches(&self, element: &Element, ancestors: &[&Element]) -> bool {
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(element) {
            return false;
        }

        // Descendant-only chains can be matched greedily from the nearest ancestor up
        let mut remaining = rest.iter().rev().peekable();
        for ancestor in ancestors.iter().rev() {
            match remaining.peek() {
                Some(compound) if compound.matches(ancestor) => {
                    remaining.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        remaining.peek().is_none()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn parse_attr(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source: &str,
) -> Result<AttrMatch, SelectorError> {
    let name = take_ident(chars);
    if name.is_empty() {
        return Err(SelectorError::UnterminatedAttribute(source.to_string()));
    }

    match chars.next() {
        Some(']') => Ok(AttrMatch { name, value: None }),
        Some('=') => {
            let value = match chars.peek() {
                Some(&quote @ ('"' | '\'')) => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => break,
                            Some(c) => value.push(c),
                            None => {
                                return Err(SelectorError::UnterminatedAttribute(
                                    source.to_string(),
                                ))
                            }
                        }
                    }
                    value
                }
                _ => take_ident(chars),
            };
            match chars.next() {
                Some(']') => Ok(AttrMatch {
                    name,
                    value: Some(value),
                }),
                _ => Err(SelectorError::UnterminatedAttribute(source.to_string())),
            }
        }
        _ => Err(SelectorError::UnterminatedAttribute(source.to_string())),
    }
}
