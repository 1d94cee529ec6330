//! Selection criteria for bindable elements.
//!
//! A small CSS subset: type, `#id` and `.class` compounds, the universal
//! `*`, descendant and child (`>`) combinators, and comma separated lists.
use std::{fmt, str::FromStr};

use smallvec::SmallVec;

/// Read-only view of an element hierarchy that selectors can be matched
/// against.
pub trait ElementTree {
    type Node: Copy;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Tag name, or `None` when `node` is not an element at all.
    fn tag(&self, node: Self::Node) -> Option<&str>;

    fn id(&self, node: Self::Node) -> Option<&str>;

    fn has_class(&self, node: Self::Node, class: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    EmptyEntry { position: usize },
    UnexpectedChar { ch: char, position: usize },
    MissingIdentifier { sigil: char, position: usize },
    DanglingCombinator { position: usize },
    DuplicateId { position: usize },
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "selector is empty"),
            Self::EmptyEntry { position } => {
                write!(f, "empty selector in list at offset {position}")
            }
            Self::UnexpectedChar { ch, position } => {
                write!(f, "unexpected `{ch}` at offset {position}")
            }
            Self::MissingIdentifier { sigil, position } => {
                write!(f, "expected a name after `{sigil}` at offset {position}")
            }
            Self::DanglingCombinator { position } => {
                write!(f, "combinator at offset {position} has nothing on its right")
            }
            Self::DuplicateId { position } => {
                write!(f, "second `#id` in one compound at offset {position}")
            }
        }
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One compound such as `span#tip.popup`. All fields empty means `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: SmallVec<[String; 2]>,
}

impl Compound {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        let Some(tag) = tree.tag(node) else {
            return false;
        };
        if self
            .tag
            .as_deref()
            .is_some_and(|expected| !expected.eq_ignore_ascii_case(tag))
        {
            return false;
        }
        if let Some(id) = &self.id {
            if tree.id(node) != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| tree.has_class(node, class))
    }
}

/// Compounds joined by combinators; `combinators[i]` sits between
/// `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        self.matches_at(tree, node, self.compounds.len() - 1)
    }

    fn matches_at<T: ElementTree + ?Sized>(&self, tree: &T, node: T::Node, index: usize) -> bool {
        if !self.compounds[index].matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|parent| self.matches_at(tree, parent, index - 1)),
            Combinator::Descendant => {
                // Every ancestor is a candidate, not only the nearest match.
                let mut cursor = tree.parent(node);
                while let Some(ancestor) = cursor {
                    if self.matches_at(tree, ancestor, index - 1) {
                        return true;
                    }
                    cursor = tree.parent(ancestor);
                }
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        if source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut parser = Parser::new(source);
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(parser.complex()?);
            parser.skip_whitespace();
            match parser.peek() {
                None => break,
                Some((_, ',')) => parser.bump(),
                Some((position, ch)) => return Err(SelectorError::UnexpectedChar { ch, position }),
            }
        }

        Ok(Self {
            source: source.trim().to_string(),
            alternatives,
        })
    }

    /// `.class` on its own.
    pub fn class(class: &str) -> Self {
        Self {
            source: format!(".{class}"),
            alternatives: vec![Complex {
                compounds: vec![Compound {
                    classes: SmallVec::from_iter([class.to_string()]),
                    ..Default::default()
                }],
                combinators: Vec::new(),
            }],
        }
    }

    /// `#id .class`, built directly so `id` needs no escaping.
    pub fn scoped_class(id: &str, class: &str) -> Self {
        let scope = Compound {
            id: Some(id.to_string()),
            ..Default::default()
        };
        let popup = Compound {
            classes: SmallVec::from_iter([class.to_string()]),
            ..Default::default()
        };

        Self {
            source: format!("#{id} .{class}"),
            alternatives: vec![Complex {
                compounds: vec![scope, popup],
                combinators: vec![Combinator::Descendant],
            }],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches(tree, node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || (!ch.is_ascii() && !ch.is_whitespace())
}

struct Parser<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) {
        self.chars.next();
    }

    fn position(&mut self) -> usize {
        self.peek().map_or(self.source.len(), |(position, _)| position)
    }

    /// Returns whether any whitespace was consumed.
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(|(_, ch)| ch.is_whitespace()) {
            self.bump();
            skipped = true;
        }
        skipped
    }

    fn ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some((_, ch)) = self.peek().filter(|(_, ch)| is_ident_char(*ch)) {
            ident.push(ch);
            self.bump();
        }
        ident
    }

    fn required_ident(&mut self, sigil: char, position: usize) -> Result<String, SelectorError> {
        let ident = self.ident();
        if ident.is_empty() {
            return Err(SelectorError::MissingIdentifier { sigil, position });
        }
        Ok(ident)
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut complex = Complex {
            compounds: vec![self.compound()?],
            combinators: Vec::new(),
        };

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some((_, ',')) => break,
                Some((position, '>')) => {
                    self.bump();
                    self.skip_whitespace();
                    if matches!(self.peek(), None | Some((_, ','))) {
                        return Err(SelectorError::DanglingCombinator { position });
                    }
                    Combinator::Child
                }
                Some(_) if had_whitespace => Combinator::Descendant,
                Some((position, ch)) => return Err(SelectorError::UnexpectedChar { ch, position }),
            };
            complex.combinators.push(combinator);
            complex.compounds.push(self.compound()?);
        }

        Ok(complex)
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.position();
        let mut compound = Compound::default();
        let mut consumed = false;

        match self.peek() {
            Some((_, '*')) => {
                self.bump();
                consumed = true;
            }
            Some((_, ch)) if is_ident_char(ch) => {
                compound.tag = Some(self.ident());
                consumed = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some((position, '#')) => {
                    self.bump();
                    let id = self.required_ident('#', position)?;
                    if compound.id.is_some() {
                        return Err(SelectorError::DuplicateId { position });
                    }
                    compound.id = Some(id);
                }
                Some((position, '.')) => {
                    self.bump();
                    compound.classes.push(self.required_ident('.', position)?);
                }
                _ => break,
            }
            consumed = true;
        }

        if !consumed {
            return Err(match self.peek() {
                None | Some((_, ',')) => SelectorError::EmptyEntry { position: start },
                Some((position, ch)) => SelectorError::UnexpectedChar { ch, position },
            });
        }
        Ok(compound)
    }
}
