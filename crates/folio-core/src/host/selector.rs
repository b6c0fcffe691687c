//! Minimal CSS selector support
//!
//! Covers what the page controllers query: `tag`, `.class`, `#id`,
//! `tag[attr]`, `tag[attr="value"]`, compounds of those (`img.hero[loading="lazy"]`)
//! and comma-separated lists. Combinators are not supported.

use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};

/// Read access to the parts of an element a selector can test
pub trait Matchable {
    fn tag(&self) -> &str;
    fn element_id(&self) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
    fn attribute(&self, name: &str) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeTest {
    name: String,
    value: Option<String>,
}

/// One compound selector, e.g. `img.thumb[loading="lazy"]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attribute: Option<AttributeTest>,
}

impl Compound {
    pub fn matches(&self, element: &impl Matchable) -> bool {
        if let Some(ref tag) = self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(ref id) = self.id {
            if element.element_id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        match self.attribute {
            Some(AttributeTest {
                ref name,
                value: Some(ref expected),
            }) => element.attribute(name) == Some(expected.as_str()),
            Some(AttributeTest { ref name, value: None }) => element.attribute(name).is_some(),
            None => true,
        }
    }
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

fn compound_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?P<tag>[A-Za-z][A-Za-z0-9-]*)?(?P<rest>(?:[.#][A-Za-z_][\w-]*)*)(?:\[(?P<attr>[A-Za-z_][\w-]*)(?:=(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[\w-]+)))?\])?$"#,
        )
        .expect("compound selector regex is valid")
    })
}

fn part_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([.#])([A-Za-z_][\w-]*)").expect("selector part regex is valid"))
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let mut alternatives = Vec::new();
        for raw in source.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(Error::Selector(format!("empty selector in '{}'", source)));
            }
            alternatives.push(Self::parse_compound(raw)?);
        }
        Ok(Self {
            source: source.trim().to_string(),
            alternatives,
        })
    }

    fn parse_compound(raw: &str) -> Result<Compound> {
        let caps = compound_regex()
            .captures(raw)
            .ok_or_else(|| Error::Selector(format!("unsupported selector '{}'", raw)))?;

        let mut compound = Compound {
            tag: caps.name("tag").map(|m| m.as_str().to_ascii_lowercase()),
            ..Default::default()
        };

        if let Some(rest) = caps.name("rest") {
            for part in part_regex().captures_iter(rest.as_str()) {
                let name = part[2].to_string();
                if &part[1] == "#" {
                    if compound.id.is_some() {
                        return Err(Error::Selector(format!("two ids in '{}'", raw)));
                    }
                    compound.id = Some(name);
                } else {
                    compound.classes.push(name);
                }
            }
        }

        if let Some(attr) = caps.name("attr") {
            let value = caps
                .name("dq")
                .or_else(|| caps.name("sq"))
                .or_else(|| caps.name("bare"))
                .map(|m| m.as_str().to_string());
            compound.attribute = Some(AttributeTest {
                name: attr.as_str().to_string(),
                value,
            });
        }

        if compound == Compound::default() {
            return Err(Error::Selector(format!("unsupported selector '{}'", raw)));
        }
        Ok(compound)
    }

    pub fn matches(&self, element: &impl Matchable) -> bool {
        self.alternatives.iter().any(|c| c.matches(element))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl std::str::FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
