//! Status Map
//!
//! Bidirectional mapping between canonical status names and the textual or
//! symbolic forms a document uses for them. The first representation listed
//! for a canonical status is the one written back to disk.

use std::collections::HashMap;

/// Built-in statuses: glyph, bracket form, all-caps word, in write-preference order.
const DEFAULT_STATUSES: &[(&str, [&str; 3])] = &[
    ("complete", ["\u{2705}", "[x]", "DONE"]),
    ("in_progress", ["\u{1f504}", "[~]", "WIP"]),
    ("pending", ["\u{23f3}", "[ ]", "TODO"]),
    ("blocked", ["\u{1f6ab}", "[!]", "BLOCKED"]),
    ("failed", ["\u{274c}", "[F]", "FAILED"]),
    ("cancelled", ["\u{2298}", "[-]", "CANCELLED"]),
];

/// A status marker found at the start of a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPrefix<'a> {
    pub canonical: &'a str,
    pub raw: &'a str,
    /// Heading text after the marker, leading whitespace removed
    pub rest: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMap {
    /// canonical -> representations, in table order
    forward: Vec<(String, Vec<String>)>,
    /// every representation and every canonical name -> canonical
    reverse: HashMap<String, String>,
}

impl StatusMap {
    /// Build a map from an ordered canonical -> representations table.
    pub fn from_raw<I, R>(raw: I) -> Self
    where
        I: IntoIterator<Item = (String, R)>,
        R: IntoIterator<Item = String>,
    {
        let mut forward: Vec<(String, Vec<String>)> = Vec::new();
        let mut reverse = HashMap::new();

        for (canonical, representations) in raw {
            let representations: Vec<String> = representations.into_iter().collect();
            for repr in &representations {
                reverse.insert(repr.clone(), canonical.clone());
            }
            reverse.insert(canonical.clone(), canonical.clone());

            match forward.iter_mut().find(|(c, _)| *c == canonical) {
                Some((_, existing)) => *existing = representations,
                None => forward.push((canonical, representations)),
            }
        }

        Self { forward, reverse }
    }

    /// Look up the canonical status for any representation or canonical name.
    pub fn canonicalize(&self, repr: &str) -> Option<&str> {
        self.reverse.get(repr).map(String::as_str)
    }

    /// Preferred on-disk form of a canonical status.
    pub fn write_form(&self, canonical: &str) -> Option<&str> {
        self.representations(canonical)
            .and_then(|reprs| reprs.first())
            .map(String::as_str)
    }

    pub fn representations(&self, canonical: &str) -> Option<&[String]> {
        self.forward
            .iter()
            .find(|(c, _)| c == canonical)
            .map(|(_, reprs)| reprs.as_slice())
    }

    /// Canonical statuses in table order.
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.forward.iter().map(|(c, _)| c.as_str())
    }

    /// Match a status representation at the start of `s`.
    ///
    /// The longest matching representation wins; among equally long matches
    /// the one earliest in table order is kept.
    pub fn match_prefix<'a>(&'a self, s: &'a str) -> Option<StatusPrefix<'a>> {
        let mut best: Option<(&'a str, &'a str)> = None;

        for (canonical, representations) in &self.forward {
            for repr in representations {
                if repr.is_empty() || !s.starts_with(repr.as_str()) {
                    continue;
                }
                let longer = best.map_or(true, |(_, b)| repr.len() > b.len());
                if longer {
                    best = Some((canonical.as_str(), repr.as_str()));
                }
            }
        }

        best.map(|(canonical, raw)| StatusPrefix {
            canonical,
            raw,
            rest: s[raw.len()..].trim_start(),
        })
    }

    /// Remove a leading status representation, if any.
    pub fn strip_prefix<'a>(&'a self, s: &'a str) -> &'a str {
        match self.match_prefix(s) {
            Some(prefix) => prefix.rest,
            None => s,
        }
    }
}

impl Default for StatusMap {
    fn default() -> Self {
        Self::from_raw(DEFAULT_STATUSES.iter().map(|(canonical, reprs)| {
            (
                canonical.to_string(),
                reprs.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
            )
        }))
    }
}
