//! Distinguished names. An entry's identity is a sequence of relative distinguished names
//! (RDNs), leftmost first, written in the RFC 4514 string form:
//!
//! ```text
//! cn=Alice Smith+uid=alice,ou=People,dc=example,dc=com
//! ```
//!
//! Only the structure is checked here: each RDN must hold one or more `type=value` pairs.
//! Values keep their escapes exactly as written, so rendering a parsed name gives back
//! the same text modulo whitespace around the separators.

use std::fmt;
use std::str::FromStr;

use crate::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Dn {
    rdns: Vec<String>,
}

impl Dn {
    /// The empty (root) name.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of RDNs in the name.
    pub fn depth(&self) -> usize {
        self.rdns.len()
    }

    /// The RDN `level` steps from the left, so `rdn(0)` is the entry's own RDN.
    pub fn rdn(&self, level: usize) -> Option<&str> {
        self.rdns.get(level).map(|s| s.as_str())
    }

    /// The name of the parent entry, the whole name minus its leftmost RDN.
    pub fn ancestors(&self) -> String {
        self.rdns.iter().skip(1).cloned().collect::<Vec<_>>().join(",")
    }

    pub fn rdns(&self) -> &[String] {
        &self.rdns
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rdns.join(","))
    }
}

impl FromStr for Dn {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Dn::root());
        }

        let rdns = split_unescaped(s, ',')?
            .into_iter()
            .map(|rdn| {
                let rdn = rdn.trim();
                validate_rdn(rdn).map(|_| rdn.to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dn { rdns })
    }
}

impl TryFrom<&str> for Dn {
    type Error = OperationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Dn::from_str(s)
    }
}

fn invalid(s: &str, why: &str) -> OperationError {
    OperationError::InvalidDistinguishedName(format!("'{s}' {why}"))
}

/// Split on `sep` where it is neither escaped with a backslash nor inside a quoted value.
fn split_unescaped(s: &str, sep: char) -> Result<Vec<&str>, OperationError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut quoted = false;

    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            c if c == sep && !quoted => {
                parts.push(&s[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    if escaped {
        return Err(invalid(s, "ends with a dangling escape"));
    }
    if quoted {
        return Err(invalid(s, "has an unterminated quoted value"));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn validate_rdn(rdn: &str) -> Result<(), OperationError> {
    if rdn.is_empty() {
        return Err(invalid(rdn, "contains an empty rdn"));
    }

    for ava in split_unescaped(rdn, '+')? {
        let (atype, _value) = ava
            .split_once('=')
            .ok_or_else(|| invalid(ava, "is missing '=' between type and value"))?;
        let atype = atype.trim();
        if !is_valid_attribute_type(atype) {
            return Err(invalid(ava, "has an invalid attribute type"));
        }
    }
    Ok(())
}

// RFC 4512 descr (keystring) or numericoid.
fn is_valid_attribute_type(atype: &str) -> bool {
    let mut chars = atype.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        Some(c) if c.is_ascii_digit() => atype
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())),
        _ => false,
    }
}
