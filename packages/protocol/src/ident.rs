//! GUID-shaped identifiers for functions and requests.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";
const GROUP_LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];

/// An opaque identifier naming an evaluator function or an in-flight request.
///
/// Generated identifiers are five hyphen-joined groups of lowercase hex
/// digits (`8-4-4-4-12`). They are drawn from a plain random source with no
/// clock or node component, so uniqueness is only probabilistic.
///
/// Identifiers received from elsewhere are accepted as-is; the evaluator
/// treats them as opaque keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Sample a fresh random identifier.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut out = String::with_capacity(36);
        for (i, len) in GROUP_LENGTHS.iter().enumerate() {
            if i > 0 {
                out.push('-');
            }
            for _ in 0..*len {
                out.push(HEX_DIGITS[rng.gen_range(0..16)] as char);
            }
        }
        Self(out)
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier has the generated `8-4-4-4-12` shape.
    pub fn is_well_formed(&self) -> bool {
        let groups: Vec<&str> = self.0.split('-').collect();
        groups.len() == GROUP_LENGTHS.len()
            && groups.iter().zip(GROUP_LENGTHS).all(|(group, len)| {
                group.len() == len && group.bytes().all(|b| HEX_DIGITS.contains(&b))
            })
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
