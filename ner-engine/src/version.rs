//! # Versão do motor
//!
//! Descritor estático da build, usado pelos hosts para diagnóstico e checagem
//! de compatibilidade. Os valores vêm do `Cargo.toml` em tempo de compilação.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Versão semântica `(major, minor, patch, prerelease)`.
///
/// A ordenação segue SemVer: uma versão com `prerelease` vem antes da mesma
/// versão sem `prerelease` (`1.0.0-rc1 < 1.0.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Rótulo de pré-lançamento; vazio em versões estáveis.
    pub prerelease: String,
}

impl Version {
    /// Versão da build atual. Pura e constante durante todo o processo.
    pub fn current() -> Self {
        Self {
            major: parse_component(env!("CARGO_PKG_VERSION_MAJOR")),
            minor: parse_component(env!("CARGO_PKG_VERSION_MINOR")),
            patch: parse_component(env!("CARGO_PKG_VERSION_PATCH")),
            prerelease: env!("CARGO_PKG_VERSION_PRE").to_string(),
        }
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }
}

fn parse_component(s: &str) -> u32 {
    s.parse().unwrap_or(0)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.prerelease.cmp(&other.prerelease),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.is_prerelease() {
            write!(f, "-{}", self.prerelease)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u32, minor: u32, patch: u32, pre: &str) -> Version {
        Version {
            major,
            minor,
            patch,
            prerelease: pre.to_string(),
        }
    }

    #[test]
    fn test_current_is_stable() {
        assert_eq!(Version::current(), Version::current());
        assert_eq!(Version::current().to_string(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_ordering() {
        assert!(v(1, 0, 0, "") > v(0, 9, 9, ""));
        assert!(v(1, 2, 0, "") < v(1, 10, 0, ""));
        assert!(v(1, 0, 0, "rc1") < v(1, 0, 0, ""));
        assert!(v(1, 0, 0, "alpha") < v(1, 0, 0, "beta"));
    }

    #[test]
    fn test_display_with_prerelease() {
        assert_eq!(v(1, 2, 3, "").to_string(), "1.2.3");
        assert_eq!(v(1, 2, 3, "devel").to_string(), "1.2.3-devel");
    }
}
