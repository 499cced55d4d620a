//! The six joint degrees of freedom

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of degrees of freedom of an unconstrained rigid body
pub const NUM_DOF: usize = 6;

/// One axis of relative motion across a joint
///
/// The ordinal is the slot index in the element's local state: translations
/// first, then the XYZ rotation angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dof {
    X = 0,
    Y = 1,
    Z = 2,
    Alpha = 3,
    Beta = 4,
    Gamma = 5,
}

/// Symbolic name not one of `x, y, z, alpha, beta, gamma`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown degree of freedom '{0}'")]
pub struct ParseDofError(pub String);

impl Dof {
    /// All six degrees of freedom in ordinal order
    pub const ALL: [Dof; NUM_DOF] = [Dof::X, Dof::Y, Dof::Z, Dof::Alpha, Dof::Beta, Dof::Gamma];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Dof> {
        Self::ALL.get(index).copied()
    }

    pub fn is_rotational(self) -> bool {
        self.index() >= 3
    }

    pub fn is_translational(self) -> bool {
        !self.is_rotational()
    }

    /// Axis index (0 = x, 1 = y, 2 = z) within the translational or rotational triple
    pub fn axis(self) -> usize {
        self.index() % 3
    }

    pub fn name(self) -> &'static str {
        match self {
            Dof::X => "x",
            Dof::Y => "y",
            Dof::Z => "z",
            Dof::Alpha => "alpha",
            Dof::Beta => "beta",
            Dof::Gamma => "gamma",
        }
    }
}

impl fmt::Display for Dof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dof {
    type Err = ParseDofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Dof::ALL
            .iter()
            .copied()
            .find(|dof| dof.name() == lowered)
            .ok_or_else(|| ParseDofError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals() {
        for (i, dof) in Dof::ALL.iter().enumerate() {
            assert_eq!(dof.index(), i);
            assert_eq!(Dof::from_index(i), Some(*dof));
        }
        assert_eq!(Dof::from_index(6), None);
        assert!(Dof::Alpha.is_rotational());
        assert!(Dof::Z.is_translational());
        assert_eq!(Dof::Gamma.axis(), 2);
    }

    #[test]
    fn test_parse_symbolic_names() {
        assert_eq!("x".parse::<Dof>(), Ok(Dof::X));
        assert_eq!("Beta".parse::<Dof>(), Ok(Dof::Beta));
        assert_eq!(" GAMMA ".parse::<Dof>(), Ok(Dof::Gamma));
        assert!("roll".parse::<Dof>().is_err());

        for dof in Dof::ALL {
            assert_eq!(dof.to_string().parse::<Dof>(), Ok(dof));
        }
    }
}
