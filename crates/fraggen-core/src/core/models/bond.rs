use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical bond order a [`BondType`] maps to once a graph is turned into a molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NativeBondOrder {
    Single = 1,
    Double = 2,
    Triple = 3,
    Quadruple = 4,
}

/// Possible chemical bond types an edge can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondType {
    None,
    #[default]
    Undefined,
    Any,
    Single,
    Double,
    Triple,
    Quadruple,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid bond type '{0}'")]
pub struct ParseBondTypeError(pub String);

impl BondType {
    pub const ALL: [BondType; 7] = [
        BondType::None,
        BondType::Undefined,
        BondType::Any,
        BondType::Single,
        BondType::Double,
        BondType::Triple,
        BondType::Quadruple,
    ];

    /// Number of free connections consumed on each endpoint attachment point.
    pub const fn valence(self) -> u32 {
        match self {
            BondType::None | BondType::Undefined => 0,
            BondType::Any | BondType::Single => 1,
            BondType::Double => 2,
            BondType::Triple => 3,
            BondType::Quadruple => 4,
        }
    }

    pub const fn native_order(self) -> Option<NativeBondOrder> {
        match self {
            BondType::Any | BondType::Single => Some(NativeBondOrder::Single),
            BondType::Double => Some(NativeBondOrder::Double),
            BondType::Triple => Some(NativeBondOrder::Triple),
            BondType::Quadruple => Some(NativeBondOrder::Quadruple),
            BondType::None | BondType::Undefined => None,
        }
    }

    pub const fn has_native_analogue(self) -> bool {
        self.native_order().is_some()
    }

    /// Bond type of a plain bond order (`1..=4`).
    pub const fn from_order(order: u32) -> Option<BondType> {
        match order {
            1 => Some(BondType::Single),
            2 => Some(BondType::Double),
            3 => Some(BondType::Triple),
            4 => Some(BondType::Quadruple),
            _ => None,
        }
    }

    /// Code used by the graph text encoding.
    ///
    /// SINGLE..QUADRUPLE keep their historical digits. The remaining types have no fixed
    /// historical code; they get `8` (ANY), `-1` (NONE) and `0` (UNDEFINED).
    pub const fn legacy_code(self) -> &'static str {
        match self {
            BondType::Single => "1",
            BondType::Double => "2",
            BondType::Triple => "3",
            BondType::Quadruple => "4",
            BondType::Any => "8",
            BondType::None => "-1",
            BondType::Undefined => "0",
        }
    }

    pub fn from_legacy_code(code: &str) -> Result<BondType, ParseBondTypeError> {
        match code.trim() {
            "1" => Ok(BondType::Single),
            "2" => Ok(BondType::Double),
            "3" => Ok(BondType::Triple),
            "4" => Ok(BondType::Quadruple),
            "8" => Ok(BondType::Any),
            "-1" => Ok(BondType::None),
            "0" => Ok(BondType::Undefined),
            other => Err(ParseBondTypeError(other.to_string())),
        }
    }
}

impl FromStr for BondType {
    type Err = ParseBondTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(BondType::None),
            "undefined" => Ok(BondType::Undefined),
            "any" => Ok(BondType::Any),
            "s" | "single" => Ok(BondType::Single),
            "d" | "double" => Ok(BondType::Double),
            "t" | "triple" => Ok(BondType::Triple),
            "q" | "quadruple" => Ok(BondType::Quadruple),
            other => BondType::from_legacy_code(other),
        }
    }
}

impl fmt::Display for BondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                BondType::None => "NONE",
                BondType::Undefined => "UNDEFINED",
                BondType::Any => "ANY",
                BondType::Single => "SINGLE",
                BondType::Double => "DOUBLE",
                BondType::Triple => "TRIPLE",
                BondType::Quadruple => "QUADRUPLE",
            }
        )
    }
}
