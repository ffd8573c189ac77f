//! Operation kinds and result-type descriptors.
use hlsfuzz_utils::{Error, FuzzResult};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Kind of computation performed by an [`OpNode`](crate::OpNode).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
    Serialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OpKind {
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // bitwise
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,
    // relational
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    // memory
    Visit,
    Write,
}

impl OpKind {
    /// Kinds the default generator draws from. Division and modulo are
    /// supported by the code generator but never sampled.
    pub const SAMPLED: [OpKind; 15] = [
        OpKind::Add,
        OpKind::Sub,
        OpKind::Mul,
        OpKind::And,
        OpKind::Or,
        OpKind::Xor,
        OpKind::Not,
        OpKind::Shl,
        OpKind::Shr,
        OpKind::Eq,
        OpKind::Neq,
        OpKind::Lt,
        OpKind::Gt,
        OpKind::Le,
        OpKind::Ge,
    ];

    pub fn is_unary(&self) -> bool {
        matches!(self, OpKind::Not)
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, OpKind::Visit | OpKind::Write)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, OpKind::Shl | OpKind::Shr)
    }

    /// Number of operand edges an op of this kind consumes.
    pub fn arity(&self) -> usize {
        match self {
            OpKind::Not => 1,
            OpKind::Visit | OpKind::Write => 0,
            _ => 2,
        }
    }

    /// The C++ operator for this kind, if it has one.
    pub fn operator(&self) -> Option<&'static str> {
        let op = match self {
            OpKind::Add => "+",
            OpKind::Sub => "-",
            OpKind::Mul => "*",
            OpKind::Div => "/",
            OpKind::Mod => "%",
            OpKind::And => "&",
            OpKind::Or => "|",
            OpKind::Xor => "^",
            OpKind::Not => "~",
            OpKind::Shl => "<<",
            OpKind::Shr => ">>",
            OpKind::Eq => "==",
            OpKind::Neq => "!=",
            OpKind::Lt => "<",
            OpKind::Gt => ">",
            OpKind::Le => "<=",
            OpKind::Ge => ">=",
            OpKind::Visit | OpKind::Write => return None,
        };
        Some(op)
    }
}

/// Numeric representation of a value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    Display,
    Serialize,
)]
pub enum NumericKind {
    /// Signed fixed-width integer.
    #[strum(serialize = "ap_int")]
    Int,
    /// Unsigned fixed-width integer.
    #[strum(serialize = "ap_uint")]
    UInt,
    /// Fixed-point number.
    #[strum(serialize = "ap_fixed")]
    Fixed,
}

/// Fixed-point quantization mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display,
)]
pub enum RoundingMode {
    #[strum(serialize = "AP_RND")]
    Rnd,
    #[strum(serialize = "AP_RND_ZERO")]
    RndZero,
    #[strum(serialize = "AP_RND_MIN_INF")]
    RndMinInf,
    #[strum(serialize = "AP_RND_INF")]
    RndInf,
    #[strum(serialize = "AP_RND_CONV")]
    RndConv,
    #[strum(serialize = "AP_TRN")]
    Trn,
    #[strum(serialize = "AP_TRN_ZERO")]
    TrnZero,
}

/// Fixed-point overflow mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display,
)]
pub enum OverflowMode {
    #[strum(serialize = "AP_SAT")]
    Sat,
    #[strum(serialize = "AP_SAT_ZERO")]
    SatZero,
    #[strum(serialize = "AP_SAT_SYM")]
    SatSym,
    #[strum(serialize = "AP_WRAP")]
    Wrap,
    #[strum(serialize = "AP_WRAP_SM")]
    WrapSm,
}

/// Block-memory port configuration of an array argument.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    EnumString,
    Display,
)]
pub enum PortType {
    #[default]
    #[strum(serialize = "RAM_1P")]
    Ram1P,
    #[strum(serialize = "RAM_1WNR")]
    Ram1Wnr,
    #[strum(serialize = "RAM_2P")]
    Ram2P,
    #[strum(serialize = "RAM_S2P")]
    RamS2P,
    #[strum(serialize = "RAM_T2P")]
    RamT2P,
    #[strum(serialize = "ROM_1P")]
    Rom1P,
    #[strum(serialize = "ROM_2P")]
    Rom2P,
    #[strum(serialize = "ROM_NP")]
    RomNP,
}

/// Type of the value produced by an op or stored in an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultType {
    pub kind: NumericKind,
    /// Total width in bits.
    pub width: u32,
    /// Integer part of a fixed-point number. Equal to `width` for integers.
    pub int_width: u32,
    pub rounding: Option<RoundingMode>,
    pub overflow: Option<OverflowMode>,
}

impl ResultType {
    pub fn int(width: u32) -> Self {
        Self {
            kind: NumericKind::Int,
            width,
            int_width: width,
            rounding: None,
            overflow: None,
        }
    }

    pub fn uint(width: u32) -> Self {
        Self {
            kind: NumericKind::UInt,
            width,
            int_width: width,
            rounding: None,
            overflow: None,
        }
    }

    pub fn fixed(
        width: u32,
        int_width: u32,
        rounding: RoundingMode,
        overflow: OverflowMode,
    ) -> Self {
        Self {
            kind: NumericKind::Fixed,
            width,
            int_width,
            rounding: Some(rounding),
            overflow: Some(overflow),
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.kind == NumericKind::Fixed
    }

    /// Check the descriptor is well formed.
    pub fn validate(&self) -> FuzzResult<()> {
        if self.width == 0 {
            return Err(Error::invalid_argument(format!(
                "{} must have a positive width",
                self.kind
            )));
        }
        if self.is_fixed() {
            if self.int_width == 0 || self.int_width > self.width {
                return Err(Error::invalid_argument(format!(
                    "ap_fixed integer width {} is not in [1, {}]",
                    self.int_width, self.width
                )));
            }
            if self.rounding.is_none() {
                return Err(Error::invalid_argument(
                    "ap_fixed requires a rounding mode",
                ));
            }
            if self.overflow.is_none() {
                return Err(Error::invalid_argument(
                    "ap_fixed requires an overflow mode",
                ));
            }
        }
        Ok(())
    }

    /// The C++ type used to declare a value of this type.
    pub fn spelling(&self) -> FuzzResult<String> {
        self.validate()?;
        Ok(match (self.kind, self.rounding, self.overflow) {
            (NumericKind::Fixed, Some(rnd), Some(ovf)) => format!(
                "ap_fixed<{},{},{rnd},{ovf}>",
                self.width, self.int_width
            ),
            (kind, _, _) => format!("{kind}<{}>", self.width),
        })
    }
}
