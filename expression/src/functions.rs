use serde::{Deserialize, Serialize};

/// The functions an expression may call. Nothing outside this list is reachable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log10,
    Log2,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Sign,
    Atan2,
    Pow,
    Min,
    Max,
    Hypot,
}

impl Function {
    pub const NAMES: [&'static str; 24] = [
        "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "exp", "ln", "log",
        "log10", "log2", "sqrt", "abs", "floor", "ceil", "sign", "atan2", "pow", "min", "max",
        "hypot",
    ];

    /// Looks up a function by the name used in expressions. `log` is the natural log.
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            "exp" => Self::Exp,
            "ln" | "log" => Self::Ln,
            "log10" => Self::Log10,
            "log2" => Self::Log2,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "sign" => Self::Sign,
            "atan2" => Self::Atan2,
            "pow" => Self::Pow,
            "min" => Self::Min,
            "max" => Self::Max,
            "hypot" => Self::Hypot,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log10 => "log10",
            Self::Log2 => "log2",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Sign => "sign",
            Self::Atan2 => "atan2",
            Self::Pow => "pow",
            Self::Min => "min",
            Self::Max => "max",
            Self::Hypot => "hypot",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Atan2 | Self::Pow | Self::Min | Self::Max | Self::Hypot => 2,
            _ => 1,
        }
    }

    /// Applies the function. `args` must hold exactly `arity()` values.
    pub(crate) fn apply(&self, args: &[f64]) -> f64 {
        match (self, args) {
            (Self::Sin, [x]) => x.sin(),
            (Self::Cos, [x]) => x.cos(),
            (Self::Tan, [x]) => x.tan(),
            (Self::Asin, [x]) => x.asin(),
            (Self::Acos, [x]) => x.acos(),
            (Self::Atan, [x]) => x.atan(),
            (Self::Sinh, [x]) => x.sinh(),
            (Self::Cosh, [x]) => x.cosh(),
            (Self::Tanh, [x]) => x.tanh(),
            (Self::Exp, [x]) => x.exp(),
            (Self::Ln, [x]) => x.ln(),
            (Self::Log10, [x]) => x.log10(),
            (Self::Log2, [x]) => x.log2(),
            (Self::Sqrt, [x]) => x.sqrt(),
            (Self::Abs, [x]) => x.abs(),
            (Self::Floor, [x]) => x.floor(),
            (Self::Ceil, [x]) => x.ceil(),
            // zero has no sign
            (Self::Sign, [x]) => {
                if *x == 0.0 {
                    0.0
                } else {
                    x.signum()
                }
            }
            (Self::Atan2, [y, x]) => y.atan2(*x),
            (Self::Pow, [x, y]) => x.powf(*y),
            (Self::Min, [x, y]) => x.min(*y),
            (Self::Max, [x, y]) => x.max(*y),
            (Self::Hypot, [x, y]) => x.hypot(*y),
            _ => f64::NAN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn every_listed_name_resolves() {
        for name in Function::NAMES {
            assert!(Function::from_name(name).is_some(), "{name}");
        }
        assert_eq!(Function::from_name("log"), Some(Function::Ln));
        assert_eq!(Function::from_name("eval"), None);
        assert_eq!(Function::from_name("Sin"), None);
    }

    #[test]
    fn arity_and_application() {
        assert_eq!(Function::Hypot.arity(), 2);
        assert_eq!(Function::Sqrt.arity(), 1);
        assert_abs_diff_eq!(Function::Hypot.apply(&[3.0, 4.0]), 5.0);
        assert_abs_diff_eq!(Function::Atan2.apply(&[1.0, 1.0]), std::f64::consts::FRAC_PI_4);
        assert_eq!(Function::Sign.apply(&[0.0]), 0.0);
        assert_eq!(Function::Sign.apply(&[-3.0]), -1.0);
        assert!(Function::Sin.apply(&[1.0, 2.0]).is_nan());
    }
}
