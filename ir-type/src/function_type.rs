use core::fmt;

use smallvec::SmallVec;

use super::Type;

/// The signature of a function: what it consumes and what it produces.
///
/// A value of function type is always a reference to the function, never the
/// function itself; calling through it requires no indirection beyond the
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    /// The parameter types of this function
    pub params: SmallVec<[Type; 4]>,
    /// The result types of this function
    pub results: SmallVec<[Type; 1]>,
}

impl FunctionType {
    pub fn new(
        params: impl IntoIterator<Item = Type>,
        results: impl IntoIterator<Item = Type>,
    ) -> Self {
        Self {
            params: params.into_iter().collect(),
            results: results.into_iter().collect(),
        }
    }

    /// The number of parameters a call must supply
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[Type] {
        self.params.as_slice()
    }

    pub fn results(&self) -> &[Type] {
        self.results.as_slice()
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_list(f: &mut fmt::Formatter<'_>, tys: &[Type]) -> fmt::Result {
            for (i, ty) in tys.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{ty}")?;
            }
            Ok(())
        }

        f.write_str("fn(")?;
        write_list(f, self.params())?;
        f.write_str(")")?;
        match self.results() {
            [] => Ok(()),
            [result] => write!(f, " -> {result}"),
            results => {
                f.write_str(" -> (")?;
                write_list(f, results)?;
                f.write_str(")")
            }
        }
    }
}
