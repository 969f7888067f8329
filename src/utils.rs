use core::convert::Infallible;

/// Unwrap Results that can be statically proven not to fail
pub trait InfallibleResult<T> {
    fn infallible(self) -> T;
}

impl<T> InfallibleResult<T> for Result<T, Infallible> {
    #[inline]
    fn infallible(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => match e {},
        }
    }
}
