//! Guard clauses for validation code

/// Returns `Err($err)` from the enclosing function unless `$cond` holds
///
/// Every admission check reads as a list of these guards.
///
/// ```
/// # use ensure_macro::ensure;
/// #[derive(Debug, PartialEq)]
/// enum CheckError {
///     NonceTooLow,
///     NonceTooHigh,
/// }
///
/// fn check_nonce(expected: u64, nonce: u64) -> Result<(), CheckError> {
///     ensure!(expected <= nonce, CheckError::NonceTooLow);
///     ensure!(expected >= nonce, CheckError::NonceTooHigh,);
///     Ok(())
/// }
///
/// assert_eq!(check_nonce(3, 3), Ok(()));
/// assert_eq!(check_nonce(3, 2), Err(CheckError::NonceTooLow));
/// assert_eq!(check_nonce(3, 4), Err(CheckError::NonceTooHigh));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err);
        }
    };
}
