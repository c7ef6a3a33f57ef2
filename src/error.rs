/// Turns a failed result into a logged `None` for callers that carry on.
pub trait ResultOkLogExt<T, E> {
    fn ok_log(self, context: &str) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn ok_log(self, context: &str) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{context}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_log_passes_values_through() {
        let ok: Result<u32, std::io::Error> = Ok(3);
        assert_eq!(ok.ok_log("reading"), Some(3));

        let err: Result<u32, std::io::Error> = Err(std::io::Error::other("boom"));
        assert_eq!(err.ok_log("reading"), None);
    }
}
