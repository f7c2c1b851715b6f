use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The batch deadline elapsed before every dispatched work item settled.
    /// Results recorded before expiry are discarded along with the rest.
    #[error("batch timed out after {0:?}")]
    BatchTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::BatchTimeout(Duration::from_millis(250));
        assert_eq!(error.to_string(), "batch timed out after 250ms");
    }
}
