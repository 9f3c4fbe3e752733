use rvmca_common::listing::ListingError;

use crate::instrument::InstrumentError;

macro_rules! bail {
    ($($arg:tt)*) => {
        return Err(crate::error::Error::from_display(format_args!($($arg)*)))
    };
}

macro_rules! bail_static {
    ($arg:expr) => {
        return Err(crate::error::Error::from_static_str($arg))
    };
}

pub(crate) use bail;
pub(crate) use bail_static;

#[derive(Debug)]
enum ErrorKind {
    Owned(String),
    Static(&'static str),
    Instrument(InstrumentError),
    Listing(ListingError),
}

#[derive(Debug)]
#[repr(transparent)]
pub struct Error(ErrorKind);

impl From<&'static str> for Error {
    #[cold]
    fn from(message: &'static str) -> Self {
        Error(ErrorKind::Static(message))
    }
}

impl From<String> for Error {
    #[cold]
    fn from(string: String) -> Self {
        Error(ErrorKind::Owned(string))
    }
}

impl From<InstrumentError> for Error {
    #[cold]
    fn from(error: InstrumentError) -> Self {
        Error(ErrorKind::Instrument(error))
    }
}

impl From<ListingError> for Error {
    #[cold]
    fn from(error: ListingError) -> Self {
        Error(ErrorKind::Listing(error))
    }
}

impl core::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        match &self.0 {
            ErrorKind::Owned(message) => fmt.write_str(message),
            ErrorKind::Static(message) => fmt.write_str(message),
            ErrorKind::Instrument(error) => write!(fmt, "{error}"),
            ErrorKind::Listing(error) => write!(fmt, "{error}"),
        }
    }
}

impl Error {
    #[cold]
    pub(crate) fn from_display(message: impl core::fmt::Display) -> Self {
        Error(ErrorKind::Owned(message.to_string()))
    }

    #[cold]
    pub(crate) fn from_static_str(message: &'static str) -> Self {
        Error(ErrorKind::Static(message))
    }

    #[cold]
    pub fn context(self, message: impl core::fmt::Display) -> Self {
        Error(ErrorKind::Owned(format!("{message}: {self}")))
    }
}
