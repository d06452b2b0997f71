use std::fmt;

#[derive(Debug)]
pub enum Error {
    Opencv(opencv::Error),
    Calibration(ErrorKind),
}

#[derive(Debug, PartialEq, Eq)]
pub enum ErrorKind {
    CameraUnavailable,
    NoObservations,
    MissingArchive(String),
    MissingField(&'static str),
}

impl From<opencv::Error> for Error {
    fn from(error: opencv::Error) -> Self {
        Self::Opencv(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Opencv(ref err) => err.fmt(f),
            Error::Calibration(ref kind) => write!(f, "Calibration error: {}", kind),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorKind::CameraUnavailable => write!(f, "could not open camera device"),
            ErrorKind::NoObservations => {
                write!(f, "no board observations were captured, nothing to solve")
            }
            ErrorKind::MissingArchive(ref path) => {
                write!(f, "calibration archive '{}' cannot be read", path)
            }
            ErrorKind::MissingField(name) => {
                write!(f, "calibration archive lacks field '{}'", name)
            }
        }
    }
}

impl std::error::Error for Error {}
