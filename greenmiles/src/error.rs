//! Errors surfaced to the user as inline messages.

use thiserror::Error;

/// A device the program asks for access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Camera,
    Location,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Camera => write!(f, "Camera"),
            Device::Location => write!(f, "Location"),
        }
    }
}

/// Everything that can go wrong; none of it is fatal to the view.
#[derive(Debug, Error)]
pub enum Error {
    /// Camera or geolocation denied or unavailable.
    #[error("{device} error: {message}")]
    DeviceAccess { device: Device, message: String },

    /// The air/weather proxy answered badly or not at all.
    #[error("Data error: {0}")]
    Upstream(String),

    /// Missing or out-of-range numbers.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn camera(message: impl Into<String>) -> Self {
        Error::DeviceAccess {
            device: Device::Camera,
            message: message.into(),
        }
    }

    pub fn location(message: impl Into<String>) -> Self {
        Error::DeviceAccess {
            device: Device::Location,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}

#[cfg(feature = "proxy")]
impl From<envproxy::Error> for Error {
    fn from(e: envproxy::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}
