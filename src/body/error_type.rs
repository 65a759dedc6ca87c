use super::BodyFrozen;
use core::error::Error as coreError;
use core::fmt::Display;
use core::str::Utf8Error;

/// Error type for body operations.
///
/// Covers encoding problems, serialization failures and reads from a body
/// that has already been handed to the transport.
///
/// # Examples
///
/// ```rust
/// use rith_http::{Body, BodyError};
///
/// let mut body = Body::from_bytes("payload");
/// let _sent = body.take().unwrap();
/// assert!(matches!(body.as_bytes(), Err(BodyError::BodyFrozen)));
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid UTF-8 data was encountered when reading the body as text.
    Utf8(Utf8Error),
    /// The body has been taken and cannot provide data anymore.
    ///
    /// This is distinct from an empty body: it means the bytes were moved out,
    /// usually because the request was already sent.
    BodyFrozen,
    /// JSON serialization or deserialization failed.
    #[cfg(feature = "json")]
    JsonError(serde_json::Error),
    /// Form data serialization failed.
    #[cfg(feature = "form")]
    SerializeForm(serde_urlencoded::ser::Error),
    /// Form data deserialization failed.
    #[cfg(feature = "form")]
    DeserializeForm(serde_urlencoded::de::Error),
}

macro_rules! impl_body_error {
    ($(($field:tt,$ty:ty $(,$feature:tt)?)),*) => {
        $(
            $(#[cfg(feature = $feature)])*
            impl From<$ty> for Error {
                fn from(error: $ty) -> Self {
                    Self::$field(error)
                }
            }
        )*

        impl Display for Error {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        $(#[cfg(feature = $feature)])*
                        Self::$field(error) => error.fmt(f),
                    )*
                    Self::BodyFrozen => BodyFrozen::new().fmt(f),
                }
            }
        }

        impl coreError for Error {
            fn source(&self) -> Option<&(dyn coreError + 'static)> {
                match self {
                    $(
                        $(#[cfg(feature = $feature)])*
                        Self::$field(error) => Some(error),
                    )*
                    Error::BodyFrozen => None,
                }
            }
        }

    };
}

impl_body_error![
    (Utf8, Utf8Error),
    (JsonError, serde_json::Error, "json"),
    (SerializeForm, serde_urlencoded::ser::Error, "form"),
    (DeserializeForm, serde_urlencoded::de::Error, "form")
];

impl From<BodyFrozen> for Error {
    fn from(_error: BodyFrozen) -> Self {
        Self::BodyFrozen
    }
}
