//! Error types for loading modules and configuration.

use derive_more::{Display, From};

pub type WeaveResult<T> = Result<T, WeaveError>;

#[derive(Display, Debug, From)]
#[display("{kind}")]
pub struct WeaveError {
    #[from]
    kind: Box<WeaveErrorKind>,
}

impl<E> From<E> for WeaveError
where
    WeaveErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        WeaveError {
            kind: Box::new(WeaveErrorKind::from(error)),
        }
    }
}

impl WeaveError {
    pub fn unknown_method(name: impl std::fmt::Display) -> Self {
        WeaveErrorKind::UnknownMethod(name.to_string()).into()
    }

    pub fn invalid_method_path(path: impl std::fmt::Display) -> Self {
        WeaveErrorKind::InvalidMethodPath(path.to_string()).into()
    }

    pub fn kind(&self) -> &WeaveErrorKind {
        &self.kind
    }
}

#[derive(Display, Debug)]
pub enum WeaveErrorKind {
    #[display("I/O error: {_0}")]
    Io(std::io::Error),

    #[display("JSON error: {_0}")]
    Json(serde_json::Error),

    #[display("Method not found: {_0}")]
    UnknownMethod(String),

    #[display("Expected `Type::Method`, got `{_0}`")]
    InvalidMethodPath(String),

    #[display("Slice error: {_0}")]
    Slice(weaver_analysis::SliceError),
}

impl From<std::io::Error> for WeaveErrorKind {
    fn from(error: std::io::Error) -> Self {
        WeaveErrorKind::Io(error)
    }
}

impl From<serde_json::Error> for WeaveErrorKind {
    fn from(error: serde_json::Error) -> Self {
        WeaveErrorKind::Json(error)
    }
}

impl From<weaver_analysis::SliceError> for WeaveErrorKind {
    fn from(error: weaver_analysis::SliceError) -> Self {
        WeaveErrorKind::Slice(error)
    }
}

impl std::error::Error for WeaveError {}
