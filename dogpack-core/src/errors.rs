//! # Errors (Feathers-style)
//!
//! dogpack reports failures as a structured [`TenancyError`]:
//! - consistent status codes + class names
//! - can be carried through `anyhow::Error`
//! - transport-agnostic (the HTTP adapter decides how to serialize)
//!
//! Domain failures of the isolation layer ([`IsolationError`]) and of the
//! directory ([`InvalidSubdomain`]) convert into it with the right kind.
//!
//! With feature `serde` you also get `data` as `serde_json::Value` and a
//! `to_json()` helper.

use std::fmt;

use anyhow::Error as AnyError;

use crate::enforcer::IsolationError;
use crate::tenant::InvalidSubdomain;

/// A convenience result type for dogpack core APIs.
pub type TenancyResult<T> = std::result::Result<T, AnyError>;

/// Error class names + status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,    // 400
    Forbidden,     // 403
    NotFound,      // 404
    Conflict,      // 409
    Unprocessable, // 422
    GeneralError,  // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unprocessable => 422,
            ErrorKind::GeneralError => 500,
        }
    }

    /// Error `name` (e.g. "NotFound")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Unprocessable => "Unprocessable",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    /// Error `className` (kebab-cased)
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unprocessable => "unprocessable",
            ErrorKind::GeneralError => "general-error",
        }
    }
}

#[cfg(feature = "serde")]
pub type ErrorValue = serde_json::Value;

#[cfg(not(feature = "serde"))]
pub type ErrorValue = std::sync::Arc<dyn std::any::Any + Send + Sync>;

/// A structured dogpack error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct TenancyError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<ErrorValue>,
    pub source: Option<AnyError>,
}

impl TenancyError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: ErrorValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error` so it flows through stores and hooks.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `TenancyError` anywhere in an `anyhow::Error` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&TenancyError> {
        err.chain().find_map(|e| e.downcast_ref::<TenancyError>())
    }

    /// Turn any error into a TenancyError:
    /// - already a TenancyError: kept as is
    /// - an isolation or subdomain error: converted with its own kind
    /// - anything else: wrapped as GeneralError
    pub fn normalize(err: AnyError) -> TenancyError {
        let err = match err.downcast::<TenancyError>() {
            Ok(tenancy) => return tenancy,
            Err(other) => other,
        };
        let err = match err.downcast::<IsolationError>() {
            Ok(isolation) => return isolation.into(),
            Err(other) => other,
        };
        match err.downcast::<InvalidSubdomain>() {
            Ok(invalid) => invalid.into(),
            Err(other) => {
                TenancyError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// A version suitable for returning to clients: the inner `source`
    /// (stack, secret details) is dropped.
    pub fn sanitize_for_client(&self) -> TenancyError {
        TenancyError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
}

impl fmt::Display for TenancyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for TenancyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<IsolationError> for TenancyError {
    fn from(err: IsolationError) -> Self {
        let kind = err.kind();
        TenancyError::new(kind, err.to_string()).with_source(AnyError::new(err))
    }
}

impl From<InvalidSubdomain> for TenancyError {
    fn from(err: InvalidSubdomain) -> Self {
        TenancyError::bad_request(err.to_string())
    }
}

#[cfg(feature = "serde")]
impl TenancyError {
    /// JSON payload: `{name, message, code, className, data?}`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        base
    }
}

/// Convenience helper for "bail with TenancyError".
#[macro_export]
macro_rules! bail_tenancy {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::TenancyError::$ctor($msg).into_anyhow())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::TenancyError::$ctor(format!($fmt, $($arg)*)).into_anyhow())
    };
}
