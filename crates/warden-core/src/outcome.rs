//! Result envelope returned across the endpoint boundary.
//!
//! Mutations distinguish three results: the change happened, nothing was
//! done (e.g. a built-in group refused deletion), or the call failed. The
//! first two are [`Outcome`] values, the last is a [`WardenError`].

use serde::{Deserialize, Serialize};

use crate::error::{WardenError, WardenResult};

pub const CODE_OK: &str = "200";
pub const CODE_NO_EFFECT: &str = "204";
pub const CODE_BAD_REQUEST: &str = "400";
pub const CODE_NOT_FOUND: &str = "404";
pub const CODE_CONFLICT: &str = "409";
pub const CODE_SERVER_ERROR: &str = "500";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    /// Nothing changed. Not an error.
    NoEffect(String),
}

impl<T> Outcome<T> {
    pub fn no_effect(reason: impl Into<String>) -> Self {
        Outcome::NoEffect(reason.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub successful: bool,
    pub code: String,
    pub name: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            successful: true,
            code: CODE_OK.into(),
            name: "Success".into(),
            message: "OK".into(),
            data: Some(data),
        }
    }

    pub fn no_effect(reason: impl Into<String>) -> Self {
        Self {
            successful: true,
            code: CODE_NO_EFFECT.into(),
            name: "NoEffect".into(),
            message: reason.into(),
            data: None,
        }
    }

    pub fn error(err: &WardenError) -> Self {
        let (code, name) = match err {
            WardenError::Validation { .. } => (CODE_BAD_REQUEST, "BadRequest"),
            WardenError::NotFound { .. } => (CODE_NOT_FOUND, "NotFound"),
            WardenError::AlreadyExists { .. } => (CODE_CONFLICT, "Conflict"),
            WardenError::Database(_) | WardenError::Internal(_) => {
                (CODE_SERVER_ERROR, "ServerError")
            }
        };
        Self {
            successful: false,
            code: code.into(),
            name: name.into(),
            message: err.to_string(),
            data: None,
        }
    }

    pub fn is_no_effect(&self) -> bool {
        self.code == CODE_NO_EFFECT
    }

    /// Wrap a read or a plain mutation result.
    pub fn from_result(result: WardenResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::error(&err),
        }
    }

    /// Wrap a mutation that may legitimately have no effect.
    pub fn from_outcome(result: WardenResult<Outcome<T>>) -> Self {
        match result {
            Ok(Outcome::Done(data)) => Self::ok(data),
            Ok(Outcome::NoEffect(reason)) => Self::no_effect(reason),
            Err(err) => Self::error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_maps_to_distinct_codes() {
        let done: Envelope<u32> = Envelope::from_outcome(Ok(Outcome::Done(7)));
        assert!(done.successful);
        assert_eq!(done.code, CODE_OK);
        assert_eq!(done.data, Some(7));

        let skipped: Envelope<u32> =
            Envelope::from_outcome(Ok(Outcome::no_effect("group is built-in")));
        assert!(skipped.successful);
        assert!(skipped.is_no_effect());
        assert_eq!(skipped.message, "group is built-in");
        assert_eq!(skipped.data, None);
    }

    #[test]
    fn errors_carry_code_and_message() {
        let missing: Envelope<()> =
            Envelope::from_result(Err(WardenError::not_found("group", "abc")));
        assert!(!missing.successful);
        assert_eq!(missing.code, CODE_NOT_FOUND);
        assert!(missing.message.contains("abc"));

        let invalid: Envelope<()> = Envelope::error(&WardenError::validation("bad id"));
        assert_eq!(invalid.code, CODE_BAD_REQUEST);

        let storage: Envelope<()> = Envelope::error(&WardenError::Database("down".into()));
        assert_eq!(storage.code, CODE_SERVER_ERROR);
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let env = Envelope::ok(vec![1, 2]);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["successful"], true);
        assert_eq!(json["code"], "200");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }
}
