use serde_derive::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

use crate::ErrorSet;

/// Error of an http call: the status code (or the error set code for a transport failure)
/// and the message, which is the response body when the server answered.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiError<'a> {
    pub http_error_code: u16,
    #[serde(borrow)]
    pub message: Cow<'a, str>,
}

impl<'a> Display for ApiError<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "http:{} message:{}", self.http_error_code, self.message)
    }
}

impl std::error::Error for ApiError<'static> {}

impl<'a> ApiError<'a> {
    pub const fn borrowed(code: u16, msg: &'a str) -> Self {
        Self { http_error_code: code, message: Cow::Borrowed(msg) }
    }
    pub fn owned<S: Into<String>>(code: u16, msg: S) -> Self {
        Self { http_error_code: code, message: Cow::Owned(msg.into()) }
    }
}

impl ApiError<'static> {
    pub fn from_errorset(error_set: &ErrorSet) -> Self {
        ApiError::borrowed(error_set.http_error_code, error_set.err_message)
    }

    /// Error set with a detail, ex: "Http Client Error - connection refused"
    pub fn from_errorset_with(error_set: &ErrorSet, detail: impl Display) -> Self {
        ApiError::owned(error_set.http_error_code, format!("{} - {}", error_set.err_message, detail))
    }

    /// True when the server answered with an error status
    pub fn is_http_status(&self) -> bool {
        (400..600).contains(&self.http_error_code)
    }
}
