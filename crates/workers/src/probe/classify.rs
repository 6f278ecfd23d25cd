use std::error::Error as _;
use std::time::Duration;

use pulse_common::outcome::ErrorType;

/// Any 2xx is up; every other status is an `HTTP_ERROR`.
pub fn classify_status(code: u16) -> Option<(ErrorType, String)> {
    if (200..300).contains(&code) {
        None
    } else {
        Some((
            ErrorType::HttpError,
            format!("Request failed with status {code}"),
        ))
    }
}

pub fn classify_error(err: &reqwest::Error, timeout: Duration) -> (ErrorType, String) {
    if err.is_timeout() {
        return (
            ErrorType::Timeout,
            format!("Timeout of {}s exceeded", timeout.as_secs()),
        );
    }
    let kind = if err.is_connect() {
        ErrorType::Network
    } else {
        ErrorType::Unknown
    };
    (kind, error_chain(err))
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
