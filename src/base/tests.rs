use crate::base::neterror::{ErrorCategory, NetError};
use url::Url;

#[test]
fn test_net_error_codes() {
    assert_eq!(NetError::ConnectionRefused.as_i32(), -102);
    assert_eq!(NetError::InvalidRedirect.as_i32(), -303);
    assert_eq!(
        NetError::TooManyRedirects {
            max: 10,
            attempted: 11,
            chain: Vec::new(),
        }
        .as_i32(),
        -310
    );
}

#[test]
fn test_collision_avoidance() {
    // Custom codes must stay clear of Chromium's blob range (-900 to -906)
    let blob_range = -906..=-900;

    for err in [
        NetError::MissingRedirectLocation,
        NetError::UnsupportedBodyType("x".into()),
        NetError::AlreadyAborted("x".into()),
        NetError::Aborted("x".into()),
    ] {
        assert!(!blob_range.contains(&err.as_i32()));
    }
}

#[test]
fn test_retryable_transport_errors() {
    assert!(NetError::ConnectionReset.is_retryable());
    assert!(NetError::TimedOut.is_retryable());
    assert!(!NetError::UnsupportedBodyType("Foo".into()).is_retryable());
    assert!(!NetError::Aborted("user".into()).is_retryable());
    assert!(!NetError::MissingRedirectLocation.is_retryable());
}

#[test]
fn test_categories() {
    assert_eq!(
        NetError::NameNotResolved.category(),
        ErrorCategory::Transport
    );
    assert_eq!(
        NetError::AlreadyAborted("r".into()).category(),
        ErrorCategory::Cancelled
    );
    assert_eq!(
        NetError::MissingRedirectLocation.category(),
        ErrorCategory::Redirect
    );
    assert_eq!(NetError::JsonParseError.category(), ErrorCategory::Response);
}

#[test]
fn test_too_many_redirects_reports_attempts() {
    let chain = vec![Url::parse("http://a.test/1").unwrap()];
    let err = NetError::TooManyRedirects {
        max: 0,
        attempted: 1,
        chain,
    };
    assert_eq!(err.redirect_attempts(), Some(1));
    assert!(err.to_string().contains("maximum is 0"));
    assert_eq!(NetError::InvalidUrl.redirect_attempts(), None);
}

#[test]
fn test_io_error_mapping() {
    use std::io::{Error, ErrorKind};

    assert_eq!(
        NetError::from(Error::new(ErrorKind::ConnectionRefused, "refused")),
        NetError::ConnectionRefused
    );
    assert_eq!(
        NetError::from(Error::new(ErrorKind::TimedOut, "slow")),
        NetError::ConnectionTimedOut
    );
}
