// bridge-server/src/utils/token.rs
use rand::{thread_rng, Rng};

/// Length of the per-request correlation id
const REQUEST_ID_LEN: usize = 8;

/// Short random hex id used to correlate the log lines of one request
pub fn generate_request_id() -> String {
    let mut rng = thread_rng();
    (0..REQUEST_ID_LEN)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively and any run of whitespace may
/// separate it from the token.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim_start();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
