//! Input validation and sanitization
//!
//! Keeps untrusted UI input out of file paths and host configuration.

use crate::error::{VpnError, VpnResult};

/// Maximum length for account names used as credential store keys
const MAX_ACCOUNT_NAME_LEN: usize = 64;

/// Maximum length for server addresses
const MAX_SERVER_ADDRESS_LEN: usize = 255;

/// Generic message for incomplete submissions; individual fields are not
/// called out to the user.
pub const FILL_ALL_FIELDS: &str = "Fill all the fields";

/// Check a configuration submission for empty required fields.
///
/// Any empty field rejects the whole submission with the generic message,
/// before anything reaches the controller or the credential store.
pub fn require_submission_fields(server: &str, username: &str, password: &str) -> VpnResult<()> {
    if server.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
        return Err(VpnError::InvalidParameter(FILL_ALL_FIELDS.to_string()));
    }
    Ok(())
}

/// Validate an account name before it is used as a credential store key
///
/// Account names become file names in the store directory, so path
/// separators and relative components are rejected outright.
pub fn validate_account_name(name: &str) -> VpnResult<()> {
    if name.is_empty() {
        return Err(VpnError::InvalidParameter(
            "Account name cannot be empty".to_string()
        ));
    }

    if name.len() > MAX_ACCOUNT_NAME_LEN {
        return Err(VpnError::InvalidParameter(
            format!("Account name too long (max {} characters)", MAX_ACCOUNT_NAME_LEN)
        ));
    }

    // Only allow alphanumeric plus a small set of account punctuation
    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.' | '@') {
            return Err(VpnError::InvalidParameter(
                format!("Invalid account name '{}': contains invalid character '{}'", name, c)
            ));
        }
    }

    // ".." would escape the store directory
    if name == "." || name == ".." {
        return Err(VpnError::InvalidParameter(
            "Account name cannot be a relative path component".to_string()
        ));
    }

    Ok(())
}

/// Validate a server address (hostname or IP literal)
pub fn validate_server_address(address: &str) -> VpnResult<()> {
    if address.is_empty() {
        return Err(VpnError::InvalidParameter(
            "Server address cannot be empty".to_string()
        ));
    }

    if address.len() > MAX_SERVER_ADDRESS_LEN {
        return Err(VpnError::InvalidParameter(
            format!("Server address too long (max {} characters)", MAX_SERVER_ADDRESS_LEN)
        ));
    }

    if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(VpnError::InvalidParameter(
            format!("Invalid server address: {}", address)
        ));
    }

    Ok(())
}
