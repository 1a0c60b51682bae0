//! User data encoding

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Largest user data the API accepts, after encoding
pub const USER_DATA_LIMIT: usize = 16 * 1024;

/// Base64-encode `data` unless it already is valid base64
pub fn base64_encode(data: &str) -> String {
    if is_base64(data) {
        data.to_string()
    } else {
        STANDARD.encode(data)
    }
}

pub fn is_base64(data: &str) -> bool {
    !data.is_empty() && STANDARD.decode(data).is_ok()
}

/// Validate user data before it is sent
pub fn check_user_data(data: &str) -> crate::validate::Check {
    let encoded = base64_encode(data);
    if encoded.len() > USER_DATA_LIMIT {
        Err(format!(
            "user data is {} bytes once encoded, the limit is {}",
            encoded.len(),
            USER_DATA_LIMIT
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_plain_text() {
        assert_eq!(base64_encode("#!/bin/sh\necho hi\n"), "IyEvYmluL3NoCmVjaG8gaGkK");
    }

    #[test]
    fn test_already_encoded_is_unchanged() {
        let once = base64_encode("#cloud-config\npackages: [nginx]\n");
        assert_eq!(base64_encode(&once), once);
    }

    #[test]
    fn test_user_data_limit() {
        assert!(check_user_data("small").is_ok());
        assert!(check_user_data(&"#".repeat(USER_DATA_LIMIT)).is_err());
    }
}
