//! Helpers shared by the request services.

use chainreq_types::ApiError;
use validator::Validate;

/// Shortens a transaction hash or other long identifier for log output,
/// keeping the first 6 and last 4 characters.
///
/// `"0xa096c418fd1192ba7f5b506beea682a633f9ab82911fa3d7a249b8d80889a0b4"`
/// becomes `"0xa096...a0b4"`; strings of 12 characters or fewer are kept.
pub fn truncate_hash(hash: &str) -> String {
	if hash.len() <= 12 {
		hash.to_string()
	} else {
		format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
	}
}

/// Runs the derived field validation of a request body.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), ApiError> {
	body.validate()
		.map_err(|e| ApiError::invalid_request(format!("Invalid request body: {}", e)))
}
