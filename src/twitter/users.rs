//! User lookups and session verification.

use log::{info, warn};

use super::api::XApiClient;
use super::parsing::parse_user;
use super::types::UserRef;
use crate::error::ScrapeError;

/// Looks up a user by handle using the X API v2.
///
/// # Returns
///
/// - `Ok(Some(UserRef))`: User information if found
/// - `Ok(None)`: If the handle does not resolve (404, or a body without `data`)
/// - `Err(ScrapeError)`: If the API request fails
pub(crate) async fn lookup_user_by_username(
    client: &XApiClient,
    username: &str,
) -> Result<Option<UserRef>, ScrapeError> {
    info!("Looking up user by username: {}", username);

    let path = format!("/2/users/by/username/{}", urlencoding::encode(username));
    let query = [("user.fields", "id,username,name".to_string())];

    let json_response = match client.get_json(&path, &query, "lookup_user").await {
        Ok(json) => json,
        Err(ScrapeError::Api { status: 404, .. }) => {
            warn!("User {} not found", username);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    match json_response.get("data").and_then(parse_user) {
        Some(user) => {
            info!("Found user {} (@{})", user.id, user.username);
            Ok(Some(user))
        }
        None => {
            warn!("User {} not found", username);
            Ok(None)
        }
    }
}

/// Returns the account the access token belongs to.
pub(crate) async fn verify_session(client: &XApiClient) -> Result<UserRef, ScrapeError> {
    let query = [("user.fields", "id,username".to_string())];
    let json_response = client.get_json("/2/users/me", &query, "verify_session").await?;

    json_response
        .get("data")
        .and_then(parse_user)
        .ok_or_else(|| ScrapeError::Api {
            operation: "verify_session".to_string(),
            status: 200,
            message: "response carried no user".to_string(),
        })
}
