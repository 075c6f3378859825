//! Paginated follower and following lists.

use log::{error, info, warn};

use super::api::XApiClient;
use super::parsing::parse_user_page;
use super::types::UserRef;
use crate::error::ScrapeError;

/// Largest page the follow endpoints accept.
const MAX_PAGE_SIZE: usize = 1000;

/// Which side of the follow graph to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FollowDirection {
    Followers,
    Following,
}

impl FollowDirection {
    fn segment(self) -> &'static str {
        match self {
            FollowDirection::Followers => "followers",
            FollowDirection::Following => "following",
        }
    }
}

/// Fetches up to `limit` accounts on one side of a user's follow graph.
///
/// # Returns
///
/// - `Ok(Vec<UserRef>)`: At most `limit` accounts, in API order
/// - `Err(ScrapeError)`: If a page request fails, or the list is not accessible
pub(crate) async fn fetch_follow_list(
    client: &XApiClient,
    user_id: &str,
    limit: usize,
    direction: FollowDirection,
) -> Result<Vec<UserRef>, ScrapeError> {
    let operation_name = direction.segment();
    info!("Fetching {} list for user {} (limit {})", operation_name, user_id, limit);

    let path = format!("/2/users/{}/{}", user_id, direction.segment());
    let mut accounts = Vec::new();
    let mut pagination_token: Option<String> = None;
    let mut page_count: u32 = 0;

    while accounts.len() < limit {
        let page_size = (limit - accounts.len()).clamp(1, MAX_PAGE_SIZE);
        let mut query = vec![
            ("max_results", page_size.to_string()),
            ("user.fields", "id,username,name".to_string()),
        ];
        if let Some(token) = &pagination_token {
            query.push(("pagination_token", token.clone()));
        }

        let json_response = client.get_json(&path, &query, operation_name).await?;

        // Check for API errors
        if let Some(errors) = json_response.get("errors").and_then(|e| e.as_array()) {
            for err in errors {
                if let Some(title) = err.get("title").and_then(|v| v.as_str()) {
                    error!("Twitter API error: {}", title);
                    if json_response.get("data").is_none()
                        && (title.contains("Forbidden") || title.contains("Authorization"))
                    {
                        return Err(ScrapeError::Api {
                            operation: operation_name.to_string(),
                            status: 403,
                            message: format!(
                                "{} list of user {} is not accessible (protected or suspended)",
                                operation_name, user_id
                            ),
                        });
                    }
                }
            }
        }

        let page = parse_user_page(&json_response);
        page_count += 1;
        let page_len = page.items.len();
        accounts.extend(page.items);

        pagination_token = page.next_token;
        if pagination_token.is_none() || page_len == 0 {
            break;
        }

        // Brief delay to respect rate limits
        tokio::time::sleep(client.page_delay).await;
    }

    if accounts.len() > limit {
        warn!(
            "Received {} {} accounts, truncating to limit {}",
            accounts.len(),
            operation_name,
            limit
        );
        accounts.truncate(limit);
    }

    info!(
        "Fetched {} {} accounts for user {} ({} pages)",
        accounts.len(),
        operation_name,
        user_id,
        page_count
    );
    Ok(accounts)
}
