//! Configuration module for the harvester.
//!
//! This module loads the run inputs: the account credentials file, the target
//! user list file, and the X API settings taken from environment variables.

use log::{debug, error, info, warn};
use std::env;
use std::fmt;
use std::path::Path;

use crate::error::ScrapeError;

/// Default API host used when `XAPI_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "https://api.x.com";

/// One scraping account: `login:password:email:email_password`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub login: String,
    pub password: String,
    pub email: String,
    pub email_password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .field("email", &self.email)
            .field("email_password", &"[REDACTED]")
            .finish()
    }
}

impl Credential {
    /// Parses a single `login:password:email:email_password` line.
    ///
    /// The last field keeps any further colons so email passwords may contain them.
    /// Returns `None` when fewer than four fields are present.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.trim().splitn(4, ':');
        let login = fields.next()?;
        let password = fields.next()?;
        let email = fields.next()?;
        let email_password = fields.next()?;

        Some(Credential {
            login: login.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            email_password: email_password.to_string(),
        })
    }
}

/// Parses the contents of a credentials file, one account per line.
///
/// Blank lines are ignored. Lines with fewer than four fields are logged and skipped.
pub fn parse_credentials(text: &str) -> Vec<Credential> {
    let mut credentials = Vec::new();

    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match Credential::parse_line(line) {
            Some(credential) => credentials.push(credential),
            None => warn!(
                "Skipping credentials line {}: expected login:password:email:email_password",
                number + 1
            ),
        }
    }

    credentials
}

/// Reads and parses the credentials file at `path`.
pub fn load_credentials(path: &Path) -> Result<Vec<Credential>, ScrapeError> {
    info!("Loading credentials from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let credentials = parse_credentials(&text);
    info!("Loaded {} account credentials", credentials.len());
    Ok(credentials)
}

/// Extracts the handles from a `users = [ ... ]` assignment in `text`.
///
/// The list is read by a small parser that accepts single- or double-quoted
/// strings separated by commas, an optional trailing comma, and `#` comments.
/// Nothing in the file is evaluated.
///
/// # Returns
///
/// - `Ok(handles)`: The handles in file order (empty if no assignment is present)
/// - `Err(ScrapeError::Config)`: If the assignment exists but its list is malformed
pub fn parse_user_list(text: &str) -> Result<Vec<String>, ScrapeError> {
    let re = regex::Regex::new(r"users\s*=\s*\[")
        .map_err(|e| ScrapeError::Config(format!("invalid user list pattern: {}", e)))?;

    let start = match re.find(text) {
        Some(m) => m.end(),
        None => return Ok(Vec::new()),
    };

    let mut parser = ListParser {
        chars: text[start..].chars().peekable(),
    };
    parser.parse_items()
}

/// Reads the user list file at `path`.
///
/// A missing assignment yields an empty list. A malformed list is logged and
/// also yields an empty list.
pub fn load_target_users(path: &Path) -> Result<Vec<String>, ScrapeError> {
    info!("Loading target users from {}", path.display());
    let text = std::fs::read_to_string(path)?;

    let users = match parse_user_list(&text) {
        Ok(users) => users,
        Err(e) => {
            warn!("Ignoring malformed user list in {}: {}", path.display(), e);
            Vec::new()
        }
    };

    if users.is_empty() {
        warn!("No target users found in {}", path.display());
    } else {
        info!("Loaded {} target users", users.len());
    }
    Ok(users)
}

struct ListParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl ListParser<'_> {
    fn parse_items(&mut self) -> Result<Vec<String>, ScrapeError> {
        let mut items = Vec::new();

        loop {
            self.skip_blank();
            match self.chars.next() {
                Some(']') => return Ok(items),
                Some(quote @ ('"' | '\'')) => {
                    items.push(self.parse_string(quote)?);
                    self.skip_blank();
                    match self.chars.next() {
                        Some(',') => continue,
                        Some(']') => return Ok(items),
                        Some(c) => return Err(malformed(format!("unexpected '{}' after item", c))),
                        None => return Err(malformed("unterminated list")),
                    }
                }
                Some(c) => {
                    return Err(malformed(format!(
                        "expected a quoted handle, found '{}'",
                        c
                    )))
                }
                None => return Err(malformed("unterminated list")),
            }
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, ScrapeError> {
        let mut value = String::new();

        while let Some(c) = self.chars.next() {
            match c {
                c if c == quote => return Ok(value),
                '\\' => match self.chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(escaped @ ('\\' | '\'' | '"')) => value.push(escaped),
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                '\n' => return Err(malformed("newline inside quoted handle")),
                c => value.push(c),
            }
        }

        Err(malformed("unterminated string"))
    }

    fn skip_blank(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else if c == '#' {
                // comment runs to end of line
                for c in self.chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }
}

fn malformed(reason: impl Into<String>) -> ScrapeError {
    ScrapeError::Config(format!("malformed users list: {}", reason.into()))
}

/// Masks a secret for logging, keeping at most the first and last 8 characters.
pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let length = chars.len();
    let prefix: String = chars.iter().take(8).collect();

    if length > 16 {
        let suffix: String = chars[length - 8..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

/// Settings for the X API v2 client.
#[derive(Debug, Clone)]
pub struct XApiConfig {
    /// The Access Token for OAuth 2.0 User Context authentication
    pub access_token: String,
    /// API host, overridable for proxies and tests
    pub base_url: String,
}

impl XApiConfig {
    /// Creates a new `XApiConfig` instance from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `xapi_access_token`: Twitter API Access Token
    ///
    /// # Optional Environment Variables
    ///
    /// - `XAPI_BASE_URL`: API host (defaults to `https://api.x.com`)
    ///
    /// # Returns
    ///
    /// - `Ok(XApiConfig)`: If the required environment variable is present and non-empty
    /// - `Err(ScrapeError::Config)`: If the access token is missing or empty
    pub fn from_env() -> Result<Self, ScrapeError> {
        info!("Loading X API configuration from environment variables");

        let access_token = match env::var("xapi_access_token") {
            Ok(token) => {
                info!(
                    "Found xapi_access_token environment variable with length: {}",
                    token.len()
                );
                debug!("Access token (masked): {}", mask_token(&token));

                if token.is_empty() {
                    error!("Access token is empty");
                    return Err(ScrapeError::Config(
                        "Access token cannot be empty".to_string(),
                    ));
                }
                if token.len() < 10 {
                    warn!(
                        "Access token seems unusually short ({} characters)",
                        token.len()
                    );
                }
                token
            }
            Err(e) => {
                error!("Failed to load xapi_access_token from environment: {}", e);
                return Err(ScrapeError::Config(format!(
                    "Missing xapi_access_token environment variable: {}",
                    e
                )));
            }
        };

        let base_url = match env::var("XAPI_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => {
                info!("Using X API base URL from XAPI_BASE_URL: {}", url);
                url
            }
            _ => DEFAULT_API_BASE_URL.to_string(),
        };

        Ok(XApiConfig {
            access_token,
            base_url,
        })
    }
}
