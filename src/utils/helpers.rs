//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use regex::Regex;
use url::Url;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate username format (lowercase letters, digits, underscores, 3-32 chars)
pub fn is_valid_username(username: &str) -> bool {
    match Regex::new(r"^[a-z0-9_]{3,32}$") {
        Ok(re) => re.is_match(username),
        Err(_) => false,
    }
}

/// Validate phone number format (optional leading +, digits with separators)
pub fn is_valid_phone(phone: &str) -> bool {
    match Regex::new(r"^\+?[0-9][0-9 \-()]{6,18}$") {
        Ok(re) => re.is_match(phone),
        Err(_) => false,
    }
}

/// Validate that a string parses as an absolute http(s) URL
pub fn is_valid_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => url.scheme() == "http" || url.scheme() == "https",
        Err(_) => false,
    }
}

/// Clamp pagination parameters to sane bounds and convert to LIMIT/OFFSET
pub fn clamp_pagination(page: Option<u32>, per_page: Option<u32>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page as i64 - 1) * per_page as i64;
    (per_page as i64, offset)
}
