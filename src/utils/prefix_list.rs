//! Text format for route lists.
//!
//! Each entry holds a CIDR prefix followed by optional attribute tokens:
//!
//! ```text
//! # comment
//! 10.0.0.0/24 med=100 origin=egp community=65000:1,65000:2 atomic
//! 10.0.1.0/24
//! ```

use crate::attributes::{Origin, RouteAttributes};
use crate::error::{AppError, AppErrorKind};
use crate::prefix::Prefix;
use tracing::debug;

/// Splits raw list data into entries, dropping blanks and `#` comments.
///
/// Entries are separated by newlines unless a delimiter is given.
pub fn parse_from_string<'a>(data: &'a str, delimiter: Option<&str>) -> Vec<&'a str> {
    let entries: Vec<&'a str> = match delimiter {
        Some(delimiter) => data.split(delimiter).collect(),
        None => data.lines().collect(),
    };
    entries
        .into_iter()
        .map(str::trim)
        .filter(|entry| {
            if entry.starts_with('#') {
                debug!("skipping comment: {}", entry);
                return false;
            }
            !entry.is_empty()
        })
        .collect()
}

/// Parses every entry of a route list.
///
/// # Errors
/// Fails on the first malformed entry.
pub fn parse_prefix_list(data: &str, delimiter: Option<&str>) -> Result<Vec<Prefix>, AppError> {
    parse_from_string(data, delimiter)
        .into_iter()
        .map(parse_route)
        .collect()
}

/// Parses a single entry: a prefix and optional `key=value` route attributes.
pub fn parse_route(entry: &str) -> Result<Prefix, AppError> {
    let mut tokens = entry.split_whitespace();
    let prefix = tokens
        .next()
        .ok_or_else(|| AppError::new(AppErrorKind::ParseError, "empty route entry"))?
        .parse::<Prefix>()?;

    let mut attributes: Option<RouteAttributes> = None;
    for token in tokens {
        let current = attributes.get_or_insert_with(RouteAttributes::new);
        let (key, value) = token.split_once('=').unwrap_or((token, ""));
        match key {
            "med" => current.med = Some(parse_value(token, value)?),
            "origin" => current.origin = parse_value::<Origin>(token, value)?,
            "atomic" if value.is_empty() => current.atomic_aggregate = true,
            "atomic" => current.atomic_aggregate = parse_value(token, value)?,
            "community" => current.communities.extend(
                value
                    .split(',')
                    .filter(|community| !community.is_empty())
                    .map(str::to_string),
            ),
            _ => {
                return Err(AppError::new(
                    AppErrorKind::ParseError,
                    format!("unknown route attribute: {token}").as_str(),
                ));
            }
        }
    }

    debug!("valid route: {}", entry);
    Ok(match attributes {
        Some(attributes) => prefix.with_attributes(attributes),
        None => prefix,
    })
}

fn parse_value<T>(token: &str, value: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| {
        AppError::new(
            AppErrorKind::ParseError,
            format!("invalid route attribute: {token}; {e}").as_str(),
        )
    })
}
