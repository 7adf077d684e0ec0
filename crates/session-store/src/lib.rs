//! Session tickets and item access grants held in memory.
//!
//! [`InMemoryTicketStore`] answers the dispatcher's ticket and caller
//! questions; [`ItemAccessTable`] answers item permission questions.

pub mod config;
mod items;
mod tickets;

pub use crate::config::{
    load_seeds_from_path, load_seeds_from_reader, parse_seeds_str, ItemGrant, SessionError,
    TicketSeed,
};
pub use items::ItemAccessTable;
pub use tickets::{InMemoryTicketStore, TICKET_COOKIE, TICKET_HEADER};

use std::time::Duration;

/// Parses a ticket lifetime. `None` and `session` mean no expiry.
pub fn parse_ttl(raw: Option<&str>) -> Result<Option<Duration>, SessionError> {
    let Some(ttl_str) = raw else {
        return Ok(None);
    };

    if ttl_str.eq_ignore_ascii_case("session") {
        return Ok(None);
    }

    let duration = humantime::parse_duration(ttl_str)
        .map_err(|_| SessionError::InvalidTtl(ttl_str.to_string()))?;
    Ok(Some(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_parsing() {
        assert_eq!(parse_ttl(None).unwrap(), None);
        assert_eq!(parse_ttl(Some("Session")).unwrap(), None);
        assert_eq!(parse_ttl(Some("90s")).unwrap(), Some(Duration::from_secs(90)));
        assert!(matches!(parse_ttl(Some("soon")), Err(SessionError::InvalidTtl(_))));
    }
}
