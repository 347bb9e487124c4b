//! Who is on the other end of a connection.
//!
//! Users are owned by an external auth service; the server only ever holds a
//! copy taken when the connection is accepted. The guest resolver stands in
//! for that service.

use std::net::SocketAddr;

use chess::ControlKind;
use chess_proto::UserPayload;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

pub const DEFAULT_RATING: u32 = 1500;
const MAX_ID_LEN: usize = 64;
const MAX_USERNAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub username: String,
    pub bullet_rating: u32,
    pub blitz_rating: u32,
    pub rapid_rating: u32,
}

impl UserRef {
    pub fn guest(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            bullet_rating: DEFAULT_RATING,
            blitz_rating: DEFAULT_RATING,
            rapid_rating: DEFAULT_RATING,
        }
    }

    pub fn rating(&self, control: ControlKind) -> u32 {
        match control {
            ControlKind::Bullet => self.bullet_rating,
            ControlKind::Blitz => self.blitz_rating,
            ControlKind::Rapid => self.rapid_rating,
        }
    }

    pub fn to_payload(&self) -> UserPayload {
        UserPayload {
            id: self.id.clone(),
            username: self.username.clone(),
            bullet_rating: self.bullet_rating,
            blitz_rating: self.blitz_rating,
            rapid_rating: self.rapid_rating,
        }
    }
}

/// What is known about a connection at upgrade time.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    /// Raw query string of the upgrade request URI.
    pub query: Option<String>,
    pub peer: Option<SocketAddr>,
}

impl Handshake {
    /// First non-empty value of `key` in the query string.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .as_deref()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, v)| *k == key && !v.is_empty())
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("User {0} is already claimed and the token does not match")]
    TokenMismatch(String),
}

/// A resolved user plus the secret that lets them reclaim the identity on a
/// later connection, if the resolver issues one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: UserRef,
    pub token: Option<String>,
}

/// Resolves the user behind a new connection.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, handshake: &Handshake) -> Result<Credentials, IdentityError>;
}

/// Guest sign-in. Every guest id is bound to a token minted the first time
/// the id is seen. A returning client presents `id` together with that
/// `token`; an `id` already bound to another token is refused.
#[derive(Debug, Default)]
pub struct GuestResolver {
    tokens: DashMap<String, String>,
}

impl GuestResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityResolver for GuestResolver {
    fn resolve(&self, handshake: &Handshake) -> Result<Credentials, IdentityError> {
        let id = match handshake.param("id") {
            Some(id) => {
                validate("id", id, MAX_ID_LEN)?;
                id.to_string()
            }
            None => format!("guest-{}", Uuid::new_v4()),
        };

        let username = match handshake.param("username") {
            Some(name) => {
                validate("username", name, MAX_USERNAME_LEN)?;
                name.to_string()
            }
            None => default_username(&id),
        };

        let token = match self.tokens.entry(id.clone()) {
            Entry::Occupied(bound) => {
                if handshake.param("token") != Some(bound.get().as_str()) {
                    tracing::warn!(user = %id, peer = ?handshake.peer, "Guest token mismatch");
                    return Err(IdentityError::TokenMismatch(id));
                }
                bound.get().clone()
            }
            Entry::Vacant(slot) => {
                let token = Uuid::new_v4().simple().to_string();
                slot.insert(token.clone());
                token
            }
        };
        tracing::debug!(user = %id, peer = ?handshake.peer, "Guest resolved");

        Ok(Credentials {
            user: UserRef::guest(id, username),
            token: Some(token),
        })
    }
}

fn validate(field: &'static str, value: &str, max_len: usize) -> Result<(), IdentityError> {
    if value.len() > max_len {
        return Err(IdentityError::Invalid {
            field,
            reason: format!("longer than {max_len} characters"),
        });
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(IdentityError::Invalid {
            field,
            reason: "only letters, digits, '-' and '_' are allowed".into(),
        });
    }
    Ok(())
}

fn default_username(id: &str) -> String {
    let tail: String = id
        .trim_start_matches("guest-")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect();
    format!("Guest-{tail}")
}
