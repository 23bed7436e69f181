//! Reset links carry their credentials in the URL fragment
//! (`#token=...&email=...`) so they never reach a web server in a request line.

use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetLink {
    pub token: String,
    pub email: String,
}

impl ResetLink {
    /// Parses the fragment part, with or without the leading `#`.
    ///
    /// Returns `None` when either parameter is missing or blank.
    #[must_use]
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);

        let mut token = None;
        let mut email = None;
        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            match key.as_ref() {
                "token" => token = Some(value.trim().to_string()),
                "email" => email = Some(value.trim().to_string()),
                _ => {}
            }
        }

        match (token, email) {
            (Some(token), Some(email)) if !token.is_empty() && !email.is_empty() => {
                Some(Self { token, email })
            }
            _ => None,
        }
    }

    /// Parses a full link; a query string is deliberately ignored.
    #[must_use]
    pub fn from_url(link: &str) -> Option<Self> {
        let url = Url::parse(link).ok()?;
        Self::from_fragment(url.fragment()?)
    }

    /// Builds the link a reset email points to.
    #[must_use]
    pub fn to_url(&self, base: &Url) -> Url {
        let fragment = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("token", &self.token)
            .append_pair("email", &self.email)
            .finish();

        let mut url = base.clone();
        url.set_fragment(Some(&fragment));
        url
    }
}

/// Where the current address lives: a browser location bar, a pasted link.
pub trait Location: Send + Sync {
    fn fragment(&self) -> Option<String>;

    /// Removes the fragment so the token does not linger in history.
    fn clear_fragment(&self);
}

/// In-process location, shared between clones.
#[derive(Debug, Clone)]
pub struct MemoryLocation {
    url: Arc<Mutex<Url>>,
}

impl MemoryLocation {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url: Arc::new(Mutex::new(url)),
        }
    }

    pub fn parse(link: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(link)?))
    }

    #[must_use]
    pub fn current(&self) -> Url {
        self.url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Location for MemoryLocation {
    fn fragment(&self) -> Option<String> {
        self.url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fragment()
            .map(str::to_string)
    }

    fn clear_fragment(&self) {
        self.url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_fragment(None);
    }
}
