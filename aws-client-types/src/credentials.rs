/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use zeroize::Zeroizing;

/// AWS access credentials.
///
/// Credentials are held behind an `Arc` so that clones are cheap and a single
/// credential value can be shared across concurrent in-flight requests. The
/// secret key is wiped from memory when the last clone is dropped.
#[derive(Clone)]
pub struct Credentials(Arc<Inner>);

struct Inner {
    access_key_id: Zeroizing<String>,
    secret_access_key: Zeroizing<String>,
    session_token: Zeroizing<Option<String>>,
    expires_after: Option<SystemTime>,
    provider_name: &'static str,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut creds = f.debug_struct("Credentials");
        creds
            .field("provider_name", &self.0.provider_name)
            .field("access_key_id", &self.0.access_key_id.as_str())
            .field("secret_access_key", &"** redacted **");
        if let Some(expiry) = self.expiry() {
            creds.field("expires_after", &expiry);
        } else {
            creds.field("expires_after", &"never");
        }
        creds.finish()
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.access_key_id() == other.access_key_id()
            && self.secret_access_key() == other.secret_access_key()
            && self.session_token() == other.session_token()
    }
}

impl Eq for Credentials {}

impl Credentials {
    /// Creates `Credentials`.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expires_after: Option<SystemTime>,
        provider_name: &'static str,
    ) -> Self {
        Credentials(Arc::new(Inner {
            access_key_id: Zeroizing::new(access_key_id.into()),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
            session_token: Zeroizing::new(session_token),
            expires_after,
            provider_name,
        }))
    }

    /// Creates `Credentials` from hardcoded access & secret keys.
    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            "Static",
        )
    }

    /// Credentials with blank key ids.
    ///
    /// Empty credentials disable signing entirely: the executor dispatches
    /// the request without an `Authorization` header.
    pub fn empty() -> Self {
        Self::new("", "", None, None, "Empty")
    }

    /// Returns true iff both the access key id and the secret are blank.
    pub fn is_empty(&self) -> bool {
        self.0.access_key_id.is_empty() && self.0.secret_access_key.is_empty()
    }

    /// Returns the access key id.
    pub fn access_key_id(&self) -> &str {
        &self.0.access_key_id
    }

    /// Returns the secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.0.secret_access_key
    }

    /// Returns the session token, if present.
    pub fn session_token(&self) -> Option<&str> {
        self.0.session_token.as_deref()
    }

    /// Returns the time when these credentials expire, if any.
    pub fn expiry(&self) -> Option<SystemTime> {
        self.0.expires_after
    }

    /// Returns the name of the provider that sourced these credentials.
    pub fn provider_name(&self) -> &'static str {
        self.0.provider_name
    }
}

#[cfg(test)]
mod tests {
    use super::Credentials;

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::from_keys("AKID", "sekrit", Some("token".into()));
        let debugged = format!("{:?}", creds);
        assert!(debugged.contains("AKID"));
        assert!(!debugged.contains("sekrit"));
        assert!(!debugged.contains("token"));
    }

    #[test]
    fn empty_credentials() {
        assert!(Credentials::empty().is_empty());
        assert!(!Credentials::from_keys("AKID", "", None).is_empty());
        assert!(!Credentials::from_keys("", "secret", None).is_empty());
    }
}
