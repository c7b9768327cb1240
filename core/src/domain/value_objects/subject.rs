//! Normalized mobile number identifying the principal being verified.

use std::fmt;

use serde::{Deserialize, Serialize};

use mv_shared::utils::phone::{mask_phone_number, to_e164};

use crate::errors::{DomainResult, VerificationError};

/// A mobile number in E.164 form, e.g. `+15551234567`
///
/// This is the natural key of a [`TokenRecord`](crate::domain::TokenRecord):
/// the same person typing `0912 345 6789` or `+98 912 345 6789` maps to
/// the same subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    /// Normalize raw user input
    ///
    /// `default_country_code` (digits only, e.g. `"98"`) is applied to
    /// numbers given in national format.
    pub fn parse(raw: &str, default_country_code: Option<&str>) -> DomainResult<Self> {
        to_e164(raw, default_country_code)
            .map(Subject)
            .ok_or_else(|| VerificationError::InvalidSubject {
                subject: mask_phone_number(raw),
            })
    }

    /// The E.164 representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form for logs
    pub fn masked(&self) -> String {
        mask_phone_number(&self.0)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
