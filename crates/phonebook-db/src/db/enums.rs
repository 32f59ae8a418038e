//! Database enum types with Diesel serialization.
//!
//! Each enum maps to a `TEXT` column guarded by a CHECK constraint and
//! implements `ToSql` and `FromSql` for conversion between Rust and `PostgreSQL`.

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use phonebook_core::error::CoreError;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Upstream integration variant of a source.
///
/// Maps to `source.kind` CHECK constraint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Manual,
    ManualLink,
    CmsUser,
    #[serde(rename = "cms_spaces")]
    CmsCoSpace,
    Tms,
    Vcs,
    Seevia,
    Epm,
}

impl SourceKind {
    /// Order in which an address book sync visits source kinds.
    ///
    /// `Manual` is absent: its groups are edited in place and never fetched.
    pub const SYNC_ORDER: [Self; 7] = [
        Self::CmsUser,
        Self::CmsCoSpace,
        Self::Tms,
        Self::Seevia,
        Self::Epm,
        Self::Vcs,
        Self::ManualLink,
    ];

    /// Returns the database string representation of this source kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::ManualLink => "manual_link",
            Self::CmsUser => "cms_user",
            Self::CmsCoSpace => "cms_spaces",
            Self::Tms => "tms",
            Self::Vcs => "vcs",
            Self::Seevia => "seevia",
            Self::Epm => "epm",
        }
    }

    /// Human readable type label shown in listings and exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::ManualLink => "Manual link",
            Self::CmsUser => "CMS User",
            Self::CmsCoSpace => "CMS Spaces",
            Self::Tms => "TMS",
            Self::Vcs => "VCS",
            Self::Seevia => "Seevia",
            Self::Epm => "Room systems",
        }
    }

    /// Whether groups and items of this kind may be edited by hand.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl ToSql<Text, Pg> for SourceKind {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for SourceKind {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = std::str::from_utf8(bytes.as_bytes())?;
        raw.parse::<Self>().map_err(|e| e.to_string().into())
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "manual_link" => Ok(Self::ManualLink),
            "cms_user" => Ok(Self::CmsUser),
            "cms_spaces" => Ok(Self::CmsCoSpace),
            "tms" => Ok(Self::Tms),
            "vcs" => Ok(Self::Vcs),
            "seevia" => Ok(Self::Seevia),
            "epm" => Ok(Self::Epm),
            other => Err(CoreError::ParseError(format!("unknown source kind: {other}"))),
        }
    }
}

/// Whether an address book is served locally or proxied to an external phonebook.
///
/// Maps to `address_book.kind` CHECK constraint.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    AsExpression,
    FromSqlRow,
    serde::Serialize,
    serde::Deserialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum AddressBookKind {
    #[default]
    Local,
    External,
}

impl AddressBookKind {
    /// Returns the database string representation of this address book kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::External => "external",
        }
    }
}

impl ToSql<Text, Pg> for AddressBookKind {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for AddressBookKind {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"local" => Ok(Self::Local),
            b"external" => Ok(Self::External),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl fmt::Display for AddressBookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_round_trips_through_discriminator() {
        for kind in SourceKind::SYNC_ORDER {
            assert_eq!(kind.as_str().parse::<SourceKind>().ok(), Some(kind));
        }
        assert_eq!("manual".parse::<SourceKind>().ok(), Some(SourceKind::Manual));
        assert!("Manual".parse::<SourceKind>().is_err());
    }

    #[test]
    fn serde_names_match_discriminators() {
        let json = serde_json::to_string(&SourceKind::CmsCoSpace).unwrap();
        assert_eq!(json, "\"cms_spaces\"");
        let json = serde_json::to_string(&SourceKind::ManualLink).unwrap();
        assert_eq!(json, "\"manual_link\"");
    }

    #[test]
    fn sync_order_skips_manual() {
        assert!(!SourceKind::SYNC_ORDER.contains(&SourceKind::Manual));
        assert_eq!(SourceKind::SYNC_ORDER.last(), Some(&SourceKind::ManualLink));
    }
}
