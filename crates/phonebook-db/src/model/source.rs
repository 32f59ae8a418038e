use diesel::{AsExpression, FromSqlRow, pg::Pg, prelude::*, sql_types::Jsonb};
use serde::{Deserialize, Serialize};

use crate::db::{enums::SourceKind, schema};

/// Per-variant settings of a source, stored as JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Jsonb)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Hand-edited groups and items.
    Manual,
    /// Mirrors the manual source of another address book.
    ManualLink { manual_source_id: i64 },
    /// Users of a conferencing bridge.
    CmsUser { provider_id: i64 },
    /// Meeting spaces of a conferencing bridge.
    #[serde(rename = "cms_spaces")]
    CmsCoSpace {
        provider_id: i64,
        #[serde(default)]
        include_auto_generated: bool,
    },
    /// A legacy `PhoneBookSearch` server.
    Tms { mac: String, phonebook_url: String },
    /// Registrations of a video registrar.
    Vcs {
        provider_id: i64,
        #[serde(default)]
        limit_domains: String,
    },
    /// Third-party directory service, retired upstream.
    Seevia {
        username: String,
        password: String,
        organization_id: String,
    },
    /// Endpoints of the local room registry.
    Epm {
        #[serde(default)]
        org_unit_id: Option<i64>,
        #[serde(default)]
        flatten: bool,
        #[serde(default)]
        ignore_hide_status: bool,
    },
}

impl SourceConfig {
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Manual => SourceKind::Manual,
            Self::ManualLink { .. } => SourceKind::ManualLink,
            Self::CmsUser { .. } => SourceKind::CmsUser,
            Self::CmsCoSpace { .. } => SourceKind::CmsCoSpace,
            Self::Tms { .. } => SourceKind::Tms,
            Self::Vcs { .. } => SourceKind::Vcs,
            Self::Seevia { .. } => SourceKind::Seevia,
            Self::Epm { .. } => SourceKind::Epm,
        }
    }

    /// Whether the adapter yields a nested tree instead of a flat item list.
    #[must_use]
    pub const fn nested_items(&self) -> bool {
        matches!(
            self,
            Self::Manual | Self::ManualLink { .. } | Self::Tms { .. } | Self::Seevia { .. } | Self::Epm { .. }
        )
    }
}

/// One configured upstream integration of an address book.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::source)]
#[diesel(check_for_backend(Pg))]
pub struct Source {
    pub id: i64,
    pub address_book_id: i64,
    pub kind: SourceKind,
    pub title: String,
    pub prefix: String,
    pub config: SourceConfig,
    pub last_sync: Option<chrono::DateTime<chrono::Utc>>,
    /// Formatted error of the last sync, empty when healthy.
    pub sync_errors: String,
}

impl Source {
    /// Display name: the title, or the kind label when untitled.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.title.is_empty() {
            self.kind.label()
        } else {
            &self.title
        }
    }
}

/// Insert struct for creating sources
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::source)]
pub struct NewSource {
    pub address_book_id: i64,
    pub kind: SourceKind,
    pub title: String,
    pub prefix: String,
    pub config: SourceConfig,
}

impl NewSource {
    #[must_use]
    pub fn new(
        address_book_id: i64,
        title: impl Into<String>,
        prefix: impl Into<String>,
        config: SourceConfig,
    ) -> Self {
        Self {
            address_book_id,
            kind: config.kind(),
            title: title.into(),
            prefix: prefix.into(),
            config,
        }
    }
}
