//! Tracking events and weekly statistics.

use super::{LANGUAGE, USER, USER_ALLOCATION};
use crate::mapper::IdAllocation;
use crate::plugin::FieldSpec;
use crate::registry::PluginRegistry;
use crate::store::ScopeFilter;
use crate::table::TablePlugin;
use langsnap_codec::FieldType::{Integer, Text};

const BY_LANGUAGE: ScopeFilter = ScopeFilter::Column("language_id");

/// Returns the reporting domain registry.
pub fn reporting_registry() -> PluginRegistry {
    PluginRegistry::new("reporting", LANGUAGE)
        .with_plugin(
            TablePlugin::new(
                "tracking_event",
                BY_LANGUAGE,
                vec![
                    FieldSpec::identity("id", Text),
                    FieldSpec::data("type", Text),
                    FieldSpec::reference("user_id", Text, USER),
                    FieldSpec::reference("language_id", Text, LANGUAGE),
                    FieldSpec::data("data", Text),
                    FieldSpec::data("created_at", Text),
                ],
            )
            .with_identity(IdAllocation::Uuid),
        )
        .with_plugin(TablePlugin::new(
            "weekly_contribution_statistics",
            BY_LANGUAGE,
            vec![
                FieldSpec::data("week", Text),
                FieldSpec::reference("language_id", Text, LANGUAGE),
                FieldSpec::reference("user_id", Text, USER),
                FieldSpec::business_key("book_id", Integer),
                FieldSpec::data("approved_count", Integer),
                FieldSpec::data("revised_count", Integer),
                FieldSpec::data("unapproved_count", Integer),
            ],
        ))
        .with_plugin(TablePlugin::new(
            "weekly_gloss_statistics",
            BY_LANGUAGE,
            vec![
                FieldSpec::data("week", Text),
                FieldSpec::reference("language_id", Text, LANGUAGE),
                FieldSpec::business_key("book_id", Integer),
                FieldSpec::data("approved_count", Integer),
                FieldSpec::data("unapproved_count", Integer),
            ],
        ))
        .with_external(USER, USER_ALLOCATION)
}
