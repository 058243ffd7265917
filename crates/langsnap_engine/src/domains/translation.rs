//! Phrases, their words, glosses and notes.

use super::{LANGUAGE, USER, USER_ALLOCATION};
use crate::mapper::IdAllocation;
use crate::plugin::{Capabilities, FieldSpec};
use crate::registry::PluginRegistry;
use crate::store::ScopeFilter;
use crate::table::TablePlugin;
use langsnap_codec::FieldType::{Integer, Text};

const PHRASE: &str = "phrase";

/// Phrase children reach their language through the phrase row.
const BY_PHRASE: ScopeFilter = ScopeFilter::Parent {
    column: "phrase_id",
    table: PHRASE,
    scope_column: "language_id",
};

fn note(name: &'static str) -> TablePlugin {
    TablePlugin::new(
        name,
        BY_PHRASE,
        vec![
            FieldSpec::reference("phrase_id", Integer, PHRASE),
            FieldSpec::reference("author_id", Text, USER),
            FieldSpec::data("timestamp", Text),
            FieldSpec::data("content", Text),
        ],
    )
}

/// Returns the translation domain registry.
pub fn translation_registry() -> PluginRegistry {
    PluginRegistry::new("translation", LANGUAGE)
        .with_plugin(
            TablePlugin::new(
                PHRASE,
                ScopeFilter::Column("language_id"),
                vec![
                    FieldSpec::identity("id", Integer),
                    FieldSpec::reference("language_id", Text, LANGUAGE),
                    FieldSpec::data("created_at", Text),
                    FieldSpec::reference("created_by", Text, USER),
                    FieldSpec::data("deleted_at", Text),
                    FieldSpec::reference("deleted_by", Text, USER),
                ],
            )
            .with_identity(IdAllocation::Sequence { table: PHRASE }),
        )
        .with_plugin(TablePlugin::new(
            "phrase_word",
            BY_PHRASE,
            vec![
                FieldSpec::reference("phrase_id", Integer, PHRASE),
                FieldSpec::business_key("word_id", Text),
            ],
        ))
        .with_plugin(TablePlugin::new(
            "gloss",
            BY_PHRASE,
            vec![
                FieldSpec::reference("phrase_id", Integer, PHRASE),
                FieldSpec::data("gloss", Text),
                FieldSpec::data("state", Text),
                FieldSpec::data("updated_at", Text),
                FieldSpec::reference("updated_by", Text, USER),
                FieldSpec::data("source", Text),
            ],
        ))
        .with_plugin(note("footnote"))
        .with_plugin(note("translator_note"))
        .with_plugin(
            TablePlugin::new(
                "machine_gloss",
                ScopeFilter::Column("language_id"),
                vec![
                    FieldSpec::identity("id", Integer),
                    FieldSpec::business_key("word_id", Text),
                    FieldSpec::reference("language_id", Text, LANGUAGE),
                    FieldSpec::data("gloss", Text),
                    FieldSpec::data("model", Text),
                ],
            )
            .with_capabilities(Capabilities::WRITE_ONLY)
            .with_identity(IdAllocation::Sequence { table: "machine_gloss" }),
        )
        .with_external(USER, USER_ALLOCATION)
}
