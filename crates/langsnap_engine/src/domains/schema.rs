//! Table definitions backing the catalogue.

use super::{USERS_TABLE, WORD_TABLE};
use crate::store::{OnDelete, TableSchema};
use langsnap_codec::FieldType::{Integer, Text};

/// Returns the platform's tables, parents before children.
///
/// Phrase children cascade on delete, so clearing a language's phrases also
/// removes their words, glosses and notes.
pub fn schema() -> Vec<TableSchema> {
    vec![
        TableSchema::new(USERS_TABLE)
            .column("id", Text)
            .column("email", Text)
            .primary_key(&["id"])
            .unique("email"),
        TableSchema::new(WORD_TABLE)
            .column("id", Text)
            .column("text", Text)
            .primary_key(&["id"]),
        TableSchema::new("language")
            .column("id", Text)
            .column("code", Text)
            .column("english_name", Text)
            .nullable("local_name", Text)
            .column("font", Text)
            .column("text_direction", Text)
            .nullable("translation_ids", Text)
            .primary_key(&["id"])
            .uuid("id")
            .unique("code"),
        TableSchema::new("language_member_role")
            .column("language_id", Text)
            .column("user_id", Text)
            .column("role", Text)
            .primary_key(&["language_id", "user_id", "role"])
            .references("language_id", "language", OnDelete::Cascade)
            .references("user_id", USERS_TABLE, OnDelete::Cascade),
        TableSchema::new("phrase")
            .column("id", Integer)
            .column("language_id", Text)
            .column("created_at", Text)
            .nullable("created_by", Text)
            .nullable("deleted_at", Text)
            .nullable("deleted_by", Text)
            .primary_key(&["id"])
            .sequence("id")
            .references("language_id", "language", OnDelete::Cascade)
            .references("created_by", USERS_TABLE, OnDelete::Restrict)
            .references("deleted_by", USERS_TABLE, OnDelete::Restrict),
        TableSchema::new("phrase_word")
            .column("phrase_id", Integer)
            .column("word_id", Text)
            .primary_key(&["phrase_id", "word_id"])
            .references("phrase_id", "phrase", OnDelete::Cascade)
            .references("word_id", WORD_TABLE, OnDelete::Restrict),
        TableSchema::new("gloss")
            .column("phrase_id", Integer)
            .nullable("gloss", Text)
            .column("state", Text)
            .nullable("updated_at", Text)
            .nullable("updated_by", Text)
            .nullable("source", Text)
            .primary_key(&["phrase_id"])
            .references("phrase_id", "phrase", OnDelete::Cascade)
            .references("updated_by", USERS_TABLE, OnDelete::Restrict),
        note_table("footnote"),
        note_table("translator_note"),
        TableSchema::new("machine_gloss")
            .column("id", Integer)
            .column("word_id", Text)
            .column("language_id", Text)
            .column("gloss", Text)
            .nullable("model", Text)
            .primary_key(&["id"])
            .sequence("id")
            .references("word_id", WORD_TABLE, OnDelete::Restrict)
            .references("language_id", "language", OnDelete::Cascade),
        TableSchema::new("tracking_event")
            .column("id", Text)
            .column("type", Text)
            .nullable("user_id", Text)
            .column("language_id", Text)
            .nullable("data", Text)
            .column("created_at", Text)
            .primary_key(&["id"])
            .uuid("id")
            .references("user_id", USERS_TABLE, OnDelete::Restrict)
            .references("language_id", "language", OnDelete::Cascade),
        TableSchema::new("weekly_contribution_statistics")
            .column("week", Text)
            .column("language_id", Text)
            .column("user_id", Text)
            .column("book_id", Integer)
            .column("approved_count", Integer)
            .column("revised_count", Integer)
            .column("unapproved_count", Integer)
            .primary_key(&["week", "language_id", "user_id", "book_id"])
            .references("language_id", "language", OnDelete::Cascade)
            .references("user_id", USERS_TABLE, OnDelete::Restrict),
        TableSchema::new("weekly_gloss_statistics")
            .column("week", Text)
            .column("language_id", Text)
            .column("book_id", Integer)
            .column("approved_count", Integer)
            .column("unapproved_count", Integer)
            .primary_key(&["week", "language_id", "book_id"])
            .references("language_id", "language", OnDelete::Cascade),
    ]
}

fn note_table(name: &'static str) -> TableSchema {
    TableSchema::new(name)
        .column("phrase_id", Integer)
        .column("author_id", Text)
        .column("timestamp", Text)
        .column("content", Text)
        .primary_key(&["phrase_id"])
        .references("phrase_id", "phrase", OnDelete::Cascade)
        .references("author_id", USERS_TABLE, OnDelete::Restrict)
}
