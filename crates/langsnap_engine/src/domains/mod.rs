//! The resource catalogue of the translation platform.
//!
//! Three domains, run in this order:
//!
//! | Domain      | Resources                                                      |
//! |-------------|----------------------------------------------------------------|
//! | language    | `language`, `language_member_role`                             |
//! | translation | `phrase`, `phrase_word`, `gloss`, `footnote`, `translator_note`, `machine_gloss` |
//! | reporting   | `tracking_event`, `weekly_contribution_statistics`, `weekly_gloss_statistics` |
//!
//! Users and words are shared by every language and are never transferred.
//! User keys must already exist in the destination; word keys are business
//! keys and must match by convention.

mod language;
mod reporting;
mod schema;
mod translation;

pub use language::{language_registry, LanguagePlugin};
pub use reporting::reporting_registry;
pub use schema::schema;
pub use translation::translation_registry;

use crate::mapper::IdAllocation;
use crate::registry::PluginRegistry;

/// The scope resource.
pub const LANGUAGE: &str = "language";
/// Externally owned user accounts, referenced by many resources.
pub const USER: &str = "user";
/// Table holding user accounts.
pub const USERS_TABLE: &str = "users";
/// Table holding the shared word list.
pub const WORD_TABLE: &str = "word";

/// How user keys are resolved on Import.
pub const USER_ALLOCATION: IdAllocation = IdAllocation::MustExist { table: USERS_TABLE };

/// Returns every domain registry in run order.
pub fn catalogue() -> Vec<PluginRegistry> {
    vec![language_registry(), translation_registry(), reporting_registry()]
}
