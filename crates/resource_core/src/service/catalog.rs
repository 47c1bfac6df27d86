//! Descriptors for the site's administrable tables.
//!
//! # Responsibility
//! - Declare which columns of the migrated site tables are exposed.
//!
//! # Invariants
//! - Every declared column exists in the `db::migrations` schema.
//! - Secret columns (`users.password_hash`) are never declared.

use crate::model::descriptor::{DescriptorError, KeyGeneration, TableDescriptor};
use crate::query::page::SortDirection;

/// Builds every site table descriptor, in a stable order.
pub fn site_descriptors() -> Result<Vec<TableDescriptor>, DescriptorError> {
    Ok(vec![
        users()?,
        releases()?,
        events()?,
        contacts()?,
        newsletter()?,
    ])
}

fn users() -> Result<TableDescriptor, DescriptorError> {
    TableDescriptor::builder("users")
        .columns(["email", "role", "name", "created_at", "updated_at", "last_login"])
        .sortable(["email", "name", "created_at"])
        .default_sort("created_at", SortDirection::Desc)
        .touch_on_update("updated_at")
        .build()
}

fn releases() -> Result<TableDescriptor, DescriptorError> {
    TableDescriptor::builder("releases")
        .columns([
            "title",
            "artist",
            "genre",
            "release_date",
            "description",
            "cover_image_url",
            "audio_url",
            "soundcloud_url",
            "spotify_url",
            "youtube_url",
            "is_featured",
            "play_count",
            "created_at",
            "updated_at",
        ])
        .sortable(["title", "release_date", "play_count", "created_at"])
        .default_sort("created_at", SortDirection::Desc)
        .boolean_columns(["is_featured"])
        .touch_on_update("updated_at")
        .key_generation(KeyGeneration::UuidV4)
        .build()
}

fn events() -> Result<TableDescriptor, DescriptorError> {
    TableDescriptor::builder("events")
        .columns([
            "title",
            "venue",
            "location",
            "event_date",
            "description",
            "status",
            "ticket_url",
            "image_url",
            "created_at",
            "updated_at",
        ])
        .sortable(["title", "event_date", "status", "created_at"])
        .default_sort("event_date", SortDirection::Desc)
        .touch_on_update("updated_at")
        .key_generation(KeyGeneration::UuidV4)
        .build()
}

fn contacts() -> Result<TableDescriptor, DescriptorError> {
    TableDescriptor::builder("contacts")
        .columns(["name", "email", "subject", "message", "status", "created_at"])
        .sortable(["name", "status", "created_at"])
        .default_sort("created_at", SortDirection::Desc)
        .key_generation(KeyGeneration::UuidV4)
        .build()
}

fn newsletter() -> Result<TableDescriptor, DescriptorError> {
    TableDescriptor::builder("newsletter")
        .columns(["email", "is_active", "subscribed_at", "unsubscribed_at"])
        .sortable(["email", "subscribed_at"])
        .default_sort("subscribed_at", SortDirection::Desc)
        .boolean_columns(["is_active"])
        .build()
}
