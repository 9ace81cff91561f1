//! # Types Module
//!
//! Payload models for the note service. The access layer itself treats payloads as
//! opaque JSON; these types are used by the typed helpers on
//! [`ResilientClient`](crate::ResilientClient) and by the CLI.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Note`] | A note as returned by the service |
//! | [`Folder`] | A folder (a note with `type = folder`) |
//! | [`NoteDraft`] | Body for creating or updating a note |
//! | [`FolderDraft`] | Body for creating a folder |
//! | [`SearchHits`] | Search result list |

pub mod note;

pub use note::{Folder, FolderDraft, Note, NoteDraft, SearchHits};
