//! Post-processing hooks run on the finished document.

use super::Document;
use crate::dispatch::ResultBag;
use serde_json::Value as Json;

/// Attribute read by [`AvatarUrlHook`]
pub const AVATAR_ATTRIBUTE: &str = "avatarURL";

/// Field added by [`AvatarUrlHook`]
pub const AVATAR_DOWNLOAD_FIELD: &str = "api_avatarDownloadURL";

/// Injects computed, non-stored fields into the serialized document
pub trait DocumentHook: Send + Sync {
    fn before_encode(&self, results: &ResultBag, document: &mut Document);
}

/// Adds the avatar download URL to `object` for avatar-bearing results
#[derive(Debug, Clone, Copy, Default)]
pub struct AvatarUrlHook;

impl DocumentHook for AvatarUrlHook {
    fn before_encode(&self, results: &ResultBag, document: &mut Document) {
        let Some(url) = results
            .object()
            .and_then(|object| object.attribute(AVATAR_ATTRIBUTE))
        else {
            return;
        };
        let Some(url) = url.as_str().filter(|u| !u.is_empty()) else {
            return;
        };

        if let Some(Json::Object(object)) = document.get_mut("object") {
            object.insert(AVATAR_DOWNLOAD_FIELD.to_string(), Json::String(url.to_string()));
        }
    }
}
