//! Fixed vocabulary and party details written into every document

use crate::ids::IdentifierMode;
use serde::{Deserialize, Serialize};

pub const ERN_NAMESPACE: &str = "http://ddex.net/xml/ern/383";
pub const AVS_NAMESPACE: &str = "http://ddex.net/xml/avs/avs";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const SCHEMA_LOCATION: &str =
    "http://ddex.net/xml/ern/383 http://ddex.net/xml/ern/383/release-notification.xsd";
pub const MESSAGE_SCHEMA_VERSION: &str = "ern/383";

/// Document settings that vary between senders and recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentProfile {
    /// DDEX party id of the sender
    #[serde(default = "default_sender_party_id")]
    pub sender_party_id: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// DDEX party id of the recipient
    #[serde(default = "default_recipient_party_id")]
    pub recipient_party_id: String,

    #[serde(default = "default_recipient_name")]
    pub recipient_name: String,

    /// `LanguageAndScriptCode` on the root element
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_release_profile")]
    pub release_profile: String,

    #[serde(default = "default_release_type")]
    pub release_type: String,

    #[serde(default = "default_territory")]
    pub territory: String,

    #[serde(default = "default_control_type")]
    pub message_control_type: String,

    /// ℗ year used when a record has no publication year
    #[serde(default = "default_year")]
    pub fallback_published_year: i32,

    /// © year used when a record has no copyright year
    #[serde(default = "default_year")]
    pub fallback_copyright_year: i32,

    #[serde(default)]
    pub identifiers: IdentifierMode,
}

fn default_sender_party_id() -> String {
    "SenderPartyId".to_string()
}

fn default_sender_name() -> String {
    "Mkononi Limited".to_string()
}

fn default_recipient_party_id() -> String {
    "PA-DPIDA-2025021301-D".to_string()
}

fn default_recipient_name() -> String {
    "Boomplay".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_release_profile() -> String {
    "ClassicalAudioAlbum".to_string()
}

fn default_release_type() -> String {
    "Album".to_string()
}

fn default_territory() -> String {
    "Worldwide".to_string()
}

fn default_control_type() -> String {
    "LiveMessage".to_string()
}

fn default_year() -> i32 {
    2024
}

impl Default for DocumentProfile {
    fn default() -> Self {
        Self {
            sender_party_id: default_sender_party_id(),
            sender_name: default_sender_name(),
            recipient_party_id: default_recipient_party_id(),
            recipient_name: default_recipient_name(),
            language: default_language(),
            release_profile: default_release_profile(),
            release_type: default_release_type(),
            territory: default_territory(),
            message_control_type: default_control_type(),
            fallback_published_year: default_year(),
            fallback_copyright_year: default_year(),
            identifiers: IdentifierMode::default(),
        }
    }
}
