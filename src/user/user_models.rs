//! User data models

use serde::{Deserialize, Serialize};

/// Full user profile.
///
/// Field names on the wire follow the client protocol, hence the renames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "__pubkey__")]
    pub pubkey: String,
    #[serde(rename = "_username_")]
    pub username: String,
    #[serde(rename = "_pfp")]
    pub pfp: String,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_lastname")]
    pub lastname: String,
    #[serde(rename = "_description")]
    pub description: String,
    #[serde(rename = "_birthdate")]
    pub birthdate: String,
    #[serde(rename = "_country")]
    pub country: String,
    #[serde(rename = "_flag")]
    pub flag: String,
    #[serde(rename = "_city")]
    pub city: String,
    #[serde(rename = "_phone")]
    pub phone: String,
    #[serde(rename = "_email")]
    pub email: String,
    #[serde(rename = "_verified")]
    pub verified: bool,
    #[serde(rename = "_twitter")]
    pub twitter: String,
    #[serde(rename = "_instagram")]
    pub instagram: String,
    #[serde(rename = "_discord")]
    pub discord: String,
    #[serde(rename = "_telegram")]
    pub telegram: String,
    #[serde(rename = "_youtube")]
    pub youtube: String,
    #[serde(rename = "_tiktok")]
    pub tiktok: String,
    #[serde(rename = "_magiceden")]
    pub magiceden: String,
    #[serde(rename = "_opensea")]
    pub opensea: String,
    #[serde(rename = "_appuser")]
    pub appuser: bool,
    /// Unix millis
    #[serde(rename = "_created_at")]
    pub created_at: i64,
    /// Unix millis of the last profile change
    #[serde(rename = "_timestamp")]
    pub timestamp: i64,
}

/// Reduced user view returned by searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "__pubkey__")]
    pub pubkey: String,
    #[serde(rename = "_username_")]
    pub username: String,
    #[serde(rename = "_pfp")]
    pub pfp: String,
    #[serde(rename = "_verified")]
    pub verified: bool,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            pubkey: user.pubkey,
            username: user.username,
            pfp: user.pfp,
            verified: user.verified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLog {
    #[serde(rename = "_pubkey")]
    pub pubkey: String,
    #[serde(rename = "_logs")]
    pub log: String,
    #[serde(rename = "_timestamp")]
    pub timestamp: i64,
}

/// Profile fields a user may change, identified by their wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Username,
    Pfp,
    Name,
    Lastname,
    Description,
    Birthdate,
    Country,
    Flag,
    City,
    Phone,
    Email,
    Verified,
    Twitter,
    Instagram,
    Discord,
    Telegram,
    Youtube,
    Tiktok,
    Magiceden,
    Opensea,
}

impl UserField {
    const ALL: [UserField; 20] = [
        UserField::Username,
        UserField::Pfp,
        UserField::Name,
        UserField::Lastname,
        UserField::Description,
        UserField::Birthdate,
        UserField::Country,
        UserField::Flag,
        UserField::City,
        UserField::Phone,
        UserField::Email,
        UserField::Verified,
        UserField::Twitter,
        UserField::Instagram,
        UserField::Discord,
        UserField::Telegram,
        UserField::Youtube,
        UserField::Tiktok,
        UserField::Magiceden,
        UserField::Opensea,
    ];

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_name() == name)
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            UserField::Username => "_username_",
            UserField::Pfp => "_pfp",
            UserField::Name => "_name",
            UserField::Lastname => "_lastname",
            UserField::Description => "_description",
            UserField::Birthdate => "_birthdate",
            UserField::Country => "_country",
            UserField::Flag => "_flag",
            UserField::City => "_city",
            UserField::Phone => "_phone",
            UserField::Email => "_email",
            UserField::Verified => "_verified",
            UserField::Twitter => "_twitter",
            UserField::Instagram => "_instagram",
            UserField::Discord => "_discord",
            UserField::Telegram => "_telegram",
            UserField::Youtube => "_youtube",
            UserField::Tiktok => "_tiktok",
            UserField::Magiceden => "_magiceden",
            UserField::Opensea => "_opensea",
        }
    }

    /// Column backing this field in the `users` table.
    pub fn column(&self) -> &'static str {
        self.wire_name().trim_matches('_')
    }

    /// Free-form fields are stored as given; the others go through the input filter.
    pub fn accepts_raw_input(&self) -> bool {
        matches!(self, UserField::Pfp | UserField::Description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_with_wire_names() {
        let user = User {
            pubkey: "pk".to_string(),
            username: "alice".to_string(),
            verified: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["__pubkey__"], "pk");
        assert_eq!(json["_username_"], "alice");
        assert_eq!(json["_verified"], true);
    }

    #[test]
    fn field_lookup_by_wire_name() {
        assert_eq!(UserField::from_wire_name("_pfp"), Some(UserField::Pfp));
        assert_eq!(
            UserField::from_wire_name("_username_"),
            Some(UserField::Username)
        );
        assert_eq!(UserField::from_wire_name("pubkey"), None);
        assert_eq!(UserField::from_wire_name("__pubkey__"), None);
        assert_eq!(UserField::from_wire_name("_timestamp"), None);
    }

    #[test]
    fn columns_strip_underscores() {
        assert_eq!(UserField::Username.column(), "username");
        assert_eq!(UserField::Magiceden.column(), "magiceden");
    }
}
