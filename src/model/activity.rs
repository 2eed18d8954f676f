use serde::{Deserialize, Serialize};

/// A participant in a conversation.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChannelAccount {
    pub id: String,
    pub name: String,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        ChannelAccount {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// What the chat host hands to the bot on each turn.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Activity {
    Message {
        text: String,
    },
    ConversationUpdate {
        members_added: Vec<ChannelAccount>,
        /// The bot itself; never greeted.
        recipient: ChannelAccount,
    },
    Other {
        kind: String,
    },
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CardImage {
    pub url: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct CardAction {
    /// Always `"openUrl"` for the cards this bot builds.
    #[serde(rename = "type")]
    pub type_field: String,
    pub title: String,
    pub value: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ThumbnailCard {
    pub title: String,
    pub subtitle: String,
    pub text: String,
    pub images: Vec<CardImage>,
    pub buttons: Vec<CardAction>,
}

/// What the bot sends back to the chat host.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum Reply {
    Text(String),
    Card(ThumbnailCard),
}
