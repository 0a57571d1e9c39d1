use std::fmt;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(
            Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(ConversationId);
string_id!(WorkspaceId);
string_id!(AgentId);

/// Where a conversation lives on disk. Fixed at creation.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConversationLocation {
    pub workspace_id: WorkspaceId,
    pub agent_id: AgentId,
}

impl ConversationLocation {
    pub fn new(workspace_id: WorkspaceId, agent_id: AgentId) -> Self {
        Self {
            workspace_id,
            agent_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ConversationId::new("c-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c-1\"");
        let parsed: AgentId = serde_json::from_str("\"agent-a\"").unwrap();
        assert_eq!(parsed.as_str(), "agent-a");
        assert_eq!(WorkspaceId::from("ws1").to_string(), "ws1");
    }
}
