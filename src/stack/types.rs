//! Messages, views and events exchanged between layers

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Network identity of a stack instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    id: Uuid,
    /// Human-readable name, ignored for equality and hashing
    #[serde(default)]
    name: Option<String>,
}

impl Address {
    /// Create a fresh random address
    pub fn random() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
        }
    }

    /// Create a fresh random address carrying a logical name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Some(name.into()),
        }
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self { id, name: None }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Address {}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => {
                let simple = self.id.simple().to_string();
                write!(f, "{}", &simple[..8])
            }
        }
    }
}

/// A single message travelling through the stack.
///
/// `dest == None` means the message is addressed to the whole group.
#[derive(Debug, Clone)]
pub struct Message {
    pub src: Option<Address>,
    pub dest: Option<Address>,
    pub payload: Bytes,
}

impl Message {
    /// Create a multicast message
    pub fn multicast(payload: impl Into<Bytes>) -> Self {
        Self {
            src: None,
            dest: None,
            payload: payload.into(),
        }
    }

    /// Create a unicast message to `dest`
    pub fn unicast(dest: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            src: None,
            dest: Some(dest),
            payload: payload.into(),
        }
    }

    pub fn with_src(mut self, src: Address) -> Self {
        self.src = Some(src);
        self
    }

    pub fn is_multicast(&self) -> bool {
        self.dest.is_none()
    }

    /// Copy the message, payload included, into fresh storage
    pub fn copy(&self) -> Self {
        Self {
            src: self.src.clone(),
            dest: self.dest.clone(),
            payload: Bytes::copy_from_slice(&self.payload),
        }
    }
}

/// Several messages delivered upward together
#[derive(Debug, Clone, Default)]
pub struct MessageBatch {
    pub sender: Option<Address>,
    pub messages: Vec<Message>,
}

impl MessageBatch {
    pub fn new(sender: Option<Address>, messages: Vec<Message>) -> Self {
        Self { sender, messages }
    }

    /// Source of a message in this batch, falling back to the batch sender
    pub fn sender_of<'a>(&'a self, msg: &'a Message) -> Option<&'a Address> {
        msg.src.as_ref().or(self.sender.as_ref())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Group membership as installed by the membership layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub view_id: u64,
    pub members: Vec<Address>,
}

impl View {
    pub fn new(view_id: u64, members: Vec<Address>) -> Self {
        Self { view_id, members }
    }

    /// First member of the view
    pub fn coordinator(&self) -> Option<&Address> {
        self.members.first()
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.members.contains(addr)
    }
}

/// Discovery information returned by the transport for a single member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryData {
    pub address: Address,
    pub logical_name: String,
    pub coordinator: bool,
}

/// Events passed up and down the stack
#[derive(Debug, Clone)]
pub enum Event {
    /// A single application or protocol message
    Message(Message),

    /// A new membership view was installed
    ViewChange(View),

    /// The local address was assigned
    SetLocalAddress(Address),

    /// Ask the transport for the local address
    GetLocalAddress,

    /// Ask the transport for discovery data of the group
    DiscoveryRequest,

    /// Any event this stack does not interpret
    Other(String),
}

/// Result value of an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    LocalAddress(Address),
    DiscoveryData(Vec<DiscoveryData>),
}

/// Direction of travel through the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_equality_ignores_name() {
        let id = Uuid::new_v4();
        let a = Address::from_uuid(id);
        let b = Address {
            id,
            name: Some("node-a".into()),
        };
        assert_eq!(a, b);
        assert_ne!(a, Address::random());
    }

    #[test]
    fn test_address_display() {
        assert_eq!(Address::named("node-a").to_string(), "node-a");
        assert_eq!(Address::random().to_string().len(), 8);
    }

    #[test]
    fn test_message_copy_is_deep() {
        let msg = Message::multicast(vec![1u8, 2, 3]).with_src(Address::random());
        let copy = msg.copy();

        assert_eq!(copy.payload, msg.payload);
        assert_eq!(copy.src, msg.src);
        assert_ne!(copy.payload.as_ptr(), msg.payload.as_ptr());
    }

    #[test]
    fn test_batch_sender_fallback() {
        let sender = Address::random();
        let other = Address::random();
        let batch = MessageBatch::new(
            Some(sender.clone()),
            vec![
                Message::multicast("a"),
                Message::multicast("b").with_src(other.clone()),
            ],
        );

        assert_eq!(batch.sender_of(&batch.messages[0]), Some(&sender));
        assert_eq!(batch.sender_of(&batch.messages[1]), Some(&other));
    }

    #[test]
    fn test_view_coordinator() {
        let a = Address::random();
        let b = Address::random();
        let view = View::new(1, vec![a.clone(), b.clone()]);

        assert_eq!(view.coordinator(), Some(&a));
        assert!(view.contains(&b));
        assert!(!View::new(2, vec![]).contains(&a));
    }
}
