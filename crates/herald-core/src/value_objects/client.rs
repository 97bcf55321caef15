//! Client handle
//!
//! Opaque reference to the client that owns a gateway connection. Events carry it
//! so consumers can reach back into the client without the core knowing its type.

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
struct ClientInner {
    id: Uuid,
    name: String,
}

/// Cheaply clonable handle identifying the owning client
#[derive(Clone)]
pub struct ClientHandle {
    inner: Arc<ClientInner>,
}

impl ClientHandle {
    /// Create a handle with a fresh random id
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    #[must_use]
    pub fn with_id(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                id,
                name: name.into(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether both handles point at the same client instance
    pub fn same_client(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ClientHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ClientHandle {}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.inner.name, self.inner.id)
    }
}
