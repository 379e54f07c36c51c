/// Who may create entities of a storage by sending `Create`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CreatePolicy {
    /// Only the server creates entities; client `Create`s are ignored
    ServerOnly,
    /// Clients marked authenticated with `ServerWorld::set_authenticated`
    AuthenticatedClients,
    AnyClient,
}

/// Per-storage settings given at registration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub create_policy: CreatePolicy,
    /// Whether the storage is part of whole-world snapshots
    pub permanent: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            create_policy: CreatePolicy::ServerOnly,
            permanent: true,
        }
    }
}

impl StorageConfig {
    pub fn with_policy(mut self, create_policy: CreatePolicy) -> Self {
        self.create_policy = create_policy;
        self
    }

    /// Leaves the storage out of snapshots
    pub fn impermanent(mut self) -> Self {
        self.permanent = false;
        self
    }
}
