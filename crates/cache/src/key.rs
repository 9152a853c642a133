//! Cache keys
//!
//! A [`CacheKey`] identifies the compiled shape of a command. Two commands
//! whose keys are equal compile to the same definition and may share it.
//!
//! Key components:
//! - command type
//! - statement text (exact, case- and whitespace-sensitive)
//! - ordered parameter shapes (name, type usage, direction)
//! - mapping fingerprint of the target connection's workspace
//! - invariant name of the target connection's provider
//!
//! Parameter values are never part of a key.

use std::fmt;
use std::hash::{Hash, Hasher};

use quarry_core::{CommandType, ParameterDirection, TypeUsage};
use smallvec::SmallVec;
use xxhash_rust::xxh3::Xxh3;

/// Shape of one parameter as it participates in a key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyParameter {
    /// Parameter name
    pub name: String,
    /// Resolved type usage
    pub type_usage: TypeUsage,
    /// Parameter direction
    pub direction: ParameterDirection,
}

/// Structural identity of a compiled command
///
/// Equality compares every component; the hash is computed once at
/// construction.
#[derive(Clone)]
pub struct CacheKey {
    command_type: CommandType,
    text: String,
    parameters: SmallVec<[KeyParameter; 4]>,
    mapping_fingerprint: u64,
    provider: String,
    hash: u64,
}

impl CacheKey {
    /// Build a key
    ///
    /// `parameters` must be in command parameter order; order is significant.
    pub fn new<I>(
        command_type: CommandType,
        text: impl Into<String>,
        parameters: I,
        mapping_fingerprint: u64,
        provider: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = (String, TypeUsage, ParameterDirection)>,
    {
        let text = text.into();
        let provider = provider.into();
        let parameters: SmallVec<[KeyParameter; 4]> = parameters
            .into_iter()
            .map(|(name, type_usage, direction)| KeyParameter {
                name,
                type_usage,
                direction,
            })
            .collect();

        let mut hasher = Xxh3::new();
        command_type.hash(&mut hasher);
        text.hash(&mut hasher);
        parameters.as_slice().hash(&mut hasher);
        mapping_fingerprint.hash(&mut hasher);
        provider.hash(&mut hasher);

        Self {
            command_type,
            text,
            parameters,
            mapping_fingerprint,
            provider,
            hash: hasher.finish(),
        }
    }

    /// Command type
    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// Statement text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parameter shapes in order
    pub fn parameters(&self) -> &[KeyParameter] {
        &self.parameters
    }

    /// Mapping fingerprint of the target workspace
    pub fn mapping_fingerprint(&self) -> u64 {
        self.mapping_fingerprint
    }

    /// Provider invariant name
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Precomputed hash
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.command_type == other.command_type
            && self.mapping_fingerprint == other.mapping_fingerprint
            && self.text == other.text
            && self.provider == other.provider
            && self.parameters == other.parameters
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKey")
            .field("command_type", &self.command_type)
            .field("text", &self.text)
            .field("parameters", &self.parameters.len())
            .field("provider", &self.provider)
            .field("hash", &format_args!("{:016x}", self.hash))
            .finish()
    }
}
