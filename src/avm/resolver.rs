// Wed Jan 15 2026 - Alex

use crate::avm::cache::IdentityCache;
use crate::avm::pool::pool_address;
use crate::avm::{BinaryCursor, BytecodeError, ConstantPool, DecodedTraits, HeaderKind, TraitDecoder, TraitKind};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_LOCAL_IDENTITY: AtomicU64 = AtomicU64::new(1);

static GLOBAL_RESOLVER: Lazy<NameResolver> = Lazy::new(NameResolver::new);

/// Location of one traits record: a pool and an offset into its bytecode.
#[derive(Clone, Copy)]
pub struct TraitsHandle<'p> {
    pool: &'p dyn ConstantPool,
    blob_offset: usize,
    header_kind: HeaderKind,
}

/// Cache key for a [`TraitsHandle`]. The header kind is not part of it; one
/// offset holds exactly one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraitsKey {
    pool: usize,
    blob_offset: usize,
}

impl<'p> TraitsHandle<'p> {
    pub fn new(pool: &'p dyn ConstantPool, blob_offset: usize, header_kind: HeaderKind) -> Self {
        Self {
            pool,
            blob_offset,
            header_kind,
        }
    }

    pub fn pool(&self) -> &'p dyn ConstantPool {
        self.pool
    }

    pub fn blob_offset(&self) -> usize {
        self.blob_offset
    }

    pub fn header_kind(&self) -> HeaderKind {
        self.header_kind
    }

    pub fn key(&self) -> TraitsKey {
        TraitsKey {
            pool: pool_address(self.pool),
            blob_offset: self.blob_offset,
        }
    }

    /// Decodes without touching any cache.
    pub fn decode(&self) -> Result<DecodedTraits, BytecodeError> {
        let bytecode = self.pool.bytecode();
        if self.blob_offset > bytecode.len() {
            return Err(BytecodeError::UnexpectedEof {
                position: self.blob_offset,
                needed: self.blob_offset - bytecode.len(),
            });
        }
        let mut cursor = BinaryCursor::at(bytecode, self.blob_offset);
        TraitDecoder::decode(&mut cursor, self.header_kind, self.pool)
    }
}

impl fmt::Debug for TraitsHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitsHandle")
            .field("pool", &format_args!("{:#x}", pool_address(self.pool)))
            .field("blob_offset", &self.blob_offset)
            .field("header_kind", &self.header_kind)
            .finish()
    }
}

/// Identity of a method descriptor. Equal indices in distinct descriptors
/// are distinct identities and get separate name cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodIdentity {
    /// Address of a descriptor object owned by someone else.
    Descriptor(u64),
    /// Allocated by [`MethodHandle::new`].
    Local(u64),
}

/// A method to name. Copies share the identity of the handle they came from.
#[derive(Clone, Copy)]
pub struct MethodHandle<'p> {
    identity: MethodIdentity,
    method_index: u32,
    pool: &'p dyn ConstantPool,
    declaring_scope: Option<TraitsHandle<'p>>,
}

impl<'p> MethodHandle<'p> {
    pub fn new(pool: &'p dyn ConstantPool, method_index: u32, declaring_scope: Option<TraitsHandle<'p>>) -> Self {
        let identity = MethodIdentity::Local(NEXT_LOCAL_IDENTITY.fetch_add(1, Ordering::Relaxed));
        Self {
            identity,
            method_index,
            pool,
            declaring_scope,
        }
    }

    pub fn with_identity(
        descriptor: u64,
        pool: &'p dyn ConstantPool,
        method_index: u32,
        declaring_scope: Option<TraitsHandle<'p>>,
    ) -> Self {
        Self {
            identity: MethodIdentity::Descriptor(descriptor),
            method_index,
            pool,
            declaring_scope,
        }
    }

    pub fn identity(&self) -> MethodIdentity {
        self.identity
    }

    pub fn method_index(&self) -> u32 {
        self.method_index
    }

    pub fn pool(&self) -> &'p dyn ConstantPool {
        self.pool
    }

    pub fn declaring_scope(&self) -> Option<TraitsHandle<'p>> {
        self.declaring_scope
    }
}

impl fmt::Debug for MethodHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandle")
            .field("identity", &self.identity)
            .field("method_index", &self.method_index)
            .field("declaring_scope", &self.declaring_scope)
            .finish()
    }
}

pub type TraitsCache = IdentityCache<TraitsKey, Arc<DecodedTraits>>;
pub type NameCache = IdentityCache<MethodIdentity, Arc<str>>;

/// Method display names layered over cached trait decoding.
pub struct NameResolver {
    traits: TraitsCache,
    names: NameCache,
}

impl NameResolver {
    pub fn new() -> Self {
        Self {
            traits: TraitsCache::new(),
            names: NameCache::new(),
        }
    }

    pub fn global() -> &'static NameResolver {
        &GLOBAL_RESOLVER
    }

    pub fn decode_traits(&self, handle: &TraitsHandle<'_>) -> Result<Arc<DecodedTraits>, BytecodeError> {
        let key = handle.key();
        if let Some(traits) = self.traits.get(&key) {
            return Ok(traits);
        }

        let decoded = Arc::new(handle.decode()?);
        Ok(self.traits.insert_if_absent(key, decoded))
    }

    /// Display name of `method`: the bare name from its pool, prefixed with
    /// `get ` or `set ` when the declaring scope lists it as an accessor.
    ///
    /// The scope is searched even when the bare name is empty, so an
    /// anonymous getter comes back as `"get "` rather than `""`.
    ///
    /// If the scope fails to decode, the error is logged and the bare name
    /// is returned without being cached.
    pub fn resolve_name(&self, method: &MethodHandle<'_>) -> Arc<str> {
        if let Some(name) = self.names.get(&method.identity) {
            return name;
        }

        let bare = method.pool.method_name(method.method_index);
        let Some(scope) = method.declaring_scope else {
            return self.names.insert_if_absent(method.identity, Arc::from(bare));
        };

        match self.decode_traits(&scope) {
            Ok(traits) => {
                let resolved = compose_name(bare, &traits, method.method_index);
                self.names.insert_if_absent(method.identity, Arc::from(resolved))
            }
            Err(e) => {
                log::error!("Failed to decode traits at {:?}: {}", scope, e);
                Arc::from(bare)
            }
        }
    }

    pub fn clear(&self) {
        self.traits.clear();
        self.names.clear();
        log::debug!("Cleared trait and name caches");
    }

    pub fn traits_cache_len(&self) -> usize {
        self.traits.len()
    }

    pub fn name_cache_len(&self) -> usize {
        self.names.len()
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn compose_name(bare: String, traits: &DecodedTraits, method_index: u32) -> String {
    match traits.find_method(method_index).map(|record| record.kind) {
        Some(TraitKind::Getter) => format!("get {}", bare),
        Some(TraitKind::Setter) => format!("set {}", bare),
        _ => bare,
    }
}

pub fn resolve_name(method: &MethodHandle<'_>) -> Arc<str> {
    NameResolver::global().resolve_name(method)
}

pub fn decode_traits(handle: &TraitsHandle<'_>) -> Result<Arc<DecodedTraits>, BytecodeError> {
    NameResolver::global().decode_traits(handle)
}

/// Drops every cached decode and name. Call after the bytecode behind any
/// handle has been replaced.
pub fn clear_caches() {
    NameResolver::global().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avm::traits::tests::StaticPool;

    // class header with a getter, a setter, and a plain method
    fn accessor_pool() -> StaticPool {
        let bytes = vec![
            0x00, 0x03, //
            0x01, 0x02, 0x00, 0x07, //
            0x01, 0x03, 0x00, 0x08, //
            0x02, 0x01, 0x00, 0x09,
        ];
        StaticPool::new(bytes)
            .with_multiname(1, "health")
            .with_multiname(2, "reset")
            .with_method(7, "health")
            .with_method(8, "health")
            .with_method(9, "reset")
    }

    #[test]
    fn test_getter_prefix() {
        let pool = accessor_pool();
        let resolver = NameResolver::new();
        let scope = TraitsHandle::new(&pool, 0, HeaderKind::Class);

        let getter = MethodHandle::new(&pool, 7, Some(scope));
        let setter = MethodHandle::new(&pool, 8, Some(scope));
        let method = MethodHandle::new(&pool, 9, Some(scope));

        assert_eq!(&*resolver.resolve_name(&getter), "get health");
        assert_eq!(&*resolver.resolve_name(&setter), "set health");
        assert_eq!(&*resolver.resolve_name(&method), "reset");
        assert_eq!(resolver.traits_cache_len(), 1);
        assert_eq!(resolver.name_cache_len(), 3);
    }

    #[test]
    fn test_without_scope_or_match() {
        let pool = accessor_pool().with_method(4, "orphan");
        let resolver = NameResolver::new();
        let scope = TraitsHandle::new(&pool, 0, HeaderKind::Class);

        assert_eq!(&*resolver.resolve_name(&MethodHandle::new(&pool, 4, None)), "orphan");
        assert_eq!(&*resolver.resolve_name(&MethodHandle::new(&pool, 4, Some(scope))), "orphan");
        assert_eq!(&*resolver.resolve_name(&MethodHandle::new(&pool, 5, Some(scope))), "");
    }

    #[test]
    fn test_empty_bare_name_still_prefixed() {
        let mut pool = accessor_pool();
        pool.methods.remove(&7);
        let resolver = NameResolver::new();
        let scope = TraitsHandle::new(&pool, 0, HeaderKind::Class);

        assert_eq!(&*resolver.resolve_name(&MethodHandle::new(&pool, 7, Some(scope))), "get ");
    }

    #[test]
    fn test_concurrent_resolution_shares_one_entry() {
        let pool = accessor_pool();
        let resolver = NameResolver::new();
        let scope = TraitsHandle::new(&pool, 0, HeaderKind::Class);
        let handle = MethodHandle::new(&pool, 7, Some(scope));

        let names: Vec<Arc<str>> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    let copy = handle;
                    let resolver = &resolver;
                    s.spawn(move || resolver.resolve_name(&copy))
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert!(names.iter().all(|name| &**name == "get health"));
        assert_eq!(resolver.name_cache_len(), 1);
        assert_eq!(resolver.traits_cache_len(), 1);
    }

    #[test]
    fn test_distinct_identities_are_separate_entries() {
        let pool = accessor_pool();
        let resolver = NameResolver::new();
        let first = MethodHandle::new(&pool, 9, None);
        let second = MethodHandle::new(&pool, 9, None);
        assert_ne!(first.identity(), second.identity());

        resolver.resolve_name(&first);
        resolver.resolve_name(&second);
        resolver.resolve_name(&first.clone());
        assert_eq!(resolver.name_cache_len(), 2);

        let remote_a = MethodHandle::with_identity(0x7f00_1000, &pool, 9, None);
        let remote_b = MethodHandle::with_identity(0x7f00_1000, &pool, 7, None);
        assert_eq!(&*resolver.resolve_name(&remote_a), "reset");
        // same descriptor address, so the first name sticks
        assert_eq!(&*resolver.resolve_name(&remote_b), "reset");
        assert_eq!(resolver.name_cache_len(), 3);
    }

    #[test]
    fn test_clear_then_redecode_is_value_equal() {
        let pool = accessor_pool();
        let resolver = NameResolver::new();
        let scope = TraitsHandle::new(&pool, 0, HeaderKind::Class);

        let before = resolver.decode_traits(&scope).unwrap();
        assert!(Arc::ptr_eq(&before, &resolver.decode_traits(&scope).unwrap()));

        resolver.clear();
        assert_eq!(resolver.traits_cache_len(), 0);
        assert_eq!(resolver.name_cache_len(), 0);

        let after = resolver.decode_traits(&scope).unwrap();
        assert_eq!(*before, *after);
    }

    #[test]
    fn test_decode_failure_falls_back_uncached() {
        let pool = StaticPool::new(vec![0x00, 0x02, 0x01]).with_method(3, "broken");
        let resolver = NameResolver::new();
        let scope = TraitsHandle::new(&pool, 0, HeaderKind::Class);
        let handle = MethodHandle::new(&pool, 3, Some(scope));

        assert_eq!(&*resolver.resolve_name(&handle), "broken");
        assert_eq!(resolver.traits_cache_len(), 0);
        assert_eq!(resolver.name_cache_len(), 0);

        let past_end = TraitsHandle::new(&pool, 64, HeaderKind::Script);
        assert!(resolver.decode_traits(&past_end).is_err());
    }

    #[test]
    fn test_global_free_functions() {
        let pool = accessor_pool();
        let scope = TraitsHandle::new(&pool, 0, HeaderKind::Class);
        let handle = MethodHandle::new(&pool, 8, Some(scope));

        assert_eq!(&*resolve_name(&handle), "set health");
        assert_eq!(decode_traits(&scope).unwrap().len(), 3);
    }
}
