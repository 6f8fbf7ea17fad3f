// Wed Jan 15 2026 - Alex

/// Constant-pool lookups backing a bytecode buffer.
///
/// The pool is owned by whoever loaded the bytecode. The decoder and
/// resolver only borrow it, and a pool's address is part of every cache
/// key, so it must stay put for as long as handles into it are alive.
pub trait ConstantPool: Send + Sync {
    /// The raw bytecode that traits offsets point into.
    fn bytecode(&self) -> &[u8];

    /// Display name of multiname `index`, or `None` when unresolved.
    fn multiname(&self, index: u32) -> Option<String>;

    /// Bare name of method `index`; empty when the method is anonymous.
    fn method_name(&self, index: u32) -> String;
}

pub(crate) fn pool_address(pool: &dyn ConstantPool) -> usize {
    pool as *const dyn ConstantPool as *const () as usize
}
