/// Define an id type whose values come from a process-wide monotonic
/// counter.
///
/// Arena-backed ids (values, blocks, scopes, symbols) are defined
/// with `index_vec::define_index_type!` and mean "position in that
/// arena". This macro is for the one identity that outlives any
/// arena: AST node ids, which the parser mints at construction time
/// and which the dense side tables index on. Ids only ever grow, so
/// a relaxed fetch-add is enough.
#[macro_export]
macro_rules! fresh_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($counter:ident);) => {
        static $counter: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);

        $(#[$attr])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        $vis struct $name(u32);

        impl $name {
            /// Mint the next id.
            $vis fn fresh() -> Self {
                Self($counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
            }

            /// The raw value, for indexing dense tables.
            $vis fn as_usize(self) -> usize {
                self.0 as usize
            }
        }
    };
}
