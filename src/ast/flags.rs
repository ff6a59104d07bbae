use bitflags::bitflags;

bitflags! {
    /// Modifiers attached to class members and declarations.
    ///
    /// `READONLY` propagates deep immutability per spec (struct
    /// readonly taint); the others are plain syntactic markers the
    /// backends consult directly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModifierFlags: u32 {
        const NONE = 0;
        const STATIC = 1 << 0;
        const READONLY = 1 << 1;
        const EXPORT = 1 << 2;
        const PRIVATE = 1 << 3;
        const WEAK = 1 << 4;

        const ALL = Self::STATIC.bits() | Self::READONLY.bits() | Self::EXPORT.bits()
            | Self::PRIVATE.bits() | Self::WEAK.bits();
    }
}

impl Default for ModifierFlags {
    fn default() -> Self {
        Self::NONE
    }
}

bitflags! {
    /// Per-variable state tracked by definite-assignment analysis is a
    /// tri-state, not a flag set, but `DefiniteAssignFlags` models the
    /// *joinable* properties of a scope (whether it was entered
    /// conditionally, whether it's a loop body) which the statement
    /// validator consults when deciding how to merge branch outcomes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScopeFlags: u32 {
        const NONE = 0;
        const CONDITIONAL = 1 << 0;
        const LOOP_BODY = 1 << 1;
        const FUNCTION_BOUNDARY = 1 << 2;
    }
}

impl Default for ScopeFlags {
    fn default() -> Self {
        Self::NONE
    }
}
