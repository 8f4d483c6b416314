//! Type hierarchy port
//!
//! The queries the call graph builder needs from a front-end's type model.

use crate::shared::models::{CallableId, Signature, TypeId};

/// Read-only type hierarchy queries
pub trait TypeHierarchy: Send + Sync {
    /// `t` and every transitive subtype of `t`
    fn subtypes_of(&self, t: TypeId) -> Vec<TypeId>;

    /// Method declared directly in `t` with signature `sig`
    fn declares_signature(&self, t: TypeId, sig: &Signature) -> Option<CallableId>;

    /// Declaration an instance of `t` dispatches `sig` to: own or inherited
    fn find_method(&self, t: TypeId, sig: &Signature) -> Option<CallableId>;
}
