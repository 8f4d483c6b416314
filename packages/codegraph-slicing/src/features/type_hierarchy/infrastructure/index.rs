//! In-memory type hierarchy index
//!
//! Answers subtype, declaration and dispatch queries over the front-end's
//! resolved types. Cycles in malformed input are tolerated: every walk
//! keeps a visited set.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::debug;

use crate::errors::{ResolutionError, Result};
use crate::features::type_hierarchy::ports::TypeHierarchy;
use crate::shared::models::{
    CallableId, CallableKind, ParamPassing, Program, Signature, TypeId,
};

#[derive(Debug, Clone)]
struct TypeEntry {
    name: String,
    supertypes: Vec<TypeId>,
    subtypes: Vec<TypeId>,
    methods: Vec<CallableId>,
}

/// What later stages need to know about a declaration
#[derive(Debug, Clone)]
pub struct DeclarationInfo {
    pub id: CallableId,
    pub name: String,
    pub kind: CallableKind,
    pub owner: TypeId,
    pub signature: Signature,
    pub is_static: bool,
    pub has_body: bool,
    pub returns_value: bool,
    pub passing: Vec<ParamPassing>,
}

impl DeclarationInfo {
    /// Only instance methods take part in virtual dispatch
    pub fn is_dispatched(&self) -> bool {
        self.kind == CallableKind::Method && !self.is_static
    }

    pub fn is_by_reference(&self, position: usize) -> bool {
        self.passing.get(position) == Some(&ParamPassing::ByReference)
    }
}

/// Whether a catch clause handles a thrown exception type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionMatch {
    /// Always caught here; routing stops
    Definite,
    /// May be caught here depending on the runtime type
    Possible,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct TypeHierarchyIndex {
    types: FxHashMap<TypeId, TypeEntry>,
    by_name: FxHashMap<String, TypeId>,
    declarations: FxHashMap<CallableId, DeclarationInfo>,
}

impl TypeHierarchyIndex {
    /// Index every type and callable of `program`
    pub fn build(program: &Program) -> Result<Self> {
        let mut index = Self::default();

        for decl in &program.types {
            index.by_name.insert(decl.name.clone(), decl.id);
            index.types.insert(
                decl.id,
                TypeEntry {
                    name: decl.name.clone(),
                    supertypes: decl.supertypes.clone(),
                    subtypes: Vec::new(),
                    methods: Vec::new(),
                },
            );
        }

        for decl in &program.types {
            for sup in &decl.supertypes {
                let entry = index
                    .types
                    .get_mut(sup)
                    .ok_or(ResolutionError::UnknownType(*sup))?;
                entry.subtypes.push(decl.id);
            }
        }

        for callable in &program.callables {
            let owner = index
                .types
                .get_mut(&callable.owner)
                .ok_or(ResolutionError::UnknownType(callable.owner))?;
            owner.methods.push(callable.id);

            index.declarations.insert(
                callable.id,
                DeclarationInfo {
                    id: callable.id,
                    name: callable.name.clone(),
                    kind: callable.kind,
                    owner: callable.owner,
                    signature: callable.signature.clone(),
                    is_static: callable.is_static,
                    has_body: callable.has_body(),
                    returns_value: callable.returns_value,
                    passing: callable.params.iter().map(|p| p.passing).collect(),
                },
            );
        }

        debug!(
            types = index.types.len(),
            declarations = index.declarations.len(),
            "type hierarchy indexed"
        );
        Ok(index)
    }

    pub fn declaration(&self, id: CallableId) -> Option<&DeclarationInfo> {
        self.declarations.get(&id)
    }

    /// All declarations, ordered by id
    pub fn declarations(&self) -> Vec<&DeclarationInfo> {
        let mut decls: Vec<_> = self.declarations.values().collect();
        decls.sort_by_key(|d| d.id);
        decls
    }

    pub fn type_name(&self, t: TypeId) -> Option<&str> {
        self.types.get(&t).map(|e| e.name.as_str())
    }

    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// `t` and its transitive supertypes, nearest first
    pub fn supertypes_of(&self, t: TypeId) -> Vec<TypeId> {
        self.walk(t, |e| &e.supertypes)
    }

    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        self.supertypes_of(sub).contains(&sup)
    }

    fn walk(&self, start: TypeId, next: impl Fn(&TypeEntry) -> &Vec<TypeId>) -> Vec<TypeId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(t) = queue.pop_front() {
            if !seen.insert(t) {
                continue;
            }
            order.push(t);
            if let Some(entry) = self.types.get(&t) {
                queue.extend(next(entry).iter().copied());
            }
        }
        order
    }

    /// Whether a handler for `caught` (`None` = catch-all) handles `thrown`.
    ///
    /// Types unknown to the program are treated as possibly related.
    pub fn exception_match(&self, thrown: &str, caught: Option<&str>) -> ExceptionMatch {
        let caught = match caught {
            None => return ExceptionMatch::Definite,
            Some(c) => c,
        };
        if thrown == caught {
            return ExceptionMatch::Definite;
        }

        match (self.type_by_name(thrown), self.type_by_name(caught)) {
            (Some(t), Some(c)) if self.is_subtype(t, c) => ExceptionMatch::Definite,
            (Some(t), Some(c)) if self.is_subtype(c, t) => ExceptionMatch::Possible,
            (Some(_), Some(_)) => ExceptionMatch::None,
            _ => ExceptionMatch::Possible,
        }
    }
}

impl TypeHierarchy for TypeHierarchyIndex {
    fn subtypes_of(&self, t: TypeId) -> Vec<TypeId> {
        let mut subtypes = self.walk(t, |e| &e.subtypes);
        subtypes.sort();
        subtypes
    }

    fn declares_signature(&self, t: TypeId, sig: &Signature) -> Option<CallableId> {
        let entry = self.types.get(&t)?;
        entry.methods.iter().copied().find(|m| {
            self.declarations
                .get(m)
                .map(|d| d.kind == CallableKind::Method && &d.signature == sig)
                .unwrap_or(false)
        })
    }

    fn find_method(&self, t: TypeId, sig: &Signature) -> Option<CallableId> {
        self.supertypes_of(t)
            .into_iter()
            .find_map(|s| self.declares_signature(s, sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::utils::ProgramBuilder;

    /// Shape <- Circle <- Ring, Shape <- Square
    fn shapes() -> (TypeHierarchyIndex, [TypeId; 4], [CallableId; 3]) {
        let mut b = ProgramBuilder::new();
        let shape = b.class("Shape", &[]);
        let circle = b.class("Circle", &[shape]);
        let ring = b.class("Ring", &[circle]);
        let square = b.class("Square", &[shape]);
        let shape_area = b.method(shape, "area", &[]);
        let circle_area = b.method(circle, "area", &[]);
        let square_area = b.method(square, "area", &[]);
        let index = TypeHierarchyIndex::build(&b.build()).unwrap();
        (
            index,
            [shape, circle, ring, square],
            [shape_area, circle_area, square_area],
        )
    }

    #[test]
    fn test_subtypes_reflexive_transitive() {
        let (index, [shape, circle, ring, square], _) = shapes();
        assert_eq!(index.subtypes_of(shape), vec![shape, circle, ring, square]);
        assert_eq!(index.subtypes_of(circle), vec![circle, ring]);
        assert_eq!(index.subtypes_of(ring), vec![ring]);
    }

    #[test]
    fn test_find_method_inherits() {
        let (index, [shape, circle, ring, square], [shape_area, circle_area, square_area]) =
            shapes();
        let sig = Signature::new("area", vec![]);
        assert_eq!(index.find_method(shape, &sig), Some(shape_area));
        assert_eq!(index.find_method(circle, &sig), Some(circle_area));
        assert_eq!(index.find_method(ring, &sig), Some(circle_area));
        assert_eq!(index.find_method(square, &sig), Some(square_area));
        assert_eq!(index.declares_signature(ring, &sig), None);
    }

    #[test]
    fn test_unknown_supertype() {
        let mut b = ProgramBuilder::new();
        b.class("Orphan", &[TypeId(42)]);
        let err = TypeHierarchyIndex::build(&b.build()).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::SlicingError::Resolution(ResolutionError::UnknownType(TypeId(42)))
        ));
    }

    #[test]
    fn test_exception_match() {
        let mut b = ProgramBuilder::new();
        let exc = b.class("Exception", &[]);
        let io = b.class("IOException", &[exc]);
        b.class("EOFException", &[io]);
        b.class("Error", &[]);
        let index = TypeHierarchyIndex::build(&b.build()).unwrap();

        assert_eq!(index.exception_match("IOException", None), ExceptionMatch::Definite);
        assert_eq!(
            index.exception_match("EOFException", Some("Exception")),
            ExceptionMatch::Definite
        );
        assert_eq!(
            index.exception_match("Exception", Some("IOException")),
            ExceptionMatch::Possible
        );
        assert_eq!(
            index.exception_match("Error", Some("IOException")),
            ExceptionMatch::None
        );
        assert_eq!(
            index.exception_match("SqlError", Some("IOException")),
            ExceptionMatch::Possible
        );
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let mut b = ProgramBuilder::new();
        let a = b.class("A", &[TypeId(1)]);
        let c = b.class("B", &[a]);
        let index = TypeHierarchyIndex::build(&b.build()).unwrap();
        assert_eq!(index.subtypes_of(a), vec![a, c]);
        assert!(index.is_subtype(a, c));
    }
}
