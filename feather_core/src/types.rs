//! Semantic types and unification.
//!
//! `Ty` models SQLite's storage classes plus the structure the checker
//! needs: nullability as a structural `Optional` wrapper, unification
//! variables for bind parameters and recursive CTEs, row types for
//! subqueries, and an error sentinel that absorbs further constraints.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A unification variable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TyVar(pub u32);

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Ty {
    Text,
    Integer,
    Int,
    Real,
    Blob,
    Any,
    Bool,
    /// A nullable type. Nullability is structural: there is no flag on
    /// the other variants, only this wrapper.
    Optional(Box<Ty>),
    Var(TyVar),
    Row(RowTy),
    /// The error sentinel. Emitted alongside a diagnostic; unifying with
    /// it yields it and produces no further constraints.
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RowTy {
    /// An ordered sequence of named columns. A name may repeat; this is a
    /// sequence, not a map.
    Named(Vec<(String, Ty)>),
    /// An anonymous positional tuple.
    Tuple(Vec<Ty>),
}

impl Ty {
    /// Wrap in `Optional`. Idempotent; the error sentinel stays bare.
    pub fn optional(ty: Ty) -> Ty {
        match ty {
            Ty::Optional(_) | Ty::Error => ty,
            other => Ty::Optional(Box::new(other)),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Ty::Optional(_))
    }

    /// The type with any `Optional` wrapper removed, plus whether one was
    /// present.
    pub fn strip_optional(&self) -> (&Ty, bool) {
        match self {
            Ty::Optional(inner) => (inner, true),
            other => (other, false),
        }
    }

    pub fn into_base(self) -> Ty {
        match self {
            Ty::Optional(inner) => *inner,
            other => other,
        }
    }

    /// Re-wrap `self` as optional when `nullable` holds.
    pub fn wrap_if(self, nullable: bool) -> Ty {
        if nullable {
            Ty::optional(self)
        } else {
            self
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Integer | Ty::Int | Ty::Real)
    }

    /// Acceptable as a predicate: `BOOL` or `INTEGER` (SQLite has no real
    /// boolean storage class).
    pub fn is_boolean_like(&self) -> bool {
        let (base, _) = self.strip_optional();
        matches!(base, Ty::Bool | Ty::Integer | Ty::Int | Ty::Any | Ty::Error | Ty::Var(_))
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ty::Text => f.write_str("TEXT"),
            Ty::Integer => f.write_str("INTEGER"),
            Ty::Int => f.write_str("INT"),
            Ty::Real => f.write_str("REAL"),
            Ty::Blob => f.write_str("BLOB"),
            Ty::Any => f.write_str("ANY"),
            Ty::Bool => f.write_str("BOOL"),
            Ty::Optional(inner) => write!(f, "{inner}?"),
            Ty::Var(TyVar(n)) => write!(f, "${n}"),
            Ty::Row(RowTy::Named(columns)) => {
                f.write_str("(")?;
                for (i, (name, ty)) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str(")")
            }
            Ty::Row(RowTy::Tuple(items)) => {
                f.write_str("(")?;
                for (i, ty) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            }
            Ty::Error => f.write_str("<error>"),
        }
    }
}

/// The accumulated substitution: bindings from type variables to types.
#[derive(Clone, Debug, Default)]
pub struct Subst {
    bindings: HashMap<u32, Ty>,
    next: u32,
}

impl Subst {
    pub fn new() -> Self {
        Subst::default()
    }

    pub fn fresh_var(&mut self) -> TyVar {
        let var = TyVar(self.next);
        self.next += 1;
        var
    }

    pub fn fresh(&mut self) -> Ty {
        Ty::Var(self.fresh_var())
    }

    fn lookup(&self, var: TyVar) -> Option<&Ty> {
        self.bindings.get(&var.0)
    }

    pub fn bind(&mut self, var: TyVar, ty: Ty) {
        // binding a variable to itself would loop in resolve
        if let Ty::Var(other) = &ty {
            if *other == var {
                return;
            }
        }
        self.bindings.insert(var.0, ty);
    }

    /// Deeply apply the substitution.
    pub fn resolve(&self, ty: &Ty) -> Ty {
        match ty {
            Ty::Var(var) => match self.lookup(*var) {
                Some(bound) => self.resolve(&bound.clone()),
                None => ty.clone(),
            },
            Ty::Optional(inner) => Ty::optional(self.resolve(inner)),
            Ty::Row(RowTy::Named(columns)) => Ty::Row(RowTy::Named(
                columns
                    .iter()
                    .map(|(name, ty)| (name.clone(), self.resolve(ty)))
                    .collect(),
            )),
            Ty::Row(RowTy::Tuple(items)) => {
                Ty::Row(RowTy::Tuple(items.iter().map(|ty| self.resolve(ty)).collect()))
            }
            other => other.clone(),
        }
    }

    /// Like [`resolve`], but replaces any still-unbound variable with
    /// `ANY`. Used when finalizing a compiled artifact: no inferred type
    /// is ever a type variable after compilation completes.
    pub fn finalize(&self, ty: &Ty) -> Ty {
        match self.resolve(ty) {
            Ty::Var(_) => Ty::Any,
            Ty::Optional(inner) => Ty::optional(self.finalize(&inner)),
            Ty::Row(RowTy::Named(columns)) => Ty::Row(RowTy::Named(
                columns
                    .into_iter()
                    .map(|(name, ty)| {
                        let ty = self.finalize(&ty);
                        (name, ty)
                    })
                    .collect(),
            )),
            Ty::Row(RowTy::Tuple(items)) => Ty::Row(RowTy::Tuple(
                items.iter().map(|ty| self.finalize(ty)).collect(),
            )),
            other => other,
        }
    }

    /// Unify two types and return their most-informative common type
    /// under the SQLite affinity lattice. Unification never fails: a
    /// genuine mismatch joins to `ANY` (and [`joined_to_any`] lets the
    /// caller decide whether that deserves a diagnostic).
    pub fn unify(&mut self, a: &Ty, b: &Ty) -> Ty {
        let a = self.resolve(a);
        let b = self.resolve(b);
        match (&a, &b) {
            (Ty::Error, _) | (_, Ty::Error) => Ty::Error,
            (Ty::Var(va), Ty::Var(_)) => {
                self.bind(*va, b.clone());
                b
            }
            (Ty::Var(va), _) => {
                self.bind(*va, b.clone());
                b
            }
            (_, Ty::Var(vb)) => {
                self.bind(*vb, a.clone());
                a
            }
            (Ty::Optional(ia), _) => {
                let joined = self.unify(ia, &b.clone().into_base());
                Ty::optional(joined)
            }
            (_, Ty::Optional(ib)) => {
                let joined = self.unify(&a.clone().into_base(), ib);
                Ty::optional(joined)
            }
            (Ty::Row(ra), Ty::Row(rb)) => self.unify_rows(ra, rb),
            _ => join_nominal(&a, &b),
        }
    }

    fn unify_rows(&mut self, a: &RowTy, b: &RowTy) -> Ty {
        let (a_tys, b_tys): (Vec<Ty>, Vec<Ty>) = match (a, b) {
            (RowTy::Named(a), RowTy::Named(b)) => (
                a.iter().map(|(_, t)| t.clone()).collect(),
                b.iter().map(|(_, t)| t.clone()).collect(),
            ),
            (RowTy::Named(a), RowTy::Tuple(b)) | (RowTy::Tuple(b), RowTy::Named(a)) => (
                a.iter().map(|(_, t)| t.clone()).collect(),
                b.clone(),
            ),
            (RowTy::Tuple(a), RowTy::Tuple(b)) => (a.clone(), b.clone()),
        };
        if a_tys.len() != b_tys.len() {
            return Ty::Error;
        }
        let joined: Vec<Ty> = a_tys
            .iter()
            .zip(b_tys.iter())
            .map(|(x, y)| self.unify(x, y))
            .collect();
        match a {
            RowTy::Named(columns) => Ty::Row(RowTy::Named(
                columns
                    .iter()
                    .map(|(name, _)| name.clone())
                    .zip(joined)
                    .map(|(name, ty)| (name, ty))
                    .collect(),
            )),
            RowTy::Tuple(_) => Ty::Row(RowTy::Tuple(joined)),
        }
    }
}

/// The affinity lattice join for resolved nominal types:
/// `INTEGER ∨ INT = INTEGER`; integers with `REAL` give `REAL`; `TEXT` on
/// either side gives `TEXT`; `ANY` is the identity; everything else meets
/// at `ANY`.
pub fn join_nominal(a: &Ty, b: &Ty) -> Ty {
    use Ty::*;
    match (a, b) {
        (x, y) if x == y => x.clone(),
        (Any, other) | (other, Any) => other.clone(),
        (Integer, Int) | (Int, Integer) => Integer,
        (Integer, Real) | (Real, Integer) | (Int, Real) | (Real, Int) => Real,
        (Text, _) | (_, Text) => Text,
        (Bool, Integer) | (Integer, Bool) => Integer,
        (Bool, Int) | (Int, Bool) => Integer,
        _ => Any,
    }
}

/// Whether two resolved types genuinely disagree: both are concrete,
/// neither is `ANY`, and their join collapses to `ANY`.
pub fn joined_to_any(a: &Ty, b: &Ty) -> bool {
    let (a, _) = a.strip_optional();
    let (b, _) = b.strip_optional();
    if matches!(a, Ty::Any | Ty::Var(_) | Ty::Error) || matches!(b, Ty::Any | Ty::Var(_) | Ty::Error)
    {
        return false;
    }
    matches!(join_nominal(a, b), Ty::Any)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn optional_is_idempotent() {
        let t = Ty::optional(Ty::optional(Ty::Integer));
        assert_eq!(t, Ty::Optional(Box::new(Ty::Integer)));
        assert_eq!(Ty::optional(Ty::Error), Ty::Error);
    }

    #[test]
    fn lattice_joins() {
        assert_eq!(join_nominal(&Ty::Integer, &Ty::Int), Ty::Integer);
        assert_eq!(join_nominal(&Ty::Int, &Ty::Real), Ty::Real);
        assert_eq!(join_nominal(&Ty::Text, &Ty::Blob), Ty::Text);
        assert_eq!(join_nominal(&Ty::Blob, &Ty::Integer), Ty::Any);
        assert_eq!(join_nominal(&Ty::Any, &Ty::Real), Ty::Real);
    }

    #[test]
    fn unify_binds_variables() {
        let mut subst = Subst::new();
        let var = subst.fresh();
        let joined = subst.unify(&var, &Ty::Integer);
        assert_eq!(joined, Ty::Integer);
        assert_eq!(subst.resolve(&var), Ty::Integer);
    }

    #[test]
    fn unify_propagates_optionality() {
        let mut subst = Subst::new();
        let joined = subst.unify(&Ty::optional(Ty::Integer), &Ty::Integer);
        assert_eq!(joined, Ty::optional(Ty::Integer));
    }

    #[test]
    fn error_absorbs() {
        let mut subst = Subst::new();
        let var = subst.fresh();
        assert_eq!(subst.unify(&Ty::Error, &var), Ty::Error);
        // the variable picked up no binding from the error
        assert_eq!(subst.resolve(&var), var);
    }

    #[test]
    fn finalize_replaces_unbound_vars_with_any() {
        let mut subst = Subst::new();
        let var = subst.fresh();
        assert_eq!(subst.finalize(&var), Ty::Any);
        let nullable_var = Ty::optional(subst.fresh());
        assert_eq!(subst.finalize(&nullable_var), Ty::optional(Ty::Any));
    }

    #[test]
    fn conflicts_are_detectable() {
        assert!(joined_to_any(&Ty::Blob, &Ty::Integer));
        assert!(!joined_to_any(&Ty::Integer, &Ty::Real));
        assert!(!joined_to_any(&Ty::Any, &Ty::Blob));
    }
}
