//! Scalar operators.
//!
//! Scalar expressions are trees of [`ScalarOperator`]s. They appear as trailing children of
//! relational operators, e.g. the predicate of a [`Select`](crate::operator::Select) or the
//! project list of a [`Project`](crate::operator::Project).
mod utils;
pub use utils::*;

use std::fmt::{Display, Formatter};

use datafusion_common::ScalarValue;
use datafusion_expr::Operator as CmpOp;
use enum_as_inner::EnumAsInner;
use enum_dispatch::enum_dispatch;
use strum_macros::{AsRefStr, EnumDiscriminants};

use crate::column::{remap_column, ColRef, ColRefMap, ColRefSet};
use crate::error::OptResult;
use crate::metadata::IndexDescriptorRef;
use crate::operator::ScalarOperator::*;
use crate::operator::{Arity, DisplayFields, RemapColumns};

#[enum_dispatch]
#[derive(Clone, Debug, Hash, Eq, PartialEq, EnumAsInner, AsRefStr, EnumDiscriminants)]
#[strum_discriminants(name(ScalarOperatorId), derive(Hash, AsRefStr))]
pub enum ScalarOperator {
    ScalarIdent(Ident),
    ScalarConst(Const),
    ScalarCmp(Cmp),
    ScalarBoolOp(BoolOp),
    ScalarIsNull(IsNull),
    ScalarFunc(Func),
    ScalarSubquery(Subquery),
    ScalarProjectList(ProjectList),
    ScalarProjectElement(ProjectElement),
    ScalarBitmapIndexProbe(BitmapIndexProbe),
}

#[enum_dispatch(ScalarOperator)]
pub trait ScalarOperatorTrait {
    fn arity(&self) -> Arity;

    /// Columns read by this node itself, children excluded.
    fn used_columns(&self) -> ColRefSet {
        ColRefSet::new()
    }

    /// Columns computed by this node itself, children excluded.
    fn defined_columns(&self) -> ColRefSet {
        ColRefSet::new()
    }

    fn has_subquery(&self) -> bool {
        false
    }

    fn is_volatile(&self) -> bool {
        false
    }

    /// Whether the children are relational expressions rather than scalar ones.
    fn has_relational_child(&self) -> bool {
        false
    }
}

/// Reference to a column.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Ident {
    column: ColRef,
}

impl Ident {
    pub fn new(column: ColRef) -> Self {
        Self { column }
    }

    pub fn column(&self) -> &ColRef {
        &self.column
    }
}

impl ScalarOperatorTrait for Ident {
    fn arity(&self) -> Arity {
        Arity::Fixed(0)
    }

    fn used_columns(&self) -> ColRefSet {
        std::iter::once(&self.column).collect()
    }
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Const {
    value: ScalarValue,
}

impl Const {
    pub fn new(value: ScalarValue) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &ScalarValue {
        &self.value
    }
}

impl ScalarOperatorTrait for Const {
    fn arity(&self) -> Arity {
        Arity::Fixed(0)
    }
}

/// Binary comparison.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Cmp {
    op: CmpOp,
}

impl Cmp {
    pub fn new(op: CmpOp) -> Self {
        Self { op }
    }

    pub fn op(&self) -> CmpOp {
        self.op
    }
}

impl ScalarOperatorTrait for Cmp {
    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }
}

#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, AsRefStr)]
pub enum BoolOpKind {
    And,
    Or,
    Not,
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct BoolOp {
    kind: BoolOpKind,
}

impl BoolOp {
    pub fn new(kind: BoolOpKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> BoolOpKind {
        self.kind
    }
}

impl ScalarOperatorTrait for BoolOp {
    fn arity(&self) -> Arity {
        match self.kind {
            BoolOpKind::And | BoolOpKind::Or => Arity::AtLeast(2),
            BoolOpKind::Not => Arity::Fixed(1),
        }
    }
}

#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct IsNull {}

impl ScalarOperatorTrait for IsNull {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }
}

/// Function call, aggregates included.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Func {
    name: String,
    volatile: bool,
}

impl Func {
    pub fn new<S: Into<String>>(name: S, volatile: bool) -> Self {
        Self {
            name: name.into(),
            volatile,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ScalarOperatorTrait for Func {
    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    fn is_volatile(&self) -> bool {
        self.volatile
    }
}

/// Scalar subquery returning `column` of its relational child.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Subquery {
    column: ColRef,
}

impl Subquery {
    pub fn new(column: ColRef) -> Self {
        Self { column }
    }

    pub fn column(&self) -> &ColRef {
        &self.column
    }
}

impl ScalarOperatorTrait for Subquery {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn has_subquery(&self) -> bool {
        true
    }

    fn has_relational_child(&self) -> bool {
        true
    }
}

/// List of [`ProjectElement`]s.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct ProjectList {}

impl ScalarOperatorTrait for ProjectList {
    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }
}

/// Defines `column` as the value of its only child.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct ProjectElement {
    column: ColRef,
}

impl ProjectElement {
    pub fn new(column: ColRef) -> Self {
        Self { column }
    }

    pub fn column(&self) -> &ColRef {
        &self.column
    }
}

impl ScalarOperatorTrait for ProjectElement {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn defined_columns(&self) -> ColRefSet {
        std::iter::once(&self.column).collect()
    }
}

/// Probes a bitmap index with the condition of its child.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct BitmapIndexProbe {
    index: IndexDescriptorRef,
}

impl BitmapIndexProbe {
    pub fn new(index: IndexDescriptorRef) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &IndexDescriptorRef {
        &self.index
    }
}

impl ScalarOperatorTrait for BitmapIndexProbe {
    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }
}

impl DisplayFields for Ident {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.column)
    }
}

impl DisplayFields for Const {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.value)
    }
}

impl DisplayFields for Cmp {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.op)
    }
}

impl DisplayFields for BoolOp {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.kind.as_ref())
    }
}

impl DisplayFields for IsNull {
    fn display(&self, _f: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}

impl DisplayFields for Func {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("name", &self.name)
            .field("volatile", &self.volatile)
            .finish()
    }
}

impl DisplayFields for Subquery {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.column)
    }
}

impl DisplayFields for ProjectList {
    fn display(&self, _f: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}

impl DisplayFields for ProjectElement {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.column)
    }
}

impl DisplayFields for BitmapIndexProbe {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.index.name())
    }
}

impl RemapColumns for ScalarOperator {
    fn remap_columns(&self, map: &ColRefMap, must_exist: bool) -> OptResult<Self> {
        Ok(match self {
            ScalarIdent(op) => ScalarIdent(Ident::new(remap_column(&op.column, map, must_exist)?)),
            ScalarSubquery(op) => {
                ScalarSubquery(Subquery::new(remap_column(&op.column, map, must_exist)?))
            }
            ScalarProjectElement(op) => ScalarProjectElement(ProjectElement::new(remap_column(
                &op.column, map, must_exist,
            )?)),
            _ => self.clone(),
        })
    }
}

impl Display for ScalarOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())?;
        self.display(f)
    }
}
