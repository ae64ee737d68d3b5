use crate::column::ColRefSet;
use crate::expression::ExpressionHandle;
use crate::operator::ScalarOperatorTrait;

/// Properties derived for a scalar expression tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrvdPropScalar {
    used_columns: ColRefSet,
    defined_columns: ColRefSet,
    has_subquery: bool,
    has_volatile: bool,
}

impl DrvdPropScalar {
    /// # Panics
    ///
    /// If the operator of `handle` is not scalar.
    pub fn derive(handle: &ExpressionHandle) -> Self {
        let op = match handle.operator().as_scalar() {
            Some(op) => op,
            None => panic!("{} is not a scalar operator", handle.operator().name()),
        };

        let mut props = Self {
            used_columns: op.used_columns(),
            defined_columns: op.defined_columns(),
            has_subquery: op.has_subquery(),
            has_volatile: op.is_volatile(),
        };

        for i in 0..handle.arity() {
            if handle.is_scalar_child(i) {
                let child = handle.child_scalar_props(i);
                props.used_columns.include_all(child.used_columns.iter());
                props.defined_columns.include_all(child.defined_columns.iter());
                props.has_subquery |= child.has_subquery;
                props.has_volatile |= child.has_volatile;
            } else {
                // Columns a subquery takes from outside are used by the enclosing scalar.
                let child = handle.child_relational(i);
                props.used_columns.include_all(child.outer_references().iter());
            }
        }

        props
    }

    pub fn used_columns(&self) -> &ColRefSet {
        &self.used_columns
    }

    pub fn defined_columns(&self) -> &ColRefSet {
        &self.defined_columns
    }

    pub fn has_subquery(&self) -> bool {
        self.has_subquery
    }

    pub fn has_volatile(&self) -> bool {
        self.has_volatile
    }
}
