use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Index;
use std::sync::Arc;

use enumset::EnumSet;
use itertools::Itertools;
use log::{debug, trace};
use prettytable::Table;
use smallvec::SmallVec;

use crate::error::OptResult;
use crate::expression::{Expression, ExpressionHandle};
use crate::operator::Operator;
use crate::optimizer::OptimizerContext;
use crate::properties::{DrvdPropRelational, DrvdPropScalar};
use crate::stats::Statistics;
use crate::xforms::XformId;

type GroupIdVec = SmallVec<[GroupId; 3]>;

/// Table of equivalence groups explored by the driver.
///
/// Group expressions are deduplicated by operator and input groups. A scalar tree gets one
/// group per node, and its root group keeps the tree itself so bindings can hand it to
/// transforms whole.
#[derive(Default)]
pub struct Memo {
    groups: Vec<Group>,
    group_exprs: HashMap<GroupExprKey, GroupExprId>,
    root: Option<GroupId>,
}

#[derive(Hash, Eq, PartialEq, Clone, Copy, Ord, PartialOrd)]
pub struct GroupId(pub usize);

#[derive(Hash, Eq, PartialEq, Clone, Copy)]
pub struct GroupExprId {
    pub group_id: GroupId,
    pub expr_id: usize,
}

/// Outcome of inserting an expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InsertResult {
    pub group_id: GroupId,
    /// Set when a new group expression was added.
    pub new_expr: Option<GroupExprId>,
}

#[derive(Eq, PartialEq, Hash, Debug, Clone)]
struct GroupExprKey {
    operator: Operator,
    inputs: GroupIdVec,
}

pub struct Group {
    group_id: GroupId,
    exprs: Vec<GroupExpr>,
    relational_props: Option<Arc<DrvdPropRelational>>,
    scalar_props: Option<Arc<DrvdPropScalar>>,
    scalar_expr: Option<Arc<Expression>>,
    stats: RefCell<Option<Arc<Statistics>>>,
}

pub struct GroupExpr {
    id: GroupExprId,
    operator: Operator,
    inputs: GroupIdVec,
    /// Xform which produced this expression, `None` for the initial tree.
    origin: Option<XformId>,
    applied_xforms: EnumSet<XformId>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// If nothing has been inserted yet.
    pub fn root(&self) -> GroupId {
        match self.root {
            Some(root) => root,
            None => panic!("Memo is empty"),
        }
    }

    /// Inserts the initial tree and makes its group the root.
    pub fn init(&mut self, expr: &Arc<Expression>) -> GroupId {
        let group_id = self.insert_expression(expr, None, None).group_id;
        self.root = Some(group_id);
        group_id
    }

    pub fn contains(&self, group_id: GroupId) -> bool {
        group_id.0 < self.groups.len()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Inserts `expr` and its sub-trees.
    ///
    /// Group bound leaves resolve to their group. The root goes to `target` when given. An
    /// expression already present is never added twice; when it lives in a group other than
    /// `target`, the insertion is dropped.
    pub fn insert_expression(
        &mut self,
        expr: &Arc<Expression>,
        target: Option<GroupId>,
        origin: Option<XformId>,
    ) -> InsertResult {
        if let Some(group_id) = expr.group_id() {
            return InsertResult {
                group_id,
                new_expr: None,
            };
        }

        let inputs = expr
            .children()
            .iter()
            .map(|child| self.insert_expression(child, None, origin).group_id)
            .collect::<GroupIdVec>();
        let key = GroupExprKey {
            operator: expr.operator().clone(),
            inputs,
        };

        if let Some(existing) = self.group_exprs.get(&key) {
            if let Some(target) = target.filter(|t| *t != existing.group_id) {
                debug!(
                    "{} already exists in group {}, dropped from group {}",
                    expr.operator().name(),
                    existing.group_id,
                    target
                );
            }
            return InsertResult {
                group_id: existing.group_id,
                new_expr: None,
            };
        }

        let group_id = match target {
            Some(target) => target,
            None => self.new_group(&key, expr),
        };
        let group = &mut self.groups[group_id.0];
        let id = GroupExprId::new(group_id, group.exprs.len());
        trace!("New group expression {} {}", id, key.operator);
        group.exprs.push(GroupExpr {
            id,
            operator: key.operator.clone(),
            inputs: key.inputs.clone(),
            origin,
            applied_xforms: EnumSet::empty(),
        });
        self.group_exprs.insert(key, id);

        InsertResult {
            group_id,
            new_expr: Some(id),
        }
    }

    fn new_group(&mut self, key: &GroupExprKey, expr: &Arc<Expression>) -> GroupId {
        let group_id = GroupId(self.groups.len());
        let group_expr = GroupExpr {
            id: GroupExprId::new(group_id, 0),
            operator: key.operator.clone(),
            inputs: key.inputs.clone(),
            origin: None,
            applied_xforms: EnumSet::empty(),
        };
        let handle = ExpressionHandle::GroupExpr(self, &group_expr);
        let (relational_props, scalar_props, scalar_expr) = if key.operator.is_scalar() {
            (
                None,
                Some(Arc::new(DrvdPropScalar::derive(&handle))),
                Some(expr.clone()),
            )
        } else {
            (Some(Arc::new(DrvdPropRelational::derive(&handle))), None, None)
        };

        self.groups.push(Group {
            group_id,
            exprs: vec![],
            relational_props,
            scalar_props,
            scalar_expr,
            stats: RefCell::new(None),
        });
        group_id
    }

    /// Logical group expressions, in insertion order.
    pub fn logical_group_expr_ids(&self) -> Vec<GroupExprId> {
        self.groups
            .iter()
            .flat_map(|g| g.exprs.iter())
            .filter(|e| e.operator.is_logical())
            .map(|e| e.id)
            .collect()
    }

    pub(crate) fn mark_applied(&mut self, id: GroupExprId, xform: XformId) {
        self.groups[id.group_id.0].exprs[id.expr_id]
            .applied_xforms
            .insert(xform);
    }

    /// Statistics of a relational group, estimated from its first expression and cached.
    pub fn group_stats(&self, group_id: GroupId, ctx: &OptimizerContext) -> OptResult<Arc<Statistics>> {
        let group = &self[group_id];
        if let Some(stats) = group.stats.borrow().as_ref() {
            return Ok(stats.clone());
        }
        let group_expr = group.first_relational_expr();
        let handle = ExpressionHandle::GroupExpr(self, group_expr);
        let stats = Arc::new(
            group_expr
                .operator
                .as_relational()
                .derive_stats(&handle, ctx)?,
        );
        *group.stats.borrow_mut() = Some(stats.clone());
        Ok(stats)
    }

    /// Tree of the first logical expression of every group below `group_id`.
    pub fn extract_first(&self, group_id: GroupId) -> Arc<Expression> {
        let group = &self[group_id];
        if let Some(scalar) = &group.scalar_expr {
            return scalar.clone();
        }
        let group_expr = group.first_relational_expr();
        let children = group_expr
            .inputs
            .iter()
            .map(|input| self.extract_first(*input))
            .collect();
        Expression::build(group_expr.operator.clone(), children)
    }
}

impl Index<GroupId> for Memo {
    type Output = Group;

    fn index(&self, index: GroupId) -> &Self::Output {
        &self.groups[index.0]
    }
}

impl Index<GroupExprId> for Memo {
    type Output = GroupExpr;

    fn index(&self, index: GroupExprId) -> &Self::Output {
        &self.groups[index.group_id.0].exprs[index.expr_id]
    }
}

impl Debug for Memo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Groups in memo:")?;
        for group in &self.groups {
            writeln!(f, "{:?}", group)?;
        }
        Ok(())
    }
}

impl Group {
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn is_scalar(&self) -> bool {
        self.scalar_expr.is_some()
    }

    pub fn exprs(&self) -> &[GroupExpr] {
        &self.exprs
    }

    pub fn logical_exprs(&self) -> impl Iterator<Item = &GroupExpr> {
        self.exprs.iter().filter(|e| e.operator.is_logical())
    }

    pub fn physical_exprs(&self) -> impl Iterator<Item = &GroupExpr> {
        self.exprs.iter().filter(|e| e.operator.is_physical())
    }

    /// # Panics
    ///
    /// If the group is scalar.
    pub fn relational_props(&self) -> Arc<DrvdPropRelational> {
        match &self.relational_props {
            Some(props) => props.clone(),
            None => panic!("Group {} is scalar", self.group_id),
        }
    }

    /// # Panics
    ///
    /// If the group is relational.
    pub fn scalar_props(&self) -> Arc<DrvdPropScalar> {
        match &self.scalar_props {
            Some(props) => props.clone(),
            None => panic!("Group {} is relational", self.group_id),
        }
    }

    /// # Panics
    ///
    /// If the group is relational.
    pub fn scalar_expr(&self) -> Arc<Expression> {
        match &self.scalar_expr {
            Some(expr) => expr.clone(),
            None => panic!("Group {} is relational", self.group_id),
        }
    }

    /// Statistics if they have been estimated already.
    pub fn cached_stats(&self) -> Option<Arc<Statistics>> {
        self.stats.borrow().clone()
    }

    fn first_relational_expr(&self) -> &GroupExpr {
        match self.exprs.iter().find(|e| e.operator.is_relational()) {
            Some(expr) => expr,
            None => panic!("Group {} has no relational expression", self.group_id),
        }
    }
}

impl Debug for Group {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Group {:?}:", self.group_id)?;

        let mut table = Table::new();
        table.add_row(row!["Group Expression Id", "Operator", "Inputs", "Origin"]);
        for group_expr in &self.exprs {
            table.add_row(row![
                group_expr.id,
                group_expr.operator,
                group_expr.inputs.iter().join(", "),
                group_expr
                    .origin
                    .map(|x| x.as_ref().to_string())
                    .unwrap_or_default()
            ]);
        }
        write!(f, "{}", table)
    }
}

impl GroupExpr {
    pub fn id(&self) -> GroupExprId {
        self.id
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn inputs(&self) -> &[GroupId] {
        &self.inputs
    }

    pub fn origin(&self) -> Option<XformId> {
        self.origin
    }

    pub fn is_applied(&self, xform: XformId) -> bool {
        self.applied_xforms.contains(xform)
    }
}

impl GroupExprId {
    pub fn new(group_id: GroupId, expr_id: usize) -> Self {
        Self { group_id, expr_id }
    }
}

impl Debug for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Debug for GroupExprId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}.{:?}", self.group_id, self.expr_id)
    }
}

impl Display for GroupExprId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}.{:?}", self.group_id, self.expr_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LogicalOperator::{LogicalJoin, LogicalSelect};
    use crate::operator::{scalar, Join, Select};
    use crate::test_utils::{employee_context, employee_table, get_expr};

    #[test]
    fn test_duplicate_expression_not_inserted() {
        let ctx = employee_context();
        let (get, cols) = get_expr(&ctx, employee_table(&ctx));
        let predicate = scalar::column_eq(cols[0].clone(), cols[2].clone());
        let select = Expression::build(LogicalSelect(Select::new()), vec![get.clone(), predicate]);

        let mut memo = Memo::new();
        let root = memo.init(&select);
        let groups = memo.group_count();
        let again = memo.insert_expression(&select, Some(root), None);

        assert_eq!(root, again.group_id);
        assert!(again.new_expr.is_none());
        assert_eq!(groups, memo.group_count());
    }

    #[test]
    fn test_group_properties_match_expression() {
        let ctx = employee_context();
        let (left, left_cols) = get_expr(&ctx, employee_table(&ctx));
        let (right, right_cols) = get_expr(&ctx, employee_table(&ctx));
        let predicate = scalar::column_eq(left_cols[2].clone(), right_cols[0].clone());
        let join = Expression::build(LogicalJoin(Join::inner()), vec![left, right, predicate]);

        let mut memo = Memo::new();
        let root = memo.init(&join);
        assert_eq!(join.derive_relational(), memo[root].relational_props());
        assert_eq!(
            join.derive_stats(&ctx).unwrap().rows(),
            memo.group_stats(root, &ctx).unwrap().rows()
        );
        assert!(memo.extract_first(root).matches(&join));
    }
}
