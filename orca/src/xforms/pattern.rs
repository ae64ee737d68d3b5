use crate::operator::{Operator, PatternOperator};

pub type OperatorMatcher = fn(&Operator) -> bool;

/// What one node of a pattern matches.
#[derive(Clone, Copy)]
pub enum PatternNode {
    /// A group expression whose operator satisfies the matcher.
    Operator(OperatorMatcher),
    /// Any group, see [`PatternOperator`].
    Placeholder(PatternOperator),
}

/// A pattern defines how to match a sub tree of a memo.
///
/// If we want to match `Join(Select, any, predicate)` the pattern tree is defined like:
/// ```
/// use orca::operator::LogicalOperator::{LogicalJoin, LogicalSelect};
/// use orca::operator::Operator::Logical;
/// use orca::xforms::{pattern, PatternBuilder};
///
/// pattern(|op| matches!(op, Logical(LogicalJoin(_))))
///   .pattern(|op| matches!(op, Logical(LogicalSelect(_))))
///     .leaf()
///     .tree()
///   .finish()
///   .leaf()
///   .tree()
/// .finish();
/// ```
///
/// Children must line up with the inputs of a group expression one by one, except a trailing
/// multi leaf which absorbs any number of inputs.
#[derive(Clone)]
pub struct Pattern {
    node: PatternNode,
    children: Vec<Pattern>,
}

impl Pattern {
    pub fn new<I: IntoIterator<Item = Pattern>>(node: PatternNode, children: I) -> Pattern {
        Pattern {
            node,
            children: children.into_iter().collect(),
        }
    }

    pub fn placeholder(op: PatternOperator) -> Pattern {
        Pattern::new(PatternNode::Placeholder(op), vec![])
    }

    pub fn node(&self) -> &PatternNode {
        &self.node
    }

    pub fn children(&self) -> &[Pattern] {
        &self.children
    }

    pub fn is_placeholder(&self, op: PatternOperator) -> bool {
        matches!(self.node, PatternNode::Placeholder(p) if p == op)
    }

    pub fn matches_without_children(&self, operator: &Operator) -> bool {
        match self.node {
            PatternNode::Operator(matcher) => matcher(operator),
            PatternNode::Placeholder(_) => true,
        }
    }
}

pub fn pattern(matcher: OperatorMatcher) -> RootPatternBuilder {
    RootPatternBuilder {
        matcher,
        inputs: vec![],
    }
}

pub trait PatternBuilder: Sized {
    type Child;
    type Output;
    fn pattern(self, matcher: OperatorMatcher) -> Self::Child;
    fn add_input(self, pattern: Pattern) -> Self;
    fn finish(self) -> Self::Output;

    /// Binds a relational input as a group leaf.
    fn leaf(self) -> Self {
        self.add_input(Pattern::placeholder(PatternOperator::PatternLeaf))
    }

    /// Binds an input with its whole sub tree.
    fn tree(self) -> Self {
        self.add_input(Pattern::placeholder(PatternOperator::PatternTree))
    }

    /// Binds all remaining inputs as leaves.
    fn multi_leaf(self) -> Self {
        self.add_input(Pattern::placeholder(PatternOperator::PatternMultiLeaf))
    }
}

pub struct RootPatternBuilder {
    matcher: OperatorMatcher,
    inputs: Vec<Pattern>,
}

pub struct NonRootPatternBuilder<P> {
    parent_builder: P,
    matcher: OperatorMatcher,
    inputs: Vec<Pattern>,
}

impl<P: PatternBuilder> PatternBuilder for NonRootPatternBuilder<P> {
    type Child = NonRootPatternBuilder<Self>;
    type Output = P;

    fn pattern(self, matcher: OperatorMatcher) -> NonRootPatternBuilder<Self> {
        NonRootPatternBuilder {
            parent_builder: self,
            matcher,
            inputs: vec![],
        }
    }

    fn add_input(mut self, pattern: Pattern) -> Self {
        self.inputs.push(pattern);
        self
    }

    fn finish(self) -> Self::Output {
        let pattern = Pattern::new(PatternNode::Operator(self.matcher), self.inputs);
        self.parent_builder.add_input(pattern)
    }
}

impl PatternBuilder for RootPatternBuilder {
    type Child = NonRootPatternBuilder<Self>;
    type Output = Pattern;

    fn pattern(self, matcher: OperatorMatcher) -> Self::Child {
        NonRootPatternBuilder {
            parent_builder: self,
            matcher,
            inputs: vec![],
        }
    }

    fn add_input(mut self, pattern: Pattern) -> Self {
        self.inputs.push(pattern);
        self
    }

    fn finish(self) -> Self::Output {
        Pattern::new(PatternNode::Operator(self.matcher), self.inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::LogicalOperator::{LogicalJoin, LogicalSelect};
    use crate::operator::Operator::Logical;

    #[test]
    fn test_nested_pattern() {
        let pattern = pattern(|op| matches!(op, Logical(LogicalJoin(_))))
            .pattern(|op| matches!(op, Logical(LogicalSelect(_))))
            .leaf()
            .tree()
            .finish()
            .leaf()
            .tree()
            .finish();

        assert_eq!(3, pattern.children().len());
        assert_eq!(2, pattern.children()[0].children().len());
        assert!(pattern.children()[1].is_placeholder(PatternOperator::PatternLeaf));
        assert!(pattern.children()[2].is_placeholder(PatternOperator::PatternTree));
    }
}
