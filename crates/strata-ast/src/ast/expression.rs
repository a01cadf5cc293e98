//! Expression AST nodes
//!
//! Every identifier reference carries the binding the resolver chose for it;
//! member accesses carry their resolved member (or `None` when dispatch is
//! dynamic).

use super::*;

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal: 42, 1.5, "text", true, null
    Literal(LiteralExpression),

    /// Resolved identifier reference
    Identifier(Reference),

    /// `this`
    This(Span),

    /// Assignment: x = 42, y += 1
    Assignment(AssignmentExpression),

    /// Binary expression: x + y, a && b
    Binary(BinaryExpression),

    /// Unary expression: !x, -y
    Unary(UnaryExpression),

    /// Ternary: x ? y : z
    Conditional(ConditionalExpression),

    /// Call with positional and named arguments
    Call(CallExpression),

    /// Member access: obj.prop
    Member(MemberExpression),

    /// `super.prop`
    SuperMember(SuperMemberExpression),

    /// Index access: list[0]
    Index(IndexExpression),

    /// `new Point(1, 2)` / `new Point.origin()`
    New(NewExpression),

    /// List literal: [1, 2, 3]
    List(ListExpression),

    /// Function literal: (x) => x + 1
    Function(Function),
}

impl Expression {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(e) => e.span,
            Expression::Identifier(e) => e.name.span,
            Expression::This(span) => *span,
            Expression::Assignment(e) => e.span,
            Expression::Binary(e) => e.span,
            Expression::Unary(e) => e.span,
            Expression::Conditional(e) => e.span,
            Expression::Call(e) => e.span,
            Expression::Member(e) => e.span,
            Expression::SuperMember(e) => e.span,
            Expression::Index(e) => e.span,
            Expression::New(e) => e.span,
            Expression::List(e) => e.span,
            Expression::Function(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpression {
    pub value: Literal,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(Symbol),
    Bool(bool),
    Null,
}

/// Identifier reference with its resolved binding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reference {
    pub name: Identifier,
    pub binding: Binding,
}

/// What an identifier resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding {
    /// Parameter, variable, catch variable or local function
    Local(LocalId),
    /// Top-level function
    Function(FunctionId),
    /// Class used as a value
    Class(ClassId),
    /// Member of the enclosing class, reached through the implicit receiver
    /// (or statically, for static members)
    Member(MemberBinding),
}

/// Resolved class member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberBinding {
    /// Class declaring the member
    pub class: ClassId,
    pub name: Symbol,
    pub kind: MemberKind,
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Getter,
    Setter,
    Method,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub target: Box<Expression>,
    /// `Some(op)` for compound assignment (`+=`)
    pub operator: Option<BinaryOperator>,
    pub value: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub condition: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Arguments,
    pub span: Span,
}

/// Call-site arguments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arguments {
    pub positional: Vec<Expression>,
    pub named: Vec<NamedArgument>,
}

impl Arguments {
    pub fn positional(positional: Vec<Expression>) -> Self {
        Self {
            positional,
            named: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    pub name: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: Identifier,
    /// Statically resolved member, `None` for dynamic access
    pub target: Option<MemberBinding>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperMemberExpression {
    pub property: Identifier,
    pub target: MemberBinding,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub class: ClassId,
    /// Named constructor (`new Point.origin()`), `None` for the unnamed one
    pub constructor: Option<Identifier>,
    pub arguments: Arguments,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListExpression {
    pub elements: Vec<Expression>,
    pub span: Span,
}
