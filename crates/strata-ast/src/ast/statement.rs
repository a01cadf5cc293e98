//! Statement AST nodes

use super::*;

/// Statement (performs an action)
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Expression statement: `foo();`
    Expression(ExpressionStatement),

    /// Local variable: `var x = 1;`
    VariableDecl(VariableDecl),

    /// Local named function: `function inner() { ... }`
    FunctionDecl(Function),

    /// `return value;`
    Return(ReturnStatement),

    /// `if (cond) a else b`
    If(IfStatement),

    /// `while (cond) body`
    While(WhileStatement),

    /// `for (init; cond; update) body`
    For(ForStatement),

    /// `{ ... }`
    Block(BlockStatement),

    /// `try { } catch (e) { } finally { }`
    Try(TryStatement),

    /// `throw value;`
    Throw(ThrowStatement),

    /// `break;` / `break label;`
    Break(JumpStatement),

    /// `continue;` / `continue label;`
    Continue(JumpStatement),

    /// `label: statement`
    Labeled(LabeledStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub name: Identifier,
    pub local: LocalId,
    pub initializer: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
    pub span: Span,
}

/// `for` statement; the header (`init`) has its own scope
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub id: NodeId,
    pub init: Option<Box<Statement>>,
    pub condition: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub id: NodeId,
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub body: BlockStatement,
    pub catch: Option<CatchClause>,
    pub finally: Option<BlockStatement>,
    pub span: Span,
}

/// `catch (e) { ... }`; the clause owns the scope holding `e`
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub id: NodeId,
    pub param: Option<CatchParam>,
    pub body: BlockStatement,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchParam {
    pub name: Identifier,
    pub local: LocalId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JumpStatement {
    pub label: Option<Identifier>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStatement {
    pub label: Identifier,
    pub body: Box<Statement>,
    pub span: Span,
}
