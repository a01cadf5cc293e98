//! Construction helpers for resolved trees
//!
//! The resolver (and the test suites) build trees through `AstBuilder`, which
//! hands out fresh `NodeId`/`LocalId`/`ClassId`/`FunctionId` values and
//! interns names. All methods take `&self` so calls nest freely:
//!
//! ```rust
//! use strata_ast::AstBuilder;
//!
//! let b = AstBuilder::new();
//! let (x_param, x) = b.param("x");
//! let body = vec![b.return_stmt(Some(b.local_ref("x", x)))];
//! let func = b.function(vec![x_param], body);
//! assert_eq!(func.params.len(), 1);
//! ```

use crate::ast::*;
use crate::interner::{Interner, Symbol};
use crate::span::Span;
use std::cell::{Cell, RefCell};

/// Allocates identities and builds AST nodes
#[derive(Debug, Default)]
pub struct AstBuilder {
    interner: RefCell<Interner>,
    next_node: Cell<u32>,
    next_local: Cell<u32>,
    next_class: Cell<u32>,
    next_function: Cell<u32>,
}

fn bump(counter: &Cell<u32>) -> u32 {
    let id = counter.get();
    counter.set(id + 1);
    id
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue building on top of an existing interner.
    pub fn with_interner(interner: Interner) -> Self {
        Self {
            interner: RefCell::new(interner),
            ..Self::default()
        }
    }

    /// Consume the builder, returning the interner for the built tree.
    pub fn finish(self) -> Interner {
        self.interner.into_inner()
    }

    pub fn sym(&self, text: &str) -> Symbol {
        self.interner.borrow_mut().intern(text)
    }

    pub fn ident(&self, text: &str) -> Identifier {
        Identifier::new(self.sym(text), Span::default())
    }

    pub fn node_id(&self) -> NodeId {
        NodeId(bump(&self.next_node))
    }

    pub fn local_id(&self) -> LocalId {
        LocalId(bump(&self.next_local))
    }

    pub fn class_id(&self) -> ClassId {
        ClassId(bump(&self.next_class))
    }

    pub fn function_id(&self) -> FunctionId {
        FunctionId(bump(&self.next_function))
    }

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    fn make_param(
        &self,
        name: &str,
        kind: ParameterKind,
        default: Option<Expression>,
    ) -> (Parameter, LocalId) {
        let local = self.local_id();
        let param = Parameter {
            name: self.ident(name),
            local,
            kind,
            default,
            span: Span::default(),
        };
        (param, local)
    }

    /// Required positional parameter
    pub fn param(&self, name: &str) -> (Parameter, LocalId) {
        self.make_param(name, ParameterKind::Required, None)
    }

    /// Optional positional parameter: `[name = default]`
    pub fn optional_param(&self, name: &str, default: Option<Expression>) -> (Parameter, LocalId) {
        self.make_param(name, ParameterKind::Optional, default)
    }

    /// Named parameter: `{name = default}`
    pub fn named_param(&self, name: &str, default: Option<Expression>) -> (Parameter, LocalId) {
        self.make_param(name, ParameterKind::Named, default)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn literal(&self, value: Literal) -> Expression {
        Expression::Literal(LiteralExpression {
            value,
            span: Span::default(),
        })
    }

    pub fn int(&self, value: i64) -> Expression {
        self.literal(Literal::Int(value))
    }

    pub fn float(&self, value: f64) -> Expression {
        self.literal(Literal::Float(value))
    }

    pub fn string(&self, value: &str) -> Expression {
        self.literal(Literal::String(self.sym(value)))
    }

    pub fn bool(&self, value: bool) -> Expression {
        self.literal(Literal::Bool(value))
    }

    pub fn null(&self) -> Expression {
        self.literal(Literal::Null)
    }

    pub fn reference(&self, name: &str, binding: Binding) -> Expression {
        Expression::Identifier(Reference {
            name: self.ident(name),
            binding,
        })
    }

    pub fn local_ref(&self, name: &str, local: LocalId) -> Expression {
        self.reference(name, Binding::Local(local))
    }

    pub fn function_ref(&self, name: &str, id: FunctionId) -> Expression {
        self.reference(name, Binding::Function(id))
    }

    pub fn class_ref(&self, name: &str, id: ClassId) -> Expression {
        self.reference(name, Binding::Class(id))
    }

    /// Member of the enclosing class reached without an explicit receiver
    pub fn member_ref(&self, target: MemberBinding) -> Expression {
        Expression::Identifier(Reference {
            name: Identifier::new(target.name, Span::default()),
            binding: Binding::Member(target),
        })
    }

    pub fn member_binding(
        &self,
        class: ClassId,
        name: &str,
        kind: MemberKind,
        is_static: bool,
    ) -> MemberBinding {
        MemberBinding {
            class,
            name: self.sym(name),
            kind,
            is_static,
        }
    }

    pub fn this(&self) -> Expression {
        Expression::This(Span::default())
    }

    pub fn member(
        &self,
        object: Expression,
        property: &str,
        target: Option<MemberBinding>,
    ) -> Expression {
        Expression::Member(MemberExpression {
            object: Box::new(object),
            property: self.ident(property),
            target,
            span: Span::default(),
        })
    }

    pub fn super_member(&self, target: MemberBinding) -> Expression {
        Expression::SuperMember(SuperMemberExpression {
            property: Identifier::new(target.name, Span::default()),
            target,
            span: Span::default(),
        })
    }

    pub fn call(&self, callee: Expression, positional: Vec<Expression>) -> Expression {
        self.call_with(callee, Arguments::positional(positional))
    }

    pub fn call_with(&self, callee: Expression, arguments: Arguments) -> Expression {
        Expression::Call(CallExpression {
            callee: Box::new(callee),
            arguments,
            span: Span::default(),
        })
    }

    pub fn args(&self, positional: Vec<Expression>, named: Vec<(&str, Expression)>) -> Arguments {
        Arguments {
            positional,
            named: named
                .into_iter()
                .map(|(name, value)| NamedArgument {
                    name: self.ident(name),
                    value,
                })
                .collect(),
        }
    }

    pub fn binary(&self, operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: Span::default(),
        })
    }

    pub fn unary(&self, operator: UnaryOperator, operand: Expression) -> Expression {
        Expression::Unary(UnaryExpression {
            operator,
            operand: Box::new(operand),
            span: Span::default(),
        })
    }

    pub fn assign(&self, target: Expression, value: Expression) -> Expression {
        Expression::Assignment(AssignmentExpression {
            target: Box::new(target),
            operator: None,
            value: Box::new(value),
            span: Span::default(),
        })
    }

    pub fn compound_assign(
        &self,
        operator: BinaryOperator,
        target: Expression,
        value: Expression,
    ) -> Expression {
        Expression::Assignment(AssignmentExpression {
            target: Box::new(target),
            operator: Some(operator),
            value: Box::new(value),
            span: Span::default(),
        })
    }

    pub fn conditional(
        &self,
        condition: Expression,
        consequent: Expression,
        alternate: Expression,
    ) -> Expression {
        Expression::Conditional(ConditionalExpression {
            condition: Box::new(condition),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: Span::default(),
        })
    }

    pub fn index(&self, object: Expression, index: Expression) -> Expression {
        Expression::Index(IndexExpression {
            object: Box::new(object),
            index: Box::new(index),
            span: Span::default(),
        })
    }

    pub fn new_object(
        &self,
        class: ClassId,
        constructor: Option<&str>,
        arguments: Arguments,
    ) -> Expression {
        Expression::New(NewExpression {
            class,
            constructor: constructor.map(|name| self.ident(name)),
            arguments,
            span: Span::default(),
        })
    }

    pub fn list(&self, elements: Vec<Expression>) -> Expression {
        Expression::List(ListExpression {
            elements,
            span: Span::default(),
        })
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    /// Anonymous function with a block body
    pub fn function(&self, params: Vec<Parameter>, body: Vec<Statement>) -> Function {
        Function {
            id: self.node_id(),
            name: None,
            binding: None,
            params,
            body: FunctionBody::Block(self.block_stmt(body)),
            span: Span::default(),
        }
    }

    /// Anonymous function with an expression body: `(params) => expr`
    pub fn arrow(&self, params: Vec<Parameter>, body: Expression) -> Function {
        Function {
            id: self.node_id(),
            name: None,
            binding: None,
            params,
            body: FunctionBody::Expression(Box::new(body)),
            span: Span::default(),
        }
    }

    /// Named local function; returns the function and its name binding.
    ///
    /// The binding must be allocated before the body is built when the body
    /// refers to the function itself, so it is passed in.
    pub fn named_function(
        &self,
        name: &str,
        binding: LocalId,
        params: Vec<Parameter>,
        body: Vec<Statement>,
    ) -> Function {
        Function {
            name: Some(self.ident(name)),
            binding: Some(binding),
            ..self.function(params, body)
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub fn expr_stmt(&self, expression: Expression) -> Statement {
        Statement::Expression(ExpressionStatement {
            expression,
            span: Span::default(),
        })
    }

    /// `var name = init;` returning the new binding
    pub fn var_decl(&self, name: &str, initializer: Option<Expression>) -> (Statement, LocalId) {
        let local = self.local_id();
        (self.var_decl_for(name, local, initializer), local)
    }

    /// `var name = init;` for a pre-allocated binding
    pub fn var_decl_for(
        &self,
        name: &str,
        local: LocalId,
        initializer: Option<Expression>,
    ) -> Statement {
        Statement::VariableDecl(VariableDecl {
            name: self.ident(name),
            local,
            initializer,
            span: Span::default(),
        })
    }

    pub fn return_stmt(&self, value: Option<Expression>) -> Statement {
        Statement::Return(ReturnStatement {
            value,
            span: Span::default(),
        })
    }

    pub fn if_stmt(
        &self,
        condition: Expression,
        then_branch: Statement,
        else_branch: Option<Statement>,
    ) -> Statement {
        Statement::If(IfStatement {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
            span: Span::default(),
        })
    }

    pub fn while_stmt(&self, condition: Expression, body: Statement) -> Statement {
        Statement::While(WhileStatement {
            condition,
            body: Box::new(body),
            span: Span::default(),
        })
    }

    pub fn for_stmt(
        &self,
        init: Option<Statement>,
        condition: Option<Expression>,
        update: Option<Expression>,
        body: Statement,
    ) -> Statement {
        Statement::For(ForStatement {
            id: self.node_id(),
            init: init.map(Box::new),
            condition,
            update,
            body: Box::new(body),
            span: Span::default(),
        })
    }

    pub fn block_stmt(&self, statements: Vec<Statement>) -> BlockStatement {
        BlockStatement {
            id: self.node_id(),
            statements,
            span: Span::default(),
        }
    }

    pub fn block(&self, statements: Vec<Statement>) -> Statement {
        Statement::Block(self.block_stmt(statements))
    }

    /// `try { body } catch (name) { handler } finally { .. }`
    pub fn try_stmt(
        &self,
        body: Vec<Statement>,
        catch: Option<(Option<CatchParam>, Vec<Statement>)>,
        finally: Option<Vec<Statement>>,
    ) -> Statement {
        Statement::Try(TryStatement {
            body: self.block_stmt(body),
            catch: catch.map(|(param, handler)| CatchClause {
                id: self.node_id(),
                param,
                body: self.block_stmt(handler),
                span: Span::default(),
            }),
            finally: finally.map(|stmts| self.block_stmt(stmts)),
            span: Span::default(),
        })
    }

    pub fn catch_param(&self, name: &str) -> (CatchParam, LocalId) {
        let local = self.local_id();
        (
            CatchParam {
                name: self.ident(name),
                local,
            },
            local,
        )
    }

    pub fn throw_stmt(&self, value: Expression) -> Statement {
        Statement::Throw(ThrowStatement {
            value,
            span: Span::default(),
        })
    }

    pub fn break_stmt(&self, label: Option<&str>) -> Statement {
        Statement::Break(JumpStatement {
            label: label.map(|l| self.ident(l)),
            span: Span::default(),
        })
    }

    pub fn continue_stmt(&self, label: Option<&str>) -> Statement {
        Statement::Continue(JumpStatement {
            label: label.map(|l| self.ident(l)),
            span: Span::default(),
        })
    }

    pub fn labeled(&self, label: &str, body: Statement) -> Statement {
        Statement::Labeled(LabeledStatement {
            label: self.ident(label),
            body: Box::new(body),
            span: Span::default(),
        })
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    pub fn function_decl(&self, id: FunctionId, name: &str, function: Function) -> Item {
        Item::Function(FunctionDecl {
            id,
            name: self.ident(name),
            function,
        })
    }

    pub fn class_decl(
        &self,
        id: ClassId,
        name: &str,
        superclass: Option<ClassId>,
        members: Vec<ClassMember>,
        static_init: Option<Vec<Statement>>,
    ) -> ClassDecl {
        ClassDecl {
            id,
            name: self.ident(name),
            superclass,
            members,
            static_init: static_init.map(|stmts| self.block_stmt(stmts)),
            span: Span::default(),
        }
    }

    pub fn field(&self, name: &str, is_static: bool, initializer: Option<Expression>) -> ClassMember {
        ClassMember::Field(FieldDecl {
            name: self.ident(name),
            is_static,
            initializer,
            span: Span::default(),
        })
    }

    pub fn method(
        &self,
        name: &str,
        kind: MethodKind,
        is_static: bool,
        function: Function,
    ) -> ClassMember {
        ClassMember::Method(MethodDecl {
            name: self.ident(name),
            kind,
            is_static,
            function,
        })
    }

    pub fn constructor(
        &self,
        name: Option<&str>,
        function: Function,
        initializers: Vec<(&str, Expression)>,
        super_call: Option<(Option<&str>, Arguments)>,
    ) -> ClassMember {
        ClassMember::Constructor(ConstructorDecl {
            name: name.map(|n| self.ident(n)),
            kind: ConstructorKind::Generative,
            function,
            initializers: initializers
                .into_iter()
                .map(|(field, value)| FieldInitializer {
                    field: self.ident(field),
                    value,
                })
                .collect(),
            super_call: super_call.map(|(ctor, arguments)| SuperCall {
                constructor: ctor.map(|c| self.ident(c)),
                arguments,
                span: Span::default(),
            }),
        })
    }

    pub fn factory(&self, name: Option<&str>, function: Function) -> ClassMember {
        ClassMember::Constructor(ConstructorDecl {
            name: name.map(|n| self.ident(n)),
            kind: ConstructorKind::Factory,
            function,
            initializers: Vec::new(),
            super_call: None,
        })
    }
}
