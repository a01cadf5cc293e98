//! AST visitor pattern for traversing the resolved tree
//!
//! Each visit method has a default implementation that calls the
//! corresponding walk function, so an analysis only overrides the nodes it
//! cares about.
//!
//! # Example
//!
//! ```rust
//! use strata_ast::ast::*;
//!
//! struct CountReferences {
//!     count: usize,
//! }
//!
//! impl Visitor for CountReferences {
//!     fn visit_reference(&mut self, _reference: &Reference) {
//!         self.count += 1;
//!     }
//! }
//! ```

use super::*;

/// AST visitor trait
pub trait Visitor: Sized {
    // Declarations
    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        walk_class_decl(self, decl);
    }

    fn visit_constructor(&mut self, ctor: &ConstructorDecl) {
        walk_constructor(self, ctor);
    }

    fn visit_function(&mut self, func: &Function) {
        walk_function(self, func);
    }

    fn visit_parameter(&mut self, param: &Parameter) {
        walk_parameter(self, param);
    }

    // Statements
    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    fn visit_variable_decl(&mut self, decl: &VariableDecl) {
        walk_variable_decl(self, decl);
    }

    fn visit_block_statement(&mut self, block: &BlockStatement) {
        walk_block_statement(self, block);
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement) {
        walk_for_statement(self, stmt);
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        walk_catch_clause(self, clause);
    }

    // Expressions
    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }

    fn visit_reference(&mut self, _reference: &Reference) {}

    fn visit_this(&mut self, _span: Span) {}

    fn visit_member_expression(&mut self, expr: &MemberExpression) {
        walk_member_expression(self, expr);
    }

    fn visit_super_member(&mut self, _expr: &SuperMemberExpression) {}

    fn visit_arguments(&mut self, args: &Arguments) {
        walk_arguments(self, args);
    }
}

pub fn walk_class_decl<V: Visitor>(visitor: &mut V, decl: &ClassDecl) {
    for member in &decl.members {
        match member {
            ClassMember::Field(field) => {
                if let Some(init) = &field.initializer {
                    visitor.visit_expression(init);
                }
            }
            ClassMember::Method(method) => visitor.visit_function(&method.function),
            ClassMember::Constructor(ctor) => visitor.visit_constructor(ctor),
        }
    }
    if let Some(block) = &decl.static_init {
        visitor.visit_block_statement(block);
    }
}

pub fn walk_constructor<V: Visitor>(visitor: &mut V, ctor: &ConstructorDecl) {
    for init in &ctor.initializers {
        visitor.visit_expression(&init.value);
    }
    if let Some(super_call) = &ctor.super_call {
        visitor.visit_arguments(&super_call.arguments);
    }
    visitor.visit_function(&ctor.function);
}

pub fn walk_function<V: Visitor>(visitor: &mut V, func: &Function) {
    for param in &func.params {
        visitor.visit_parameter(param);
    }
    walk_function_body(visitor, &func.body);
}

/// Walk a function body without treating a block body as a nested block.
pub fn walk_function_body<V: Visitor>(visitor: &mut V, body: &FunctionBody) {
    match body {
        FunctionBody::Block(block) => {
            for stmt in &block.statements {
                visitor.visit_statement(stmt);
            }
        }
        FunctionBody::Expression(expr) => visitor.visit_expression(expr),
    }
}

pub fn walk_parameter<V: Visitor>(visitor: &mut V, param: &Parameter) {
    if let Some(default) = &param.default {
        visitor.visit_expression(default);
    }
}

pub fn walk_statement<V: Visitor>(visitor: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Expression(s) => visitor.visit_expression(&s.expression),
        Statement::VariableDecl(decl) => visitor.visit_variable_decl(decl),
        Statement::FunctionDecl(func) => visitor.visit_function(func),
        Statement::Return(s) => {
            if let Some(value) = &s.value {
                visitor.visit_expression(value);
            }
        }
        Statement::If(s) => {
            visitor.visit_expression(&s.condition);
            visitor.visit_statement(&s.then_branch);
            if let Some(else_branch) = &s.else_branch {
                visitor.visit_statement(else_branch);
            }
        }
        Statement::While(s) => {
            visitor.visit_expression(&s.condition);
            visitor.visit_statement(&s.body);
        }
        Statement::For(s) => visitor.visit_for_statement(s),
        Statement::Block(block) => visitor.visit_block_statement(block),
        Statement::Try(s) => {
            visitor.visit_block_statement(&s.body);
            if let Some(clause) = &s.catch {
                visitor.visit_catch_clause(clause);
            }
            if let Some(finally) = &s.finally {
                visitor.visit_block_statement(finally);
            }
        }
        Statement::Throw(s) => visitor.visit_expression(&s.value),
        Statement::Break(_) | Statement::Continue(_) => {}
        Statement::Labeled(s) => visitor.visit_statement(&s.body),
    }
}

pub fn walk_variable_decl<V: Visitor>(visitor: &mut V, decl: &VariableDecl) {
    if let Some(init) = &decl.initializer {
        visitor.visit_expression(init);
    }
}

pub fn walk_block_statement<V: Visitor>(visitor: &mut V, block: &BlockStatement) {
    for stmt in &block.statements {
        visitor.visit_statement(stmt);
    }
}

pub fn walk_for_statement<V: Visitor>(visitor: &mut V, stmt: &ForStatement) {
    if let Some(init) = &stmt.init {
        visitor.visit_statement(init);
    }
    if let Some(condition) = &stmt.condition {
        visitor.visit_expression(condition);
    }
    if let Some(update) = &stmt.update {
        visitor.visit_expression(update);
    }
    visitor.visit_statement(&stmt.body);
}

/// Walk a catch clause; the body's statements belong to the clause scope.
pub fn walk_catch_clause<V: Visitor>(visitor: &mut V, clause: &CatchClause) {
    for stmt in &clause.body.statements {
        visitor.visit_statement(stmt);
    }
}

pub fn walk_expression<V: Visitor>(visitor: &mut V, expr: &Expression) {
    match expr {
        Expression::Literal(_) => {}
        Expression::Identifier(reference) => visitor.visit_reference(reference),
        Expression::This(span) => visitor.visit_this(*span),
        Expression::Assignment(e) => {
            visitor.visit_expression(&e.target);
            visitor.visit_expression(&e.value);
        }
        Expression::Binary(e) => {
            visitor.visit_expression(&e.left);
            visitor.visit_expression(&e.right);
        }
        Expression::Unary(e) => visitor.visit_expression(&e.operand),
        Expression::Conditional(e) => {
            visitor.visit_expression(&e.condition);
            visitor.visit_expression(&e.consequent);
            visitor.visit_expression(&e.alternate);
        }
        Expression::Call(e) => {
            visitor.visit_expression(&e.callee);
            visitor.visit_arguments(&e.arguments);
        }
        Expression::Member(e) => visitor.visit_member_expression(e),
        Expression::SuperMember(e) => visitor.visit_super_member(e),
        Expression::Index(e) => {
            visitor.visit_expression(&e.object);
            visitor.visit_expression(&e.index);
        }
        Expression::New(e) => visitor.visit_arguments(&e.arguments),
        Expression::List(e) => {
            for element in &e.elements {
                visitor.visit_expression(element);
            }
        }
        Expression::Function(func) => visitor.visit_function(func),
    }
}

pub fn walk_member_expression<V: Visitor>(visitor: &mut V, expr: &MemberExpression) {
    visitor.visit_expression(&expr.object);
}

pub fn walk_arguments<V: Visitor>(visitor: &mut V, args: &Arguments) {
    for arg in &args.positional {
        visitor.visit_expression(arg);
    }
    for named in &args.named {
        visitor.visit_expression(&named.value);
    }
}
