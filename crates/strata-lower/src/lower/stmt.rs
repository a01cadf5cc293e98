//! Statement flattening

use super::function::FunctionLowerer;
use crate::error::LowerResult;
use crate::flat::*;
use strata_ast::ast::*;

impl<'p, 'a> FunctionLowerer<'p, 'a> {
    pub(super) fn lower_stmt(&mut self, stmt: &Statement, out: &mut Vec<FlatStmt>) -> LowerResult<()> {
        match stmt {
            Statement::Expression(stmt) => {
                let expr = self.lower_expr(&stmt.expression)?;
                out.push(FlatStmt::Expr(expr));
            }
            Statement::VariableDecl(decl) => self.lower_variable_decl(decl, out)?,
            Statement::FunctionDecl(func) => self.lower_local_function(func, out)?,
            Statement::Return(stmt) => {
                let value = match &stmt.value {
                    Some(value) => Some(self.lower_expr(value)?),
                    None => None,
                };
                out.push(FlatStmt::Return(value));
            }
            Statement::If(stmt) => {
                let condition = self.lower_expr(&stmt.condition)?;
                let then_branch = self.lower_branch(&stmt.then_branch)?;
                let else_branch = match &stmt.else_branch {
                    Some(branch) => self.lower_branch(branch)?,
                    None => Vec::new(),
                };
                out.push(FlatStmt::If {
                    condition,
                    then_branch,
                    else_branch,
                });
            }
            Statement::While(stmt) => {
                let condition = self.lower_expr(&stmt.condition)?;
                let body = self.lower_branch(&stmt.body)?;
                out.push(FlatStmt::While { condition, body });
            }
            Statement::For(stmt) => self.lower_for(stmt, out)?,
            Statement::Block(block) => {
                let body = self.lower_block(block)?;
                out.push(FlatStmt::Block(body));
            }
            Statement::Try(stmt) => self.lower_try(stmt, out)?,
            Statement::Throw(stmt) => {
                let value = self.lower_expr(&stmt.value)?;
                out.push(FlatStmt::Throw(value));
            }
            Statement::Break(jump) => {
                let label = self.jump_label(jump)?;
                out.push(FlatStmt::Break(label));
            }
            Statement::Continue(jump) => {
                let label = self.jump_label(jump)?;
                out.push(FlatStmt::Continue(label));
            }
            Statement::Labeled(stmt) => {
                let label = self.push_label(stmt.label.name);
                let body = self.lower_branch(&stmt.body);
                self.pop_label(stmt.label.name);
                out.push(FlatStmt::Labeled { label, body: body? });
            }
        }
        Ok(())
    }

    fn lower_variable_decl(&mut self, decl: &VariableDecl, out: &mut Vec<FlatStmt>) -> LowerResult<()> {
        let value = match &decl.initializer {
            Some(init) => Some(self.lower_expr(init)?),
            None => None,
        };
        if self.body.analysis.tree.is_captured(decl.local) {
            let place = self.local_place(decl.local)?;
            let value = value.unwrap_or(FlatExpr::Literal(FlatLiteral::Null));
            out.push(FlatStmt::Expr(FlatExpr::assign(place, value)));
        } else {
            let name = self.declare_local(decl.local, decl.name.name);
            out.push(FlatStmt::Let { name, value });
        }
        Ok(())
    }

    /// A named local function: hoisted, then bound to its name.
    fn lower_local_function(&mut self, func: &Function, out: &mut Vec<FlatStmt>) -> LowerResult<()> {
        let Some(binding) = func.binding else {
            let value = self.lower_closure(func)?;
            out.push(FlatStmt::Expr(value));
            return Ok(());
        };
        if self.body.analysis.tree.is_captured(binding) {
            let value = self.lower_closure(func)?;
            let place = self.local_place(binding)?;
            out.push(FlatStmt::Expr(FlatExpr::assign(place, value)));
        } else {
            let name = match func.name {
                Some(name) => self.declare_local(binding, name.name),
                None => {
                    let name = self.frame.namer.claim("fn");
                    self.frame.locals.insert(binding, name.clone());
                    name
                }
            };
            let value = self.lower_closure(func)?;
            out.push(FlatStmt::Let {
                name,
                value: Some(value),
            });
        }
        Ok(())
    }

    /// A nested statement as a statement list; blocks are not wrapped again.
    fn lower_branch(&mut self, stmt: &Statement) -> LowerResult<Vec<FlatStmt>> {
        match stmt {
            Statement::Block(block) => self.lower_block(block),
            other => {
                let mut out = Vec::new();
                self.lower_stmt(other, &mut out)?;
                Ok(out)
            }
        }
    }

    fn lower_block(&mut self, block: &BlockStatement) -> LowerResult<Vec<FlatStmt>> {
        let scope = self.scope_of(block.id)?;
        self.lower_scoped(scope, &[], &block.statements, true)
    }

    /// The header scope's alias, if any, is created around the loop and
    /// copied before each update.
    fn lower_for(&mut self, stmt: &ForStatement, out: &mut Vec<FlatStmt>) -> LowerResult<()> {
        let scope = self.scope_of(stmt.id)?;
        let mut outer = Vec::new();
        let alias = self.enter_scope(scope, &[], &mut outer)?;

        let mut init = Vec::new();
        if let Some(stmt) = &stmt.init {
            self.lower_stmt(stmt, &mut init)?;
        }
        let condition = match &stmt.condition {
            Some(condition) => Some(self.lower_expr(condition)?),
            None => None,
        };
        let update = match &stmt.update {
            Some(update) => Some(self.lower_expr(update)?),
            None => None,
        };
        let body = self.lower_branch(&stmt.body)?;
        let lowered = FlatStmt::For {
            init,
            condition,
            renew: alias.clone(),
            update,
            body,
        };

        if alias.is_some() {
            outer.push(lowered);
            self.exit_scope(alias, &mut outer);
            out.push(FlatStmt::Block(outer));
        } else {
            out.push(lowered);
        }
        Ok(())
    }

    fn lower_try(&mut self, stmt: &TryStatement, out: &mut Vec<FlatStmt>) -> LowerResult<()> {
        let body = self.lower_block(&stmt.body)?;
        let catch = match &stmt.catch {
            Some(clause) => Some(self.lower_catch(clause)?),
            None => None,
        };
        let finally = match &stmt.finally {
            Some(block) => Some(self.lower_block(block)?),
            None => None,
        };
        out.push(FlatStmt::Try {
            body,
            catch,
            finally,
        });
        Ok(())
    }

    /// The clause and its body share one scope.
    fn lower_catch(&mut self, clause: &CatchClause) -> LowerResult<FlatCatch> {
        let scope = self.scope_of(clause.id)?;
        let mut initial = Vec::new();
        let param = match &clause.param {
            Some(param) if self.body.analysis.tree.is_captured(param.local) => {
                let name = self.claim_source(param.name.name);
                initial.push((param.local, FlatExpr::Local(name.clone())));
                Some(name)
            }
            Some(param) => Some(self.declare_local(param.local, param.name.name)),
            None => None,
        };
        let body = self.lower_scoped(scope, &initial, &clause.body.statements, true)?;
        Ok(FlatCatch { param, body })
    }

    fn jump_label(&self, jump: &JumpStatement) -> LowerResult<Option<String>> {
        jump.label
            .map(|label| self.resolve_label(label.name))
            .transpose()
    }
}
