//! Uniform calling convention adapters
//!
//! A trampoline takes the alias objects of its target (passed through),
//! the number of positional arguments supplied, the bag of named arguments,
//! the number of named arguments, and then the positional parameters. It
//! fills every optional and named parameter, checks the argument counts and
//! forwards to the target.

use super::function::{Frame, FunctionLowerer};
use super::CallTarget;
use crate::error::{LowerError, LowerResult};
use crate::flat::*;
use crate::mangle::escape;
use crate::scope::DeclarationBody;
use strata_ast::ast::*;
use tracing::debug;

impl<'p, 'a> FunctionLowerer<'p, 'a> {
    /// Trampoline of the declaration being lowered, if it takes optional or named parameters.
    pub fn root_trampoline(
        &mut self,
        target: &CallTarget,
        func: &Function,
        receiver: bool,
    ) -> LowerResult<Option<FlatFunction>> {
        if !target.is_uniform() {
            return Ok(None);
        }
        self.build_trampoline(target, func, receiver, &[]).map(Some)
    }

    pub(super) fn build_trampoline(
        &mut self,
        target: &CallTarget,
        func: &Function,
        receiver: bool,
        aliases: &[String],
    ) -> LowerResult<FlatFunction> {
        let name = target
            .trampoline
            .clone()
            .ok_or_else(|| LowerError::internal(format!("{} has no trampoline name", target.name)))?;
        debug!(trampoline = %name, target = %target.name, "generating trampoline");

        let frame = Frame::root(name.clone(), receiver, &self.program.options.reserved);
        let saved = std::mem::replace(&mut self.frame, frame);
        let result = self.trampoline_function(&name, target, func, aliases);
        self.frame = saved;
        result
    }

    fn trampoline_function(
        &mut self,
        name: &str,
        target: &CallTarget,
        func: &Function,
        aliases: &[String],
    ) -> LowerResult<FlatFunction> {
        let mut params: Vec<String> = aliases.iter().map(|a| self.frame.namer.claim(a)).collect();
        let pos_count = self.frame.namer.claim("$posCount");
        let bag = self.frame.namer.claim("$named");
        let named_count = self.frame.namer.claim("$namedCount");
        params.push(pos_count.clone());
        params.push(bag.clone());
        params.push(named_count.clone());

        let mut forwarded: Vec<FlatExpr> = params[..aliases.len()]
            .iter()
            .map(|alias| FlatExpr::Local(alias.clone()))
            .collect();

        let seen = self.frame.namer.claim("$seen");
        let defaulted = self.frame.namer.claim("$defaulted");
        let mut body = vec![
            FlatStmt::Let {
                name: seen.clone(),
                value: Some(FlatExpr::int(0)),
            },
            FlatStmt::Let {
                name: defaulted.clone(),
                value: Some(FlatExpr::int(0)),
            },
        ];

        let mut positional_index = 0i64;
        for param in &func.params {
            let text = self.text(param.name.name);
            let local = self.claim_source(param.name.name);
            forwarded.push(FlatExpr::Local(local.clone()));
            match param.kind {
                ParameterKind::Required => {
                    params.push(local);
                    positional_index += 1;
                }
                ParameterKind::Optional => {
                    params.push(local.clone());
                    let fallback = self.default_value(name, param)?;
                    body.push(FlatStmt::If {
                        condition: FlatExpr::binary(
                            "<=",
                            FlatExpr::Local(pos_count.clone()),
                            FlatExpr::int(positional_index),
                        ),
                        then_branch: vec![
                            FlatStmt::Expr(FlatExpr::assign(Place::Local(local), fallback)),
                            increment(&defaulted),
                        ],
                        else_branch: Vec::new(),
                    });
                    positional_index += 1;
                }
                ParameterKind::Named => {
                    let fallback = self.default_value(name, param)?;
                    body.push(FlatStmt::Let {
                        name: local.clone(),
                        value: None,
                    });
                    body.push(FlatStmt::If {
                        condition: FlatExpr::NamedHas {
                            bag: bag.clone(),
                            name: text.to_string(),
                        },
                        then_branch: vec![
                            FlatStmt::Expr(FlatExpr::assign(
                                Place::Local(local.clone()),
                                FlatExpr::NamedGet {
                                    bag: bag.clone(),
                                    name: text.to_string(),
                                },
                            )),
                            increment(&seen),
                        ],
                        else_branch: vec![
                            FlatStmt::Expr(FlatExpr::assign(Place::Local(local), fallback)),
                            increment(&defaulted),
                        ],
                    });
                }
            }
        }

        let total = func.params.len() as i64;
        let guard = FlatExpr::binary(
            "&&",
            FlatExpr::binary("==", FlatExpr::Local(seen.clone()), FlatExpr::Local(named_count)),
            FlatExpr::binary(
                "==",
                FlatExpr::binary(
                    "+",
                    FlatExpr::binary("+", FlatExpr::Local(seen), FlatExpr::Local(defaulted)),
                    FlatExpr::Local(pos_count),
                ),
                FlatExpr::int(total),
            ),
        );
        body.push(FlatStmt::If {
            condition: FlatExpr::Unary {
                operator: "!".to_string(),
                operand: Box::new(guard),
            },
            then_branch: vec![FlatStmt::Return(Some(FlatExpr::NoSuchMethod(target.name.clone())))],
            else_branch: Vec::new(),
        });

        let forward = if self.frame.receiver {
            FlatExpr::CallWithReceiver {
                function: target.name.clone(),
                receiver: Box::new(FlatExpr::This),
                args: forwarded,
            }
        } else {
            FlatExpr::Call {
                function: target.name.clone(),
                args: forwarded,
            }
        };
        body.push(FlatStmt::Return(Some(forward)));

        Ok(FlatFunction {
            name: name.to_string(),
            receiver: self.frame.receiver,
            params,
            body,
            origin: FunctionOrigin::Trampoline,
        })
    }

    /// Default value of an omitted parameter, or the absent sentinel.
    fn default_value(&mut self, trampoline: &str, param: &Parameter) -> LowerResult<FlatExpr> {
        let Some(default) = &param.default else {
            return Ok(FlatExpr::Absent);
        };
        let declaration = format!("{}${}", trampoline, escape(self.text(param.name.name)));
        self.with_body(DeclarationBody::Expression(default), &declaration, |lowerer| {
            lowerer.lower_expr(default)
        })
    }
}

fn increment(counter: &str) -> FlatStmt {
    FlatStmt::Expr(FlatExpr::assign(
        Place::Local(counter.to_string()),
        FlatExpr::binary("+", FlatExpr::Local(counter.to_string()), FlatExpr::int(1)),
    ))
}
