//! Pretty-printing for the flat model
//!
//! Stable, human-readable output for tests and debugging. This is not the
//! target language.

use super::*;
use std::fmt;

/// Trait for pretty-printing flat constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for FlatProgram {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        for record in &self.alias_records {
            output.push_str(&format!(
                "record {} {{ {} }}\n",
                record.name,
                record.fields.join(", ")
            ));
        }
        if !self.alias_records.is_empty() {
            output.push('\n');
        }
        for decl in &self.declarations {
            output.push_str(&decl.pretty_print());
        }
        output
    }
}

impl PrettyPrint for FlatDecl {
    fn pretty_print(&self) -> String {
        match self {
            FlatDecl::Class(class) => class.pretty_print(),
            FlatDecl::Function(func) => func.pretty_print(),
            FlatDecl::Barrier { name, unit } => format!("barrier {} ; {}\n", name, unit),
            FlatDecl::StaticInit(init) => {
                let mut output = format!("static {} for {} {{\n", init.name, init.class);
                write_block(&mut output, &init.body, 1);
                output.push_str("}\n");
                output
            }
        }
    }
}

impl PrettyPrint for FlatClass {
    fn pretty_print(&self) -> String {
        let mut output = format!("class {}", self.name);
        if let Some(superclass) = &self.superclass {
            output.push_str(&format!(" extends {}", superclass));
        }
        output.push_str(" {\n");
        for field in &self.fields {
            output.push_str(&format!("  field {}\n", field));
        }
        for field in &self.static_fields {
            output.push_str(&format!("  static {}\n", field));
        }
        for slot in &self.methods {
            output.push_str(&format!(
                "  {} {} -> {}\n",
                slot.kind, slot.property, slot.function
            ));
        }
        output.push_str("}\n");
        output
    }
}

impl PrettyPrint for FlatFunction {
    fn pretty_print(&self) -> String {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        if self.receiver {
            params.push("this");
        }
        params.extend(self.params.iter().map(String::as_str));

        let mut output = format!(
            "fn {}({}) ; {} {{\n",
            self.name,
            params.join(", "),
            self.origin
        );
        write_block(&mut output, &self.body, 1);
        output.push_str("}\n");
        output
    }
}

impl PrettyPrint for FlatStmt {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        write_stmt(&mut output, self, 0);
        output
    }
}

fn write_block(output: &mut String, stmts: &[FlatStmt], indent: usize) {
    for stmt in stmts {
        write_stmt(output, stmt, indent);
    }
}

fn write_stmt(output: &mut String, stmt: &FlatStmt, indent: usize) {
    let prefix = "  ".repeat(indent);
    match stmt {
        FlatStmt::Let { name, value } => match value {
            Some(value) => output.push_str(&format!("{}let {} = {};\n", prefix, name, value)),
            None => output.push_str(&format!("{}let {};\n", prefix, name)),
        },
        FlatStmt::Expr(expr) => output.push_str(&format!("{}{};\n", prefix, expr)),
        FlatStmt::Return(value) => match value {
            Some(value) => output.push_str(&format!("{}return {};\n", prefix, value)),
            None => output.push_str(&format!("{}return;\n", prefix)),
        },
        FlatStmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            output.push_str(&format!("{}if ({}) {{\n", prefix, condition));
            write_block(output, then_branch, indent + 1);
            if else_branch.is_empty() {
                output.push_str(&format!("{}}}\n", prefix));
            } else {
                output.push_str(&format!("{}}} else {{\n", prefix));
                write_block(output, else_branch, indent + 1);
                output.push_str(&format!("{}}}\n", prefix));
            }
        }
        FlatStmt::While { condition, body } => {
            output.push_str(&format!("{}while ({}) {{\n", prefix, condition));
            write_block(output, body, indent + 1);
            output.push_str(&format!("{}}}\n", prefix));
        }
        FlatStmt::For {
            init,
            condition,
            renew,
            update,
            body,
        } => {
            output.push_str(&format!("{}for {{\n", prefix));
            write_block(output, init, indent + 1);
            let condition = condition.as_ref().map(ToString::to_string).unwrap_or_default();
            let mut steps: Vec<String> = renew.iter().map(|alias| format!("renew {}", alias)).collect();
            steps.extend(update.as_ref().map(ToString::to_string));
            let update = steps.join(", ");
            output.push_str(&format!("{}}} ({}; {}) {{\n", prefix, condition, update));
            write_block(output, body, indent + 1);
            output.push_str(&format!("{}}}\n", prefix));
        }
        FlatStmt::Block(stmts) => {
            output.push_str(&format!("{}{{\n", prefix));
            write_block(output, stmts, indent + 1);
            output.push_str(&format!("{}}}\n", prefix));
        }
        FlatStmt::Try {
            body,
            catch,
            finally,
        } => {
            output.push_str(&format!("{}try {{\n", prefix));
            write_block(output, body, indent + 1);
            if let Some(clause) = catch {
                match &clause.param {
                    Some(param) => output.push_str(&format!("{}}} catch ({}) {{\n", prefix, param)),
                    None => output.push_str(&format!("{}}} catch {{\n", prefix)),
                }
                write_block(output, &clause.body, indent + 1);
            }
            if let Some(finally) = finally {
                output.push_str(&format!("{}}} finally {{\n", prefix));
                write_block(output, finally, indent + 1);
            }
            output.push_str(&format!("{}}}\n", prefix));
        }
        FlatStmt::Throw(value) => output.push_str(&format!("{}throw {};\n", prefix, value)),
        FlatStmt::Break(label) => output.push_str(&format!("{}break{};\n", prefix, label_suffix(label))),
        FlatStmt::Continue(label) => {
            output.push_str(&format!("{}continue{};\n", prefix, label_suffix(label)))
        }
        FlatStmt::Labeled { label, body } => {
            output.push_str(&format!("{}{}: {{\n", prefix, label));
            write_block(output, body, indent + 1);
            output.push_str(&format!("{}}}\n", prefix));
        }
        FlatStmt::InitAlias {
            alias,
            record,
            fields,
        } => {
            output.push_str(&format!(
                "{}alias {} = {} {{ {} }};\n",
                prefix,
                alias,
                record,
                join_pairs(fields, ": ")
            ));
        }
        FlatStmt::ClearAlias(alias) => output.push_str(&format!("{}clear {};\n", prefix, alias)),
    }
}

fn label_suffix(label: &Option<String>) -> String {
    label.as_ref().map(|l| format!(" {}", l)).unwrap_or_default()
}

fn join_exprs(exprs: &[FlatExpr]) -> String {
    exprs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn join_pairs(pairs: &[(String, FlatExpr)], separator: &str) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{}{}{}", name, separator, value))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SlotKind::Method => "method",
            SlotKind::Getter => "getter",
            SlotKind::Setter => "setter",
            SlotKind::Operator => "operator",
        };
        f.write_str(text)
    }
}

impl fmt::Display for FunctionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FunctionOrigin::Function => "function",
            FunctionOrigin::Method => "method",
            FunctionOrigin::Getter => "getter",
            FunctionOrigin::Setter => "setter",
            FunctionOrigin::Operator => "operator",
            FunctionOrigin::Constructor => "constructor",
            FunctionOrigin::Factory => "factory",
            FunctionOrigin::Closure => "closure",
            FunctionOrigin::Trampoline => "trampoline",
        };
        f.write_str(text)
    }
}

impl fmt::Display for FlatLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlatLiteral::Int(v) => write!(f, "{}", v),
            FlatLiteral::Float(v) => write!(f, "{:?}", v),
            FlatLiteral::String(s) => write!(f, "{:?}", s),
            FlatLiteral::Bool(b) => write!(f, "{}", b),
            FlatLiteral::Null => f.write_str("null"),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Local(name) | Place::Global(name) => f.write_str(name),
            Place::Alias { alias, field } => write!(f, "{}.{}", alias, field),
            Place::Field { object, property } => write!(f, "{}.{}", object, property),
            Place::Index { object, index } => write!(f, "{}[{}]", object, index),
        }
    }
}

impl fmt::Display for FlatExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlatExpr::Literal(lit) => write!(f, "{}", lit),
            FlatExpr::Local(name) | FlatExpr::Global(name) => f.write_str(name),
            FlatExpr::AliasGet { alias, field } => write!(f, "{}.{}", alias, field),
            FlatExpr::This => f.write_str("this"),
            FlatExpr::Assign { target, value } => write!(f, "{} = {}", target, value),
            FlatExpr::Bind {
                function,
                receiver,
                scopes,
            } => {
                let receiver = if *receiver { "this" } else { "unbound" };
                if scopes.is_empty() {
                    write!(f, "bind({}, {})", function, receiver)
                } else {
                    write!(f, "bind({}, {}, {})", function, receiver, scopes.join(", "))
                }
            }
            FlatExpr::Call { function, args } => write!(f, "{}({})", function, join_exprs(args)),
            FlatExpr::CallWithReceiver {
                function,
                receiver,
                args,
            } => {
                if args.is_empty() {
                    write!(f, "{}.call({})", function, receiver)
                } else {
                    write!(f, "{}.call({}, {})", function, receiver, join_exprs(args))
                }
            }
            FlatExpr::MethodCall {
                object,
                property,
                args,
            } => write!(f, "{}.{}({})", object, property, join_exprs(args)),
            FlatExpr::DynamicCall {
                callee,
                positional,
                named,
            } => {
                write!(f, "dcall({}, [{}]", callee, join_exprs(positional))?;
                if !named.is_empty() {
                    write!(f, ", {{{}}}", join_pairs(named, ": "))?;
                }
                f.write_str(")")
            }
            FlatExpr::GetField { object, property } => write!(f, "{}.{}", object, property),
            FlatExpr::Index { object, index } => write!(f, "{}[{}]", object, index),
            FlatExpr::Binary {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            FlatExpr::Unary { operator, operand } => write!(f, "{}{}", operator, operand),
            FlatExpr::Conditional {
                condition,
                consequent,
                alternate,
            } => write!(f, "({} ? {} : {})", condition, consequent, alternate),
            FlatExpr::New {
                class,
                constructor,
                args,
            } => write!(f, "new {}:{}({})", class, constructor, join_exprs(args)),
            FlatExpr::List(elements) => write!(f, "[{}]", join_exprs(elements)),
            FlatExpr::NamedBag(pairs) => write!(f, "{{{}}}", join_pairs(pairs, ": ")),
            FlatExpr::NamedHas { bag, name } => write!(f, "has({}, {:?})", bag, name),
            FlatExpr::NamedGet { bag, name } => write!(f, "{}[{:?}]", bag, name),
            FlatExpr::Absent => f.write_str("absent"),
            FlatExpr::NoSuchMethod(target) => write!(f, "noSuchMethod({:?})", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_with_receiver() {
        let func = FlatFunction {
            name: "Counter$bump$M".into(),
            receiver: true,
            params: vec!["by".into()],
            body: vec![FlatStmt::Expr(FlatExpr::assign(
                Place::Field {
                    object: FlatExpr::This,
                    property: "count$F".into(),
                },
                FlatExpr::binary(
                    "+",
                    FlatExpr::GetField {
                        object: Box::new(FlatExpr::This),
                        property: "count$F".into(),
                    },
                    FlatExpr::local("by"),
                ),
            ))],
            origin: FunctionOrigin::Method,
        };

        assert_eq!(
            func.pretty_print(),
            "fn Counter$bump$M(this, by) ; method {\n  this.count$F = (this.count$F + by);\n}\n"
        );
    }

    #[test]
    fn test_bind_and_alias_statements() {
        let stmts = vec![
            FlatStmt::InitAlias {
                alias: "$s0".into(),
                record: "outer$M$A0".into(),
                fields: vec![("a".into(), FlatExpr::local("a"))],
            },
            FlatStmt::Return(Some(FlatExpr::Bind {
                function: "outer$M$0_inner$L".into(),
                receiver: false,
                scopes: vec!["$s0".into()],
            })),
        ];
        let mut output = String::new();
        write_block(&mut output, &stmts, 0);
        assert_eq!(
            output,
            "alias $s0 = outer$M$A0 { a: a };\nreturn bind(outer$M$0_inner$L, unbound, $s0);\n"
        );
    }

    #[test]
    fn test_if_else_layout() {
        let stmt = FlatStmt::If {
            condition: FlatExpr::Literal(FlatLiteral::Bool(true)),
            then_branch: vec![FlatStmt::Break(None)],
            else_branch: vec![FlatStmt::Continue(Some("outer".into()))],
        };
        assert_eq!(
            stmt.pretty_print(),
            "if (true) {\n  break;\n} else {\n  continue outer;\n}\n"
        );
    }

    #[test]
    fn test_for_renews_alias_before_update() {
        let field = |name: &str| FlatExpr::AliasGet {
            alias: "$s1".into(),
            field: name.into(),
        };
        let stmt = FlatStmt::For {
            init: Vec::new(),
            condition: Some(FlatExpr::binary("<", field("i"), FlatExpr::int(3))),
            renew: Some("$s1".into()),
            update: Some(FlatExpr::assign(
                Place::Alias {
                    alias: "$s1".into(),
                    field: "i".into(),
                },
                FlatExpr::binary("+", field("i"), FlatExpr::int(1)),
            )),
            body: vec![FlatStmt::Break(None)],
        };
        assert_eq!(
            stmt.pretty_print(),
            "for {\n} ($s1.i < 3; renew $s1, $s1.i = ($s1.i + 1)) {\n  break;\n}\n"
        );
    }
}
