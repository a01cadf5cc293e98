//! Declaration AST nodes
//!
//! Programs, compilation units, classes, members and function literals.

use super::*;

/// Root node: every compilation unit of one program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub units: Vec<CompilationUnit>,
}

impl Program {
    pub fn new(units: Vec<CompilationUnit>) -> Self {
        Self { units }
    }

    /// Iterate over every class declaration in program order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.units.iter().flat_map(|unit| unit.classes())
    }

    /// Iterate over every top-level function in program order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.units.iter().flat_map(|unit| unit.functions())
    }
}

/// One source unit. `path` is its canonical path and identifies the unit's
/// private namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub path: String,
    pub items: Vec<Item>,
}

impl CompilationUnit {
    pub fn new(path: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            path: path.into(),
            items,
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Class(class) => Some(class),
            Item::Function(_) => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(func) => Some(func),
            Item::Class(_) => None,
        })
    }
}

/// Top-level item of a compilation unit
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Class(ClassDecl),
    Function(FunctionDecl),
}

/// Top-level function: `function name(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub id: FunctionId,
    pub name: Identifier,
    pub function: Function,
}

/// Class declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub id: ClassId,
    pub name: Identifier,
    /// Resolved superclass (if any)
    pub superclass: Option<ClassId>,
    pub members: Vec<ClassMember>,
    /// `static { ... }` block, run after the unit's barrier
    pub static_init: Option<BlockStatement>,
    pub span: Span,
}

impl ClassDecl {
    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn constructors(&self) -> impl Iterator<Item = &ConstructorDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Constructor(ctor) => Some(ctor),
            _ => None,
        })
    }

    /// Whether the class needs a static-initializer declaration.
    pub fn has_static_init(&self) -> bool {
        self.static_init.is_some()
            || self
                .fields()
                .any(|f| f.is_static && f.initializer.is_some())
    }
}

/// Class member
#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
}

/// Field declaration: `x = initializer;` or `static x = initializer;`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Identifier,
    pub is_static: bool,
    pub initializer: Option<Expression>,
    pub span: Span,
}

/// Method, getter, setter or operator
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: Identifier,
    pub kind: MethodKind,
    pub is_static: bool,
    pub function: Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
    /// User-defined operator; `name` holds the operator token (`+`, `[]`, `==`)
    Operator,
}

/// Generative or factory constructor
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    /// `None` for the unnamed constructor
    pub name: Option<Identifier>,
    pub kind: ConstructorKind,
    pub function: Function,
    /// Initializer list: `: x = a, y = b`
    pub initializers: Vec<FieldInitializer>,
    /// `super(...)` / `super.named(...)` in the initializer list
    pub super_call: Option<SuperCall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructorKind {
    Generative,
    /// Factories have no receiver
    Factory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInitializer {
    pub field: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperCall {
    pub constructor: Option<Identifier>,
    pub arguments: Arguments,
    pub span: Span,
}

/// Function literal, local function, method or constructor body
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: NodeId,
    /// Source-level name (local functions and named function expressions)
    pub name: Option<Identifier>,
    /// Local binding for the name; lives in the *enclosing* scope
    pub binding: Option<LocalId>,
    pub params: Vec<Parameter>,
    pub body: FunctionBody,
    pub span: Span,
}

impl Function {
    /// Whether calls must go through a named-parameter trampoline.
    pub fn needs_trampoline(&self) -> bool {
        self.params
            .iter()
            .any(|p| p.kind != ParameterKind::Required)
    }

    pub fn required_count(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.kind == ParameterKind::Required)
            .count()
    }

    /// Required and optional positional parameters, in declaration order.
    pub fn positional_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params
            .iter()
            .filter(|p| p.kind != ParameterKind::Named)
    }

    pub fn named_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params
            .iter()
            .filter(|p| p.kind == ParameterKind::Named)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Block(BlockStatement),
    /// `=> expression`
    Expression(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Identifier,
    pub local: LocalId,
    pub kind: ParameterKind,
    /// Resolved default value (optional and named parameters only)
    pub default: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Required,
    /// `[int x = 0]`
    Optional,
    /// `{int x = 0}`
    Named,
}
