//! Program lowering
//!
//! One upfront pass over the program names every class, member and
//! top-level function (`ProgramIndex`). Declarations are then lowered one at
//! a time, in program order; each declaration body is analysed, flattened and
//! has its closures hoisted by a `FunctionLowerer`. Finally the collected
//! declarations are put in emission order.

mod expr;
mod function;
mod hoist;
mod stmt;
mod trampoline;

pub(crate) use hoist::HoistedClosure;

use crate::error::{LowerError, LowerResult};
use crate::flat::*;
use crate::mangle::{self, MangleContext, NameKey, Role};
use crate::options::LowerOptions;
use crate::order::{order_declarations, DeclKind, Declaration};
use crate::scope::DeclarationBody;
use function::{Frame, FunctionLowerer};
use rustc_hash::FxHashMap;
use strata_ast::ast::*;
use strata_ast::{Interner, Symbol};
use tracing::debug;

/// A statically known callee
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallTarget {
    /// Implementing function
    pub name: String,
    /// Uniform-convention adapter, for targets with optional or named parameters
    pub trampoline: Option<String>,
}

impl CallTarget {
    /// The function call sites and tear-offs refer to.
    pub fn entry(&self) -> &str {
        self.trampoline.as_deref().unwrap_or(&self.name)
    }

    pub fn is_uniform(&self) -> bool {
        self.trampoline.is_some()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MemberEntry {
    /// Property name on instances and class objects
    pub property: String,
    /// Implementing function of methods, getters, setters and operators
    pub target: Option<CallTarget>,
    /// Global holding a static field
    pub global: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ConstructorEntry {
    pub target: CallTarget,
    pub factory: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ClassEntry {
    pub name: String,
    members: FxHashMap<(Symbol, MemberKind), MemberEntry>,
    constructors: FxHashMap<Option<Symbol>, ConstructorEntry>,
    /// The class declares no constructor and gets a synthesized one
    pub default_constructor: bool,
    pub static_init: Option<String>,
}

impl ClassEntry {
    pub fn member(&self, name: Symbol, kind: MemberKind) -> Option<&MemberEntry> {
        self.members.get(&(name, kind))
    }

    pub fn constructor(&self, name: Option<Symbol>) -> Option<&ConstructorEntry> {
        self.constructors.get(&name)
    }
}

/// Global names of everything declared in the program
#[derive(Debug, Default)]
pub(crate) struct ProgramIndex {
    classes: FxHashMap<ClassId, ClassEntry>,
    functions: FxHashMap<FunctionId, CallTarget>,
}

impl ProgramIndex {
    fn build(
        program: &Program,
        interner: &Interner,
        mangler: &mut MangleContext,
    ) -> LowerResult<Self> {
        let mut index = ProgramIndex::default();
        for unit in &program.units {
            for item in &unit.items {
                match item {
                    Item::Class(class) => {
                        let entry = Self::index_class(class, &unit.path, interner, mangler);
                        if index.classes.insert(class.id, entry).is_some() {
                            return Err(LowerError::internal(format!(
                                "class {} is declared twice",
                                class.id
                            )));
                        }
                    }
                    Item::Function(decl) => {
                        let text = interner.resolve(decl.name.name);
                        let candidate = mangler.mangle_in(text, Role::Method, &unit.path);
                        let name = mangler.claim(NameKey::Function(decl.id), candidate);
                        let target = with_trampoline(mangler, name, &decl.function);
                        index.functions.insert(decl.id, target);
                    }
                }
            }
        }
        Ok(index)
    }

    fn index_class(
        class: &ClassDecl,
        path: &str,
        interner: &Interner,
        mangler: &mut MangleContext,
    ) -> ClassEntry {
        let class_text = interner.resolve(class.name.name);
        let candidate = mangler.mangle_in(class_text, Role::Class, path);
        let name = mangler.claim(NameKey::Class(class.id), candidate);

        let mut members = FxHashMap::default();
        let mut constructors = FxHashMap::default();
        for member in &class.members {
            match member {
                ClassMember::Field(field) => {
                    let text = interner.resolve(field.name.name);
                    let property = mangler.mangle_in(text, Role::Field, path);
                    let global = field.is_static.then(|| {
                        let key = NameKey::Member {
                            class: class.id,
                            member: text.to_string(),
                            role: Role::Field,
                        };
                        mangler.claim(key, format!("{}{}", name, property))
                    });
                    members.insert(
                        (field.name.name, MemberKind::Field),
                        MemberEntry {
                            property,
                            target: None,
                            global,
                        },
                    );
                }
                ClassMember::Method(method) => {
                    let text = interner.resolve(method.name.name);
                    let (role, kind, base) = match method.kind {
                        MethodKind::Method => (Role::Method, MemberKind::Method, text.to_string()),
                        MethodKind::Getter => (Role::Getter, MemberKind::Getter, text.to_string()),
                        MethodKind::Setter => (Role::Setter, MemberKind::Setter, text.to_string()),
                        MethodKind::Operator => {
                            (Role::Operator, MemberKind::Method, mangle::operator_word(text))
                        }
                    };
                    let property = mangler.mangle_in(&base, role, path);
                    let key = NameKey::Member {
                        class: class.id,
                        member: text.to_string(),
                        role,
                    };
                    let function = mangler.claim(key, format!("{}{}", name, property));
                    let target = with_trampoline(mangler, function, &method.function);
                    members.insert(
                        (method.name.name, kind),
                        MemberEntry {
                            property,
                            target: Some(target),
                            global: None,
                        },
                    );
                }
                ClassMember::Constructor(ctor) => {
                    let factory = ctor.kind == ConstructorKind::Factory;
                    let role = if factory {
                        Role::Factory
                    } else {
                        Role::Constructor
                    };
                    let text = ctor.name.map(|n| interner.resolve(n.name));
                    let key = NameKey::Constructor {
                        class: class.id,
                        name: text.map(str::to_string),
                    };
                    let candidate =
                        format!("{}{}", name, mangler.mangle_in(text.unwrap_or(""), role, path));
                    let function = mangler.claim(key, candidate);
                    constructors.insert(
                        ctor.name.map(|n| n.name),
                        ConstructorEntry {
                            target: with_trampoline(mangler, function, &ctor.function),
                            factory,
                        },
                    );
                }
            }
        }

        let default_constructor = constructors.is_empty();
        if default_constructor {
            let key = NameKey::Constructor {
                class: class.id,
                name: None,
            };
            let function = mangler.claim(key, format!("{}{}", name, Role::Constructor.suffix()));
            constructors.insert(
                None,
                ConstructorEntry {
                    target: CallTarget {
                        name: function,
                        trampoline: None,
                    },
                    factory: false,
                },
            );
        }

        let static_init = class.has_static_init().then(|| {
            let candidate = mangler.mangle_in(class_text, Role::StaticInit, path);
            mangler.claim(NameKey::StaticInit(class.id), candidate)
        });

        ClassEntry {
            name,
            members,
            constructors,
            default_constructor,
            static_init,
        }
    }

    pub fn class(&self, id: ClassId) -> LowerResult<&ClassEntry> {
        self.classes
            .get(&id)
            .ok_or(LowerError::UnknownClass(id.as_u32()))
    }

    pub fn function(&self, id: FunctionId) -> LowerResult<&CallTarget> {
        self.functions
            .get(&id)
            .ok_or(LowerError::UnknownFunction(id.as_u32()))
    }

    pub fn member(&self, binding: &MemberBinding, interner: &Interner) -> LowerResult<&MemberEntry> {
        self.class(binding.class)?
            .member(binding.name, binding.kind)
            .ok_or_else(|| LowerError::UnknownMember {
                class: binding.class.as_u32(),
                member: interner.resolve(binding.name).to_string(),
            })
    }

    pub fn constructor(
        &self,
        class: ClassId,
        name: Option<Symbol>,
        interner: &Interner,
    ) -> LowerResult<&ConstructorEntry> {
        self.class(class)?
            .constructor(name)
            .ok_or_else(|| LowerError::UnknownMember {
                class: class.as_u32(),
                member: name.map(|n| interner.resolve(n)).unwrap_or("new").to_string(),
            })
    }
}

fn with_trampoline(mangler: &mut MangleContext, name: String, func: &Function) -> CallTarget {
    let trampoline = func.needs_trampoline().then(|| {
        let candidate = format!("{}{}", name, Role::Trampoline.suffix());
        mangler.claim(NameKey::Trampoline(name.clone()), candidate)
    });
    CallTarget { name, trampoline }
}

/// Program-wide lowering state
pub(crate) struct ProgramBuilder<'a> {
    pub interner: &'a Interner,
    pub options: &'a LowerOptions,
    pub index: ProgramIndex,
    pub mangler: MangleContext,
    /// Hoisted closures by identity, reused when a closure is lowered again
    pub hoisted: FxHashMap<NodeId, HoistedClosure>,
    pub alias_records: Vec<AliasRecord>,
    /// Ordinary declarations of the unit being lowered
    ordinary: Vec<(FlatDecl, DeclKind)>,
    /// Static initializers of the unit being lowered
    statics: Vec<FlatDecl>,
    output: Vec<(FlatDecl, Declaration)>,
}

impl<'a> ProgramBuilder<'a> {
    fn new(program: &Program, interner: &'a Interner, options: &'a LowerOptions) -> LowerResult<Self> {
        let mut mangler = MangleContext::new(options);
        let index = ProgramIndex::build(program, interner, &mut mangler)?;
        Ok(Self {
            interner,
            options,
            index,
            mangler,
            hoisted: FxHashMap::default(),
            alias_records: Vec::new(),
            ordinary: Vec::new(),
            statics: Vec::new(),
            output: Vec::new(),
        })
    }

    fn lower_unit(&mut self, unit_index: usize, unit: &CompilationUnit) -> LowerResult<()> {
        debug!(unit = %unit.path, items = unit.items.len(), "lowering unit");
        for item in &unit.items {
            match item {
                Item::Class(class) => self.lower_class(class)?,
                Item::Function(decl) => self.lower_top_level(decl)?,
            }
        }

        for (decl, kind) in std::mem::take(&mut self.ordinary) {
            self.emit(decl, kind, unit_index);
        }
        let barrier = self
            .mangler
            .claim(NameKey::Barrier(unit_index), format!("$barrier{}", unit_index));
        self.emit(
            FlatDecl::Barrier {
                name: barrier,
                unit: unit.path.clone(),
            },
            DeclKind::Barrier,
            unit_index,
        );
        for decl in std::mem::take(&mut self.statics) {
            self.emit(decl, DeclKind::StaticInit, unit_index);
        }
        Ok(())
    }

    fn emit(&mut self, decl: FlatDecl, kind: DeclKind, unit: usize) {
        let meta = Declaration {
            name: decl.name().to_string(),
            ordinal: self.output.len(),
            unit,
            kind,
        };
        self.output.push((decl, meta));
    }

    /// Queue a lowered function and the closures hoisted out of it.
    fn push_function(&mut self, func: FlatFunction, hoisted: Vec<FlatFunction>) {
        self.ordinary
            .push((FlatDecl::Function(func), DeclKind::Member));
        for closure in hoisted {
            self.ordinary
                .push((FlatDecl::Function(closure), DeclKind::Member));
        }
    }

    fn frame(&self, name: &str, receiver: bool) -> Frame {
        Frame::root(name.to_string(), receiver, &self.options.reserved)
    }

    fn lower_top_level(&mut self, decl: &FunctionDecl) -> LowerResult<()> {
        let target = self.index.function(decl.id)?.clone();
        debug!(function = %target.name, "lowering function");
        let frame = self.frame(&target.name, false);
        let mut lowerer = FunctionLowerer::new(
            self,
            DeclarationBody::Function(&decl.function),
            &target.name,
            frame,
        )?;
        let func = lowerer.lower_function(&decl.function, FunctionOrigin::Function)?;
        let trampoline = lowerer.root_trampoline(&target, &decl.function, false)?;
        let mut hoisted = lowerer.finish();
        hoisted.extend(trampoline);
        self.push_function(func, hoisted);
        Ok(())
    }

    fn lower_class(&mut self, class: &ClassDecl) -> LowerResult<()> {
        let entry = self.index.class(class.id)?.clone();
        debug!(class = %entry.name, members = class.members.len(), "lowering class");

        let superclass = match class.superclass {
            Some(id) => Some(self.index.class(id)?.name.clone()),
            None => None,
        };
        let mut flat = FlatClass {
            name: entry.name.clone(),
            superclass,
            fields: Vec::new(),
            methods: Vec::new(),
            static_fields: Vec::new(),
        };
        for field in class.fields() {
            let member = self.class_member(&entry, class, field.name.name, MemberKind::Field)?;
            match &member.global {
                Some(global) => flat.static_fields.push(global.clone()),
                None => flat.fields.push(member.property.clone()),
            }
        }
        for method in class.methods().filter(|m| !m.is_static) {
            let (kind, slot) = slot_kind(method.kind);
            let member = self.class_member(&entry, class, method.name.name, kind)?;
            let target = member.target.as_ref().ok_or_else(|| {
                LowerError::internal(format!("method {} has no implementation", member.property))
            })?;
            flat.methods.push(MethodSlot {
                property: member.property.clone(),
                kind: slot,
                function: target.entry().to_string(),
            });
        }
        self.ordinary.push((
            FlatDecl::Class(flat),
            DeclKind::Class {
                class: class.id,
                superclass: class.superclass,
            },
        ));

        for member in &class.members {
            match member {
                ClassMember::Field(_) => {}
                ClassMember::Method(method) => self.lower_method(&entry, class, method)?,
                ClassMember::Constructor(ctor) => match ctor.kind {
                    ConstructorKind::Generative => self.lower_constructor(&entry, class, Some(ctor))?,
                    ConstructorKind::Factory => self.lower_factory(&entry, ctor)?,
                },
            }
        }
        if entry.default_constructor {
            self.lower_constructor(&entry, class, None)?;
        }
        if let Some(name) = &entry.static_init {
            self.lower_static_init(name, class)?;
        }
        Ok(())
    }

    fn class_member<'e>(
        &self,
        entry: &'e ClassEntry,
        class: &ClassDecl,
        name: Symbol,
        kind: MemberKind,
    ) -> LowerResult<&'e MemberEntry> {
        entry.member(name, kind).ok_or_else(|| LowerError::UnknownMember {
            class: class.id.as_u32(),
            member: self.interner.resolve(name).to_string(),
        })
    }

    fn lower_method(&mut self, entry: &ClassEntry, class: &ClassDecl, method: &MethodDecl) -> LowerResult<()> {
        let (kind, _) = slot_kind(method.kind);
        let member = self.class_member(entry, class, method.name.name, kind)?;
        let target = member.target.clone().ok_or_else(|| {
            LowerError::internal(format!("method {} has no implementation", member.property))
        })?;
        let origin = match method.kind {
            MethodKind::Method => FunctionOrigin::Method,
            MethodKind::Getter => FunctionOrigin::Getter,
            MethodKind::Setter => FunctionOrigin::Setter,
            MethodKind::Operator => FunctionOrigin::Operator,
        };
        debug!(method = %target.name, is_static = method.is_static, "lowering method");

        let receiver = !method.is_static;
        let frame = self.frame(&target.name, receiver);
        let mut lowerer = FunctionLowerer::new(
            self,
            DeclarationBody::Function(&method.function),
            &target.name,
            frame,
        )?;
        let func = lowerer.lower_function(&method.function, origin)?;
        let trampoline = lowerer.root_trampoline(&target, &method.function, receiver)?;
        let mut hoisted = lowerer.finish();
        hoisted.extend(trampoline);
        self.push_function(func, hoisted);
        Ok(())
    }

    fn lower_constructor(
        &mut self,
        entry: &ClassEntry,
        class: &ClassDecl,
        ctor: Option<&ConstructorDecl>,
    ) -> LowerResult<()> {
        let ctor_entry = entry
            .constructor(ctor.and_then(|c| c.name.map(|n| n.name)))
            .ok_or_else(|| LowerError::internal(format!("constructor of {} was not indexed", entry.name)))?;
        let target = ctor_entry.target.clone();
        debug!(constructor = %target.name, "lowering constructor");

        let body = match ctor {
            Some(ctor) => DeclarationBody::Constructor(ctor),
            None => DeclarationBody::Empty,
        };
        let frame = self.frame(&target.name, true);
        let mut lowerer = FunctionLowerer::new(self, body, &target.name, frame)?;
        let func = lowerer.lower_constructor(class, ctor)?;
        let trampoline = match ctor {
            Some(ctor) => lowerer.root_trampoline(&target, &ctor.function, true)?,
            None => None,
        };
        let mut hoisted = lowerer.finish();
        hoisted.extend(trampoline);
        self.push_function(func, hoisted);
        Ok(())
    }

    fn lower_factory(&mut self, entry: &ClassEntry, ctor: &ConstructorDecl) -> LowerResult<()> {
        let ctor_entry = entry
            .constructor(ctor.name.map(|n| n.name))
            .ok_or_else(|| LowerError::internal(format!("factory of {} was not indexed", entry.name)))?;
        let target = ctor_entry.target.clone();
        debug!(factory = %target.name, "lowering factory");

        let frame = self.frame(&target.name, false);
        let mut lowerer = FunctionLowerer::new(
            self,
            DeclarationBody::Function(&ctor.function),
            &target.name,
            frame,
        )?;
        let func = lowerer.lower_function(&ctor.function, FunctionOrigin::Factory)?;
        let trampoline = lowerer.root_trampoline(&target, &ctor.function, false)?;
        let mut hoisted = lowerer.finish();
        hoisted.extend(trampoline);
        self.push_function(func, hoisted);
        Ok(())
    }

    fn lower_static_init(&mut self, name: &str, class: &ClassDecl) -> LowerResult<()> {
        let class_name = self.index.class(class.id)?.name.clone();
        debug!(static_init = %name, "lowering static initializer");

        let frame = self.frame(name, false);
        let mut lowerer = FunctionLowerer::new(self, DeclarationBody::Empty, name, frame)?;
        let body = lowerer.lower_static_init(class)?;
        let hoisted = lowerer.finish();

        for closure in hoisted {
            self.ordinary
                .push((FlatDecl::Function(closure), DeclKind::Member));
        }
        self.statics.push(FlatDecl::StaticInit(FlatStaticInit {
            name: name.to_string(),
            class: class_name,
            body,
        }));
        Ok(())
    }

    fn finish(self) -> LowerResult<FlatProgram> {
        let (decls, metas): (Vec<FlatDecl>, Vec<Declaration>) = self.output.into_iter().unzip();
        let order = order_declarations(&metas)?;

        let mut slots: Vec<Option<FlatDecl>> = decls.into_iter().map(Some).collect();
        let declarations: Vec<FlatDecl> = order
            .into_iter()
            .filter_map(|index| slots.get_mut(index).and_then(Option::take))
            .collect();

        debug!(
            declarations = declarations.len(),
            alias_records = self.alias_records.len(),
            "lowered program"
        );
        Ok(FlatProgram {
            declarations,
            alias_records: self.alias_records,
            names: self.mangler.into_names(),
        })
    }
}

fn slot_kind(kind: MethodKind) -> (MemberKind, SlotKind) {
    match kind {
        MethodKind::Method => (MemberKind::Method, SlotKind::Method),
        MethodKind::Getter => (MemberKind::Getter, SlotKind::Getter),
        MethodKind::Setter => (MemberKind::Setter, SlotKind::Setter),
        MethodKind::Operator => (MemberKind::Method, SlotKind::Operator),
    }
}

/// Lower a resolved program to flat declarations in emission order.
pub fn lower_program(
    program: &Program,
    interner: &Interner,
    options: &LowerOptions,
) -> LowerResult<FlatProgram> {
    options.validate()?;
    let mut builder = ProgramBuilder::new(program, interner, options)?;
    for (unit_index, unit) in program.units.iter().enumerate() {
        builder.lower_unit(unit_index, unit)?;
    }
    builder.finish()
}
