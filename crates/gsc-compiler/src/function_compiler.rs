//! Compiles one function body to assembly.
//!
//! GSC locals are function-scoped and come into existence on their first
//! plain assignment. Reading a name before that point is an error, as is
//! using `break` or `continue` outside a loop.

use gsc_core::{BuildMode, CompileError, Span};
use gsc_parser::ast::{
    AssignExpr, BinaryOp, Block, CallExpr, Expr, FunctionDecl, Ident, LiteralKind,
    PostfixOp, Stmt, UnaryOp,
};
use rustc_hash::FxHashMap;

use crate::assembly::{AsmFunction, CallTarget, Instruction, Label};
use crate::bytecode::{CallFlags, OpCode};

type Result<T> = std::result::Result<T, CompileError>;

/// Most local slots a function may use; slots are addressed by one byte.
pub const MAX_LOCALS: usize = 255;

/// Most arguments a single call may pass.
pub const MAX_ARGUMENTS: usize = 255;

/// Deepest statement and expression tree the compiler descends into. Long
/// left-associative chains such as `a + b + ... + z` count one level per
/// operator.
pub const MAX_DEPTH: u32 = 128;

/// Functions a call may resolve to without a path.
#[derive(Debug, Default)]
pub(crate) struct CallScope<'ast> {
    /// Functions defined in the script being compiled.
    pub locals: FxHashMap<&'ast str, Span>,
    /// Functions defined in included files, mapped to the include path.
    /// The first include to define a name wins.
    pub included: FxHashMap<&'ast str, &'ast str>,
}

impl<'ast> CallScope<'ast> {
    fn resolve(&self, path: Option<&'ast str>, name: &'ast str) -> CallTarget {
        match path {
            Some(path) => CallTarget::Far {
                path: path.to_string(),
                name: name.to_string(),
            },
            None if self.locals.contains_key(name) => CallTarget::Local(name.to_string()),
            None => match self.included.get(name) {
                Some(path) => CallTarget::Far {
                    path: path.to_string(),
                    name: name.to_string(),
                },
                None => CallTarget::Builtin(name.to_string()),
            },
        }
    }
}

struct LoopLabels {
    continue_to: Label,
    break_to: Label,
}

/// The right-hand side of a store.
#[derive(Clone, Copy)]
enum Rhs<'ast> {
    Expr(&'ast Expr<'ast>),
    One,
}

/// Compiles a single function.
pub(crate) struct FunctionCompiler<'a, 'ast> {
    scope: &'a CallScope<'ast>,
    mode: BuildMode,
    decl: &'a FunctionDecl<'ast>,
    locals: FxHashMap<&'ast str, u8>,
    instructions: Vec<Instruction>,
    next_label: u32,
    loops: Vec<LoopLabels>,
    depth: u32,
}

impl<'a, 'ast> FunctionCompiler<'a, 'ast> {
    pub fn new(scope: &'a CallScope<'ast>, mode: BuildMode, decl: &'a FunctionDecl<'ast>) -> Self {
        Self {
            scope,
            mode,
            decl,
            locals: FxHashMap::default(),
            instructions: Vec::new(),
            next_label: 0,
            loops: Vec::new(),
            depth: 0,
        }
    }

    pub fn compile(mut self) -> Result<AsmFunction> {
        for param in self.decl.params {
            if self.locals.contains_key(param.name) {
                return Err(CompileError::DuplicateParameter {
                    name: param.name.to_string(),
                    function: self.decl.name.name.to_string(),
                    span: param.span,
                });
            }
            self.declare(param)?;
        }

        let decl = self.decl;
        self.compile_block(&decl.body)?;
        self.emit(Instruction::Op(OpCode::End));

        Ok(AsmFunction {
            name: self.decl.name.name.to_string(),
            params: self.decl.params.len() as u8,
            locals: self.locals.len() as u8,
            instructions: self.instructions,
        })
    }

    // =========================================
    // Locals and labels
    // =========================================

    fn declare(&mut self, ident: &Ident<'ast>) -> Result<u8> {
        if let Some(&slot) = self.locals.get(ident.name) {
            return Ok(slot);
        }
        if self.locals.len() >= MAX_LOCALS {
            return Err(CompileError::TooManyLocals {
                function: self.decl.name.name.to_string(),
                limit: MAX_LOCALS,
                span: ident.span,
            });
        }
        let slot = self.locals.len() as u8;
        self.locals.insert(ident.name, slot);
        Ok(slot)
    }

    fn lookup(&self, ident: &Ident<'ast>) -> Result<u8> {
        self.locals
            .get(ident.name)
            .copied()
            .ok_or_else(|| CompileError::UninitializedVariable {
                name: ident.name.to_string(),
                span: ident.span,
            })
    }

    fn descend(&mut self, span: Span, compile: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(CompileError::NestingTooDeep {
                function: self.decl.name.name.to_string(),
                limit: MAX_DEPTH,
                span,
            });
        }
        self.depth += 1;
        let result = compile(self);
        self.depth -= 1;
        result
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn mark(&mut self, label: Label) {
        self.emit(Instruction::Label(label));
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit(Instruction::Op(op));
    }

    // =========================================
    // Statements
    // =========================================

    fn compile_block(&mut self, block: &Block<'ast>) -> Result<()> {
        for stmt in block.stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt<'ast>) -> Result<()> {
        self.descend(stmt.span(), |compiler| compiler.compile_stmt_kind(stmt))
    }

    fn compile_stmt_kind(&mut self, stmt: &Stmt<'ast>) -> Result<()> {
        match stmt {
            Stmt::Expr(s) => self.compile_effect(s.expr),
            Stmt::Empty(_) => Ok(()),
            Stmt::Block(block) => self.compile_block(block),
            Stmt::DevBlock(block) => {
                if self.mode.keeps_dev_blocks() {
                    self.compile_block(block)
                } else {
                    Ok(())
                }
            }
            Stmt::If(s) => {
                let else_label = self.new_label();
                self.compile_expr(s.condition)?;
                self.emit(Instruction::Jump(OpCode::JumpIfFalse, else_label));
                self.compile_stmt(s.then_stmt)?;
                match s.else_stmt {
                    Some(else_stmt) => {
                        let end = self.new_label();
                        self.emit(Instruction::Jump(OpCode::Jump, end));
                        self.mark(else_label);
                        self.compile_stmt(else_stmt)?;
                        self.mark(end);
                    }
                    None => self.mark(else_label),
                }
                Ok(())
            }
            Stmt::While(s) => {
                let start = self.new_label();
                let end = self.new_label();
                self.mark(start);
                self.compile_expr(s.condition)?;
                self.emit(Instruction::Jump(OpCode::JumpIfFalse, end));
                self.compile_loop_body(s.body, start, end)?;
                self.emit(Instruction::Jump(OpCode::Jump, start));
                self.mark(end);
                Ok(())
            }
            Stmt::For(s) => {
                if let Some(init) = s.init {
                    self.compile_effect(init)?;
                }
                let start = self.new_label();
                let step = self.new_label();
                let end = self.new_label();
                self.mark(start);
                if let Some(condition) = s.condition {
                    self.compile_expr(condition)?;
                    self.emit(Instruction::Jump(OpCode::JumpIfFalse, end));
                }
                self.compile_loop_body(s.body, step, end)?;
                self.mark(step);
                if let Some(step_expr) = s.step {
                    self.compile_effect(step_expr)?;
                }
                self.emit(Instruction::Jump(OpCode::Jump, start));
                self.mark(end);
                Ok(())
            }
            Stmt::Return(s) => {
                match s.value {
                    Some(value) => self.compile_expr(value)?,
                    None => self.emit_op(OpCode::PushUndefined),
                }
                self.emit_op(OpCode::Return);
                Ok(())
            }
            Stmt::Wait(s) => {
                self.compile_expr(s.duration)?;
                self.emit_op(OpCode::Wait);
                Ok(())
            }
            Stmt::Break(span) => {
                let target = self.loop_target("break", *span, |l| l.break_to)?;
                self.emit(Instruction::Jump(OpCode::Jump, target));
                Ok(())
            }
            Stmt::Continue(span) => {
                let target = self.loop_target("continue", *span, |l| l.continue_to)?;
                self.emit(Instruction::Jump(OpCode::Jump, target));
                Ok(())
            }
        }
    }

    fn compile_loop_body(&mut self, body: &Stmt<'ast>, continue_to: Label, break_to: Label) -> Result<()> {
        self.loops.push(LoopLabels {
            continue_to,
            break_to,
        });
        let result = self.compile_stmt(body);
        self.loops.pop();
        result
    }

    fn loop_target(
        &self,
        keyword: &'static str,
        span: Span,
        pick: impl Fn(&LoopLabels) -> Label,
    ) -> Result<Label> {
        self.loops
            .last()
            .map(pick)
            .ok_or(CompileError::OutsideLoop { keyword, span })
    }

    /// Compile an expression for its side effects only.
    fn compile_effect(&mut self, expr: &'ast Expr<'ast>) -> Result<()> {
        match expr {
            Expr::Assign(assign) => self.compile_assign(assign),
            Expr::Postfix(postfix) => {
                self.compile_store(postfix.operand, Some(postfix_opcode(postfix.op)), Rhs::One)
            }
            _ => {
                self.compile_expr(expr)?;
                self.emit_op(OpCode::Pop);
                Ok(())
            }
        }
    }

    // =========================================
    // Expressions
    // =========================================

    /// Compile an expression that leaves exactly one value on the stack.
    fn compile_expr(&mut self, expr: &'ast Expr<'ast>) -> Result<()> {
        self.descend(expr.span(), |compiler| compiler.compile_expr_kind(expr))
    }

    fn compile_expr_kind(&mut self, expr: &'ast Expr<'ast>) -> Result<()> {
        match expr {
            Expr::Literal(lit) => {
                let instruction = match lit.kind {
                    LiteralKind::Int(v) => Instruction::PushInt(v),
                    LiteralKind::Float(v) => Instruction::PushFloat(v),
                    LiteralKind::Bool(true) => Instruction::Op(OpCode::PushTrue),
                    LiteralKind::Bool(false) => Instruction::Op(OpCode::PushFalse),
                    LiteralKind::String(s) => Instruction::PushString(s.to_string()),
                    LiteralKind::IString(s) => Instruction::PushIString(s.to_string()),
                    LiteralKind::Undefined => Instruction::Op(OpCode::PushUndefined),
                };
                self.emit(instruction);
            }
            Expr::Ident(ident) => {
                let slot = self.lookup(ident)?;
                self.emit(Instruction::GetLocal(slot));
            }
            Expr::SelfRef(_) => self.emit_op(OpCode::PushSelf),
            Expr::Level(_) => self.emit_op(OpCode::PushLevel),
            Expr::EmptyArray(_) => self.emit_op(OpCode::PushEmptyArray),
            Expr::Field(field) => {
                self.compile_expr(field.object)?;
                self.emit(Instruction::GetField(field.field.name.to_string()));
            }
            Expr::Index(index) => {
                self.compile_expr(index.object)?;
                self.compile_expr(index.index)?;
                self.emit_op(OpCode::GetIndex);
            }
            Expr::Call(call) => self.compile_call(call)?,
            Expr::FuncRef(func) => {
                let instruction = match self.scope.resolve(func.target.path, func.target.name.name) {
                    CallTarget::Far { path, name } => Instruction::FuncRef(Some(path), name),
                    CallTarget::Local(name) | CallTarget::Builtin(name) => Instruction::FuncRef(None, name),
                };
                self.emit(instruction);
            }
            Expr::Unary(unary) => {
                self.compile_expr(unary.operand)?;
                self.emit_op(match unary.op {
                    UnaryOp::Neg => OpCode::Neg,
                    UnaryOp::Not => OpCode::Not,
                });
            }
            Expr::Binary(binary) => match binary_opcode(binary.op) {
                Some(opcode) => {
                    self.compile_expr(binary.left)?;
                    self.compile_expr(binary.right)?;
                    self.emit_op(opcode);
                }
                None => self.compile_logical(binary.op, binary.left, binary.right)?,
            },
            Expr::Assign(assign) => {
                self.compile_assign(assign)?;
                self.compile_expr(assign.target)?;
            }
            Expr::Postfix(postfix) => {
                self.compile_expr(postfix.operand)?;
                self.compile_store(postfix.operand, Some(postfix_opcode(postfix.op)), Rhs::One)?;
            }
        }
        Ok(())
    }

    /// `a && b` / `a || b` with short-circuit evaluation, producing a bool.
    fn compile_logical(&mut self, op: BinaryOp, left: &'ast Expr<'ast>, right: &'ast Expr<'ast>) -> Result<()> {
        let short = self.new_label();
        let end = self.new_label();
        let (jump, short_value, fallthrough_value) = if op == BinaryOp::LogicalAnd {
            (OpCode::JumpIfFalse, OpCode::PushFalse, OpCode::PushTrue)
        } else {
            (OpCode::JumpIfTrue, OpCode::PushTrue, OpCode::PushFalse)
        };

        self.compile_expr(left)?;
        self.emit(Instruction::Jump(jump, short));
        self.compile_expr(right)?;
        self.emit(Instruction::Jump(jump, short));
        self.emit_op(fallthrough_value);
        self.emit(Instruction::Jump(OpCode::Jump, end));
        self.mark(short);
        self.emit_op(short_value);
        self.mark(end);
        Ok(())
    }

    fn compile_call(&mut self, call: &CallExpr<'ast>) -> Result<()> {
        let target = self.scope.resolve(call.target.path, call.target.name.name);
        if call.args.len() > MAX_ARGUMENTS {
            return Err(CompileError::TooManyArguments {
                name: target.to_string(),
                limit: MAX_ARGUMENTS,
                span: call.span,
            });
        }

        let mut flags = CallFlags::empty();
        if let Some(caller) = call.caller {
            self.compile_expr(caller)?;
            flags |= CallFlags::METHOD;
        }
        if call.threaded {
            flags |= CallFlags::THREAD;
        }
        for arg in call.args {
            self.compile_expr(arg)?;
        }

        self.emit(Instruction::Call {
            target,
            argc: call.args.len() as u8,
            flags,
        });
        Ok(())
    }

    fn compile_assign(&mut self, assign: &AssignExpr<'ast>) -> Result<()> {
        let op = assign.op.binary_op().and_then(binary_opcode);
        self.compile_store(assign.target, op, Rhs::Expr(assign.value))
    }

    /// Store `rhs` (or `target op rhs` for compound forms) into `target`.
    fn compile_store(
        &mut self,
        target: &'ast Expr<'ast>,
        op: Option<OpCode>,
        rhs: Rhs<'ast>,
    ) -> Result<()> {
        match target {
            Expr::Ident(ident) => {
                let slot = match op {
                    None => {
                        self.compile_rhs(rhs)?;
                        self.declare(ident)?
                    }
                    Some(op) => {
                        let slot = self.lookup(ident)?;
                        self.emit(Instruction::GetLocal(slot));
                        self.compile_rhs(rhs)?;
                        self.emit_op(op);
                        slot
                    }
                };
                self.emit(Instruction::SetLocal(slot));
            }
            Expr::Field(field) => {
                self.compile_expr(field.object)?;
                if let Some(op) = op {
                    self.compile_expr(field.object)?;
                    self.emit(Instruction::GetField(field.field.name.to_string()));
                    self.compile_rhs(rhs)?;
                    self.emit_op(op);
                } else {
                    self.compile_rhs(rhs)?;
                }
                self.emit(Instruction::SetField(field.field.name.to_string()));
            }
            Expr::Index(index) => {
                self.compile_expr(index.object)?;
                self.compile_expr(index.index)?;
                if let Some(op) = op {
                    self.compile_expr(index.object)?;
                    self.compile_expr(index.index)?;
                    self.emit_op(OpCode::GetIndex);
                    self.compile_rhs(rhs)?;
                    self.emit_op(op);
                } else {
                    self.compile_rhs(rhs)?;
                }
                self.emit_op(OpCode::SetIndex);
            }
            other => return Err(CompileError::InvalidAssignTarget { span: other.span() }),
        }
        Ok(())
    }

    fn compile_rhs(&mut self, rhs: Rhs<'ast>) -> Result<()> {
        match rhs {
            Rhs::Expr(expr) => self.compile_expr(expr),
            Rhs::One => {
                self.emit(Instruction::PushInt(1));
                Ok(())
            }
        }
    }
}

fn postfix_opcode(op: PostfixOp) -> OpCode {
    match op {
        PostfixOp::Inc => OpCode::Add,
        PostfixOp::Dec => OpCode::Sub,
    }
}

/// The opcode of a strict binary operator. `&&` and `||` have none; they
/// are lowered to jumps.
fn binary_opcode(op: BinaryOp) -> Option<OpCode> {
    Some(match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Mod => OpCode::Mod,
        BinaryOp::Equal => OpCode::Equal,
        BinaryOp::NotEqual => OpCode::NotEqual,
        BinaryOp::Less => OpCode::Less,
        BinaryOp::LessEqual => OpCode::LessEqual,
        BinaryOp::Greater => OpCode::Greater,
        BinaryOp::GreaterEqual => OpCode::GreaterEqual,
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr => return None,
    })
}
