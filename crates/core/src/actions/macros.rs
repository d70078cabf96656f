//! Actions that expand into copies of captured bodies: macro calls, `.IF` arms and
//! `.VALOOP` rounds. Each keeps its expansion so generate walks exactly what
//! validate sized.

use c816_eval::{Expr, Number};
use tracing::{debug, trace};

use super::Action;
use crate::ast::Location;
use crate::builder::{Context, MacroFrame};
use crate::error::{AsmErrorKind, AsmResult};

fn validate_all(ctx: &mut Context<'_>, actions: &mut [Action]) -> AsmResult<()> {
    for action in actions {
        ctx.validate_one(action)?;
    }
    Ok(())
}

fn generate_all(ctx: &mut Context<'_>, actions: &mut [Action]) -> AsmResult<Vec<u8>> {
    for action in actions {
        ctx.generate_one(action)?;
    }
    Ok(Vec::new())
}

#[derive(Debug, Clone)]
pub(crate) struct CallMacro {
    name: String,
    operands: Vec<Expr>,
    pub location: Location,
    expansion: Vec<Action>,
}

impl CallMacro {
    pub fn new(name: String, operands: Vec<Expr>, location: Location) -> Self {
        Self {
            name,
            operands,
            location,
            expansion: Vec::new(),
        }
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        let definition = ctx.macro_definition(&self.name).cloned().ok_or_else(|| {
            AsmErrorKind::Macro {
                message: format!("undefined macro '{}'", self.name),
            }
            .at(&self.location)
        })?;

        let count = self.operands.len();
        let params = definition.params.len();
        let arity_ok = if definition.varargs {
            count >= params
        } else {
            count == params
        };
        if !arity_ok {
            return Err(AsmErrorKind::IncorrectParameterCount {
                message: format!("incorrect number of arguments for {}", self.name),
            }
            .at(&self.location));
        }
        if ctx.frames.iter().any(|frame| frame.name == self.name) {
            return Err(AsmErrorKind::MacroRecursion {
                name: self.name.clone(),
            }
            .at(&self.location));
        }

        // Arguments may name parameters of the macro this call sits in.
        let mut args = self.operands.clone();
        for arg in &mut args {
            ctx.bind_macro_arguments(arg, &self.location)?;
        }
        debug!(name = %self.name, args = args.len(), depth = ctx.frames.len(), "expanding macro");

        self.expansion = definition.body;
        ctx.frames.push(MacroFrame {
            name: self.name.clone(),
            params: definition.params,
            varargs: definition.varargs,
            args,
            valoop: None,
        });
        let result = validate_all(ctx, &mut self.expansion);
        ctx.frames.pop();
        result?;
        Ok(0)
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        ctx.list_left(&format!(";; {}", self.name));
        generate_all(ctx, &mut self.expansion)
    }
}

/// One arm of a `.IF`/`.ELIF`/`.ELSE` chain. The `.ELSE` arm has no condition.
#[derive(Debug, Clone)]
pub(crate) struct CompilerArm {
    pub condition: Option<Expr>,
    pub actions: Vec<Action>,
    location: Location,
}

impl CompilerArm {
    pub fn new(condition: Option<Expr>, location: Location) -> Self {
        Self {
            condition,
            actions: Vec::new(),
            location,
        }
    }

    /// Names nobody defined count as zero.
    fn holds(&self, ctx: &Context<'_>) -> AsmResult<bool> {
        let Some(condition) = &self.condition else {
            return Ok(true);
        };
        let mut condition = condition.clone();
        ctx.bind_macro_arguments(&mut condition, &self.location)?;
        ctx.bind_equates(&mut condition, Some(Number::decimal(0)), &self.location)?;
        let value = condition
            .eval()
            .map_err(|source| AsmErrorKind::Eval { source }.at(&self.location))?;
        Ok(value != 0)
    }
}

/// Compile-time `.IF`: only the first arm whose condition holds is assembled.
#[derive(Debug, Clone)]
pub(crate) struct CompilerIf {
    arms: Vec<CompilerArm>,
    pub location: Location,
    expansion: Vec<Action>,
}

impl CompilerIf {
    pub fn new(arms: Vec<CompilerArm>, location: Location) -> Self {
        Self {
            arms,
            location,
            expansion: Vec::new(),
        }
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        self.expansion.clear();
        for (index, arm) in self.arms.iter().enumerate() {
            if arm.holds(ctx)? {
                trace!(arm = index, "selected .IF arm");
                self.expansion = arm.actions.clone();
                break;
            }
        }
        validate_all(ctx, &mut self.expansion)?;
        Ok(0)
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        generate_all(ctx, &mut self.expansion)
    }
}

/// `.VALOOP` repeats its body once per variadic argument of the enclosing macro,
/// with `\i` and `\v` naming the round's index and value.
#[derive(Debug, Clone)]
pub(crate) struct VaLoop {
    body: Vec<Action>,
    pub location: Location,
    expansion: Vec<Action>,
}

impl VaLoop {
    pub fn new(body: Vec<Action>, location: Location) -> Self {
        Self {
            body,
            location,
            expansion: Vec::new(),
        }
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        let Some(frame) = ctx.frames.last() else {
            return Err(AsmErrorKind::VaLoopWithoutMacro.at(&self.location));
        };
        let count = frame.vararg_count();
        let previous = frame.valoop.clone();

        self.expansion.clear();
        let result = self.expand(ctx, count);
        if let Some(frame) = ctx.frames.last_mut() {
            frame.valoop = previous;
        }
        result?;
        Ok(0)
    }

    fn expand(&mut self, ctx: &mut Context<'_>, count: usize) -> AsmResult<()> {
        for index in 0..count {
            if let Some(frame) = ctx.frames.last_mut() {
                let value = frame.args[frame.params.len() + index].clone();
                frame.valoop = Some((index, value));
            }
            let mut round = self.body.clone();
            validate_all(ctx, &mut round)?;
            self.expansion.extend(round);
        }
        Ok(())
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        generate_all(ctx, &mut self.expansion)
    }
}
