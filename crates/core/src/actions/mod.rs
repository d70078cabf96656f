//! The units the passes operate on. Building turns each statement into an
//! [`Action`]; `validate` sizes it and records labels, `generate` emits its bytes.

mod control;
mod data;
mod flow;
mod instruction;
mod macros;

pub(crate) use self::control::{
    ChangeSegment, CreateSegment, DeclareLabel, IncludeBinary, IncludeSource, ModeRegister,
    SetGlobal, SetGlobalAll, SetOrigin, SetWidth,
};
pub(crate) use self::data::{Data, DataWidth, Fill};
pub(crate) use self::flow::{Flow, FlowFrame, is_flow_keyword};
pub(crate) use self::instruction::Instruction;
pub(crate) use self::macros::{CallMacro, CompilerArm, CompilerIf, VaLoop};

use crate::ast::Location;
use crate::builder::Context;
use crate::error::AsmResult;

#[derive(Debug, Clone)]
pub(crate) enum Action {
    CreateSegment(CreateSegment),
    ChangeSegment(ChangeSegment),
    SetOrigin(SetOrigin),
    SetWidth(SetWidth),
    Label(DeclareLabel),
    Instruction(Instruction),
    Data(Data),
    Fill(Fill),
    IncludeBinary(IncludeBinary),
    Include(IncludeSource),
    SetGlobal(SetGlobal),
    SetGlobalAll(SetGlobalAll),
    Flow(Flow),
    CallMacro(CallMacro),
    CompilerIf(CompilerIf),
    VaLoop(VaLoop),
}

impl Action {
    /// Number of bytes the action will emit.
    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        match self {
            Self::CreateSegment(action) => action.validate(ctx),
            Self::ChangeSegment(action) => action.validate(ctx),
            Self::SetOrigin(action) => action.validate(ctx),
            Self::SetWidth(action) => {
                action.apply(ctx);
                Ok(0)
            }
            Self::Label(action) => action.validate(ctx),
            Self::Instruction(action) => action.validate(ctx),
            Self::Data(action) => action.validate(ctx),
            Self::Fill(action) => action.validate(ctx),
            Self::IncludeBinary(action) => action.validate(ctx),
            Self::Include(_) => Ok(0),
            Self::SetGlobal(action) => {
                ctx.set_global(&action.name, &action.location)?;
                Ok(0)
            }
            Self::SetGlobalAll(action) => action.validate(ctx),
            Self::Flow(action) => action.validate(ctx),
            Self::CallMacro(action) => action.validate(ctx),
            Self::CompilerIf(action) => action.validate(ctx),
            Self::VaLoop(action) => action.validate(ctx),
        }
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        match self {
            Self::CreateSegment(action) => action.generate(ctx),
            Self::ChangeSegment(action) => action.generate(ctx),
            Self::SetOrigin(action) => action.generate(ctx),
            Self::SetWidth(action) => {
                action.apply(ctx);
                Ok(Vec::new())
            }
            Self::Label(action) => action.generate(ctx),
            Self::Instruction(action) => action.generate(ctx),
            Self::Data(action) => action.generate(ctx),
            Self::Fill(action) => action.generate(ctx),
            Self::IncludeBinary(action) => action.generate(ctx),
            Self::Include(action) => action.generate(ctx),
            Self::SetGlobal(_) | Self::SetGlobalAll(_) => Ok(Vec::new()),
            Self::Flow(action) => action.generate(ctx),
            Self::CallMacro(action) => action.generate(ctx),
            Self::CompilerIf(action) => action.generate(ctx),
            Self::VaLoop(action) => action.generate(ctx),
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Self::CreateSegment(action) => &action.location,
            Self::ChangeSegment(action) => &action.location,
            Self::SetOrigin(action) => &action.location,
            Self::SetWidth(action) => &action.location,
            Self::Label(action) => &action.location,
            Self::Instruction(action) => &action.location,
            Self::Data(action) => &action.location,
            Self::Fill(action) => &action.location,
            Self::IncludeBinary(action) => &action.location,
            Self::Include(action) => &action.location,
            Self::SetGlobal(action) => &action.location,
            Self::SetGlobalAll(action) => &action.location,
            Self::Flow(action) => &action.location,
            Self::CallMacro(action) => &action.location,
            Self::CompilerIf(action) => &action.location,
            Self::VaLoop(action) => &action.location,
        }
    }
}
