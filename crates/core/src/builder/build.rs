use std::mem;

use c816_assets::locate;
use c816_eval::Expr;
use tracing::debug;

use super::Context;
use crate::actions::{
    Action, CallMacro, ChangeSegment, CompilerArm, CompilerIf, CreateSegment, Data, DataWidth,
    DeclareLabel, Fill, Flow, IncludeBinary, IncludeSource, Instruction, ModeRegister, SetGlobal,
    SetGlobalAll, SetOrigin, SetWidth, VaLoop, is_flow_keyword,
};
use crate::ast::{Equate, IncludeSite, Line, Location, Statement};
use crate::error::{AsmErrorKind, AsmResult};
use crate::parser::parse;
use crate::span::Spanned;

#[derive(Debug, Clone)]
pub(crate) struct MacroDefinition {
    pub params: Vec<String>,
    pub varargs: bool,
    pub body: Vec<Action>,
}

/// A block whose actions are collected instead of appended to the program.
#[derive(Debug)]
pub(crate) enum Capture {
    Macro {
        name: String,
        actions: Vec<Action>,
        location: Location,
    },
    CompilerIf {
        arms: Vec<CompilerArm>,
        current: CompilerArm,
        location: Location,
    },
    VaLoop {
        actions: Vec<Action>,
        location: Location,
    },
}

impl Capture {
    fn name(&self) -> &'static str {
        match self {
            Self::Macro { .. } => "MACRO",
            Self::CompilerIf { .. } => "IF",
            Self::VaLoop { .. } => "VALOOP",
        }
    }

    fn location(&self) -> &Location {
        match self {
            Self::Macro { location, .. }
            | Self::CompilerIf { location, .. }
            | Self::VaLoop { location, .. } => location,
        }
    }

    fn actions_mut(&mut self) -> &mut Vec<Action> {
        match self {
            Self::Macro { actions, .. } | Self::VaLoop { actions, .. } => actions,
            Self::CompilerIf { current, .. } => &mut current.actions,
        }
    }
}

fn unfinished(capture: &Capture) -> AsmErrorKind {
    AsmErrorKind::Macro {
        message: format!("unfinished {}", capture.name()),
    }
}

fn unexpected_end() -> AsmErrorKind {
    AsmErrorKind::Macro {
        message: "unexpected end block".to_string(),
    }
}

fn parameter_count(message: impl Into<String>) -> AsmErrorKind {
    AsmErrorKind::IncorrectParameterCount {
        message: message.into(),
    }
}

fn invalid_parameter(message: impl Into<String>) -> AsmErrorKind {
    AsmErrorKind::InvalidParameter {
        message: message.into(),
    }
}

fn no_operands(operands: &[Expr], message: String, location: &Location) -> AsmResult<()> {
    if operands.is_empty() {
        Ok(())
    } else {
        Err(parameter_count(message).at(location))
    }
}

fn single(operands: Vec<Expr>, message: String, location: &Location) -> AsmResult<Expr> {
    let [operand] = <[Expr; 1]>::try_from(operands)
        .map_err(|_| parameter_count(message).at(location))?;
    Ok(operand)
}

fn file_name(directive: &str, operands: Vec<Expr>, location: &Location) -> AsmResult<String> {
    let operand = single(
        operands,
        format!("incorrect number of arguments to {directive}"),
        location,
    )?;
    match operand {
        Expr::Str { text, .. } => Ok(text),
        _ => Err(invalid_parameter(format!("file name required for {directive}")).at(location)),
    }
}

impl Context<'_> {
    /// Turns parsed lines into the program's action list.
    pub(crate) fn build(&mut self, lines: Vec<Line>) -> AsmResult<Vec<Action>> {
        for line in lines {
            self.build_line(line)?;
        }
        if let Some(capture) = self.captures.last() {
            return Err(unfinished(capture).at(capture.location()));
        }
        Ok(mem::take(&mut self.actions))
    }

    fn append(&mut self, action: Action) {
        match self.captures.last_mut() {
            Some(capture) => capture.actions_mut().push(action),
            None => self.actions.push(action),
        }
    }

    fn build_line(&mut self, line: Line) -> AsmResult<()> {
        let Line {
            label,
            equate,
            statements,
            location,
        } = line;

        if let Some(equate) = equate {
            return self.define_equate(equate, &location);
        }

        let defines_macro = statements.first().is_some_and(|statement| statement.is(".MACRO"));
        if let Some(label) = label.as_ref().filter(|_| !defines_macro) {
            self.declared_labels.insert(label.node.clone());
            self.append(Action::Label(DeclareLabel {
                name: label.node.clone(),
                location: Location {
                    span: label.span,
                    ..location.clone()
                },
            }));
        }

        for statement in statements {
            let location = Location {
                span: statement.span,
                ..location.clone()
            };
            self.build_statement(label.as_ref(), statement, location)?;
        }
        Ok(())
    }

    fn define_equate(&mut self, equate: Equate, location: &Location) -> AsmResult<()> {
        let Equate { name, mut expr } = equate;
        let location = Location {
            span: name.span,
            ..location.clone()
        };
        let name = name.node;

        if name.starts_with('@') {
            return Err(AsmErrorKind::InvalidName {
                message: "cannot use '@' for equates".to_string(),
            }
            .at(&location));
        }
        if self.declared_labels.contains(&name) {
            return Err(AsmErrorKind::InvalidName {
                message: "equate redefines label".to_string(),
            }
            .at(&location));
        }
        self.verify_label_available(&name, None, &location)?;

        self.bind_equates(&mut expr, None, &location)?;
        let value = expr.collapse().map_err(|source| {
            AsmErrorKind::EquateDefinition {
                name: name.clone(),
                source,
            }
            .at(&location)
        })?;
        debug!(%name, value = value.value, "defined equate");
        self.equates.insert(name, value);
        Ok(())
    }

    fn build_statement(
        &mut self,
        label: Option<&Spanned<String>>,
        statement: Statement,
        location: Location,
    ) -> AsmResult<()> {
        if statement.ellipsis && !statement.is(".MACRO") {
            return Err(AsmErrorKind::EllipsisNotValid.at(&location));
        }

        let name = statement.name.node.clone();
        if let Some(directive) = name.strip_prefix('.') {
            let directive = directive.to_ascii_uppercase();
            return self.build_directive(&directive, label, statement, location);
        }

        let action = if self.macros.contains_key(&name) {
            Action::CallMacro(CallMacro::new(name, statement.operands, location))
        } else if is_flow_keyword(&name) {
            Action::Flow(Flow::build(&name, statement.operands, location)?)
        } else {
            Action::Instruction(Instruction::new(name, statement.operands, location))
        };
        self.append(action);
        Ok(())
    }

    fn build_directive(
        &mut self,
        directive: &str,
        label: Option<&Spanned<String>>,
        statement: Statement,
        location: Location,
    ) -> AsmResult<()> {
        let ellipsis = statement.ellipsis;
        let operands = statement.operands;

        match directive {
            "A8" | "A16" | "I8" | "I16" => {
                no_operands(&operands, format!("extra parameters to {directive}"), &location)?;
                let register = if directive.starts_with('A') {
                    ModeRegister::Accumulator
                } else {
                    ModeRegister::Index
                };
                let wide = directive.ends_with("16");
                self.append(Action::SetWidth(SetWidth {
                    register,
                    wide,
                    location,
                }));
            }
            "DB" | "DW" | "DL" => {
                if operands.is_empty() {
                    return Err(parameter_count(format!("empty {directive}")).at(&location));
                }
                let width = match directive {
                    "DB" => DataWidth::Byte,
                    "DW" => DataWidth::Word,
                    _ => DataWidth::Long,
                };
                self.append(Action::Data(Data::new(width, operands, location)));
            }
            "FILL" | "FILLW" => {
                let [count, value] = <[Expr; 2]>::try_from(operands).map_err(|_| {
                    parameter_count(format!("incorrect number of arguments to {directive}"))
                        .at(&location)
                })?;
                let word = directive == "FILLW";
                self.append(Action::Fill(Fill::new(word, count, value, location)));
            }
            "GLOBAL" => self.declare_globals(operands, location)?,
            "GLOBALALL" => {
                no_operands(
                    &operands,
                    "invalid number of arguments to GLOBALALL".to_string(),
                    &location,
                )?;
                self.append(Action::SetGlobalAll(SetGlobalAll { location }));
            }
            "INCBIN" => {
                let path = file_name(directive, operands, &location)?;
                self.append(Action::IncludeBinary(IncludeBinary::new(path, location)));
            }
            "INCLUDE" => self.include(operands, location)?,
            "MACRO" => self.begin_macro(label, ellipsis, operands, location)?,
            "ENDMACRO" => self.end_macro(operands, location)?,
            "ORG" => {
                let operand = single(
                    operands,
                    "invalid number of arguments to ORG".to_string(),
                    &location,
                )?;
                self.append(Action::SetOrigin(SetOrigin::new(operand, location)));
            }
            "SEGMENT" => {
                let segment = self.create_segment(operands, &location)?;
                self.append(Action::CreateSegment(segment));
            }
            "IF" => {
                let condition = single(
                    operands,
                    "expected only 1 parameter to IF".to_string(),
                    &location,
                )?;
                self.captures.push(Capture::CompilerIf {
                    arms: Vec::new(),
                    current: CompilerArm::new(Some(condition), location.clone()),
                    location,
                });
            }
            "ELIF" => {
                let condition = single(
                    operands,
                    "expected only 1 parameter to ELIF".to_string(),
                    &location,
                )?;
                self.next_arm(Some(condition), location)?;
            }
            "ELSE" => {
                no_operands(&operands, "extra arguments to ELSE".to_string(), &location)?;
                self.next_arm(None, location)?;
            }
            "ENDIF" => {
                no_operands(&operands, "extra parameters to ENDIF".to_string(), &location)?;
                match self.captures.pop() {
                    Some(Capture::CompilerIf {
                        mut arms,
                        current,
                        location: opened,
                    }) => {
                        arms.push(current);
                        self.append(Action::CompilerIf(CompilerIf::new(arms, opened)));
                    }
                    Some(other) => return Err(unfinished(&other).at(&location)),
                    None => return Err(unexpected_end().at(&location)),
                }
            }
            "VALOOP" => {
                no_operands(&operands, "extra parameter to VALOOP".to_string(), &location)?;
                self.captures.push(Capture::VaLoop {
                    actions: Vec::new(),
                    location,
                });
            }
            "ENDVALOOP" => {
                no_operands(&operands, "extra parameters to ENDVALOOP".to_string(), &location)?;
                match self.captures.pop() {
                    Some(Capture::VaLoop {
                        actions,
                        location: opened,
                    }) => self.append(Action::VaLoop(VaLoop::new(actions, opened))),
                    Some(other) => return Err(unfinished(&other).at(&location)),
                    None => return Err(unexpected_end().at(&location)),
                }
            }
            _ => {
                no_operands(
                    &operands,
                    format!("extra parameters to segment change '{directive}'"),
                    &location,
                )?;
                self.append(Action::ChangeSegment(ChangeSegment {
                    name: directive.to_string(),
                    location,
                }));
            }
        }
        Ok(())
    }

    fn declare_globals(&mut self, operands: Vec<Expr>, location: Location) -> AsmResult<()> {
        if operands.is_empty() {
            return Err(parameter_count("invalid number of arguments to GLOBAL").at(&location));
        }
        for (index, operand) in operands.iter().enumerate() {
            let Expr::Name(name) = operand else {
                return Err(invalid_parameter(format!("argument {} isn't a label", index + 1))
                    .at(&location));
            };
            if self.declared_globals.contains(&name.ident) {
                return Err(AsmErrorKind::GlobalRedefinition {
                    position: index + 1,
                }
                .at(&location));
            }
            if name.ident.starts_with('@') {
                return Err(AsmErrorKind::InvalidGlobal {
                    name: name.ident.clone(),
                }
                .at(&location));
            }
            self.declared_globals.insert(name.ident.clone());
            self.append(Action::SetGlobal(SetGlobal {
                name: name.ident.clone(),
                location: location.clone(),
            }));
        }
        Ok(())
    }

    fn create_segment(&self, operands: Vec<Expr>, location: &Location) -> AsmResult<CreateSegment> {
        let [name, start, size, file_offset] = <[Expr; 4]>::try_from(operands)
            .map_err(|_| parameter_count("incorrect number of arguments for SEGMENT").at(location))?;
        let Expr::Str { text: name, .. } = name else {
            return Err(invalid_parameter("parameter 1 to SEGMENT is invalid").at(location));
        };

        let mut values = [0; 3];
        for (index, mut expr) in [start, size, file_offset].into_iter().enumerate() {
            self.bind_equates(&mut expr, None, location)?;
            values[index] = expr
                .collapse()
                .map_err(|_| {
                    invalid_parameter(format!("parameter {} to SEGMENT is invalid", index + 2))
                        .at(location)
                })?
                .value;
        }
        let [start, size, file_offset] = values;
        Ok(CreateSegment {
            name,
            start,
            size,
            file_offset,
            location: location.clone(),
        })
    }

    fn include(&mut self, operands: Vec<Expr>, location: Location) -> AsmResult<()> {
        let path = file_name("INCLUDE", operands, &location)?;
        let located = locate(self.fs, &path, self.include_dirs)
            .map_err(|source| AsmErrorKind::asset(&path, source).at(&location))?;
        let file = located.path.display().to_string();
        let text = located
            .into_text()
            .map_err(|source| AsmErrorKind::asset(&path, source).at(&location))?;

        let recursive = location.file == file
            || location.included_from.iter().any(|site| site.file == file);
        if recursive {
            return Err(invalid_parameter(format!("'{file}' includes itself")).at(&location));
        }

        let source_id = self.sources.add_source(file.clone(), text.clone());
        let mut included_from = location.included_from.clone();
        included_from.push(IncludeSite {
            file: location.file.clone(),
            line: location.line,
        });
        let parsed = parse(source_id, &file, &text, &included_from).map_err(|diagnostics| {
            AsmErrorKind::IncludedSyntax {
                file: file.clone(),
                diagnostics,
            }
            .at(&location)
        })?;
        debug!(%file, lines = parsed.lines.len(), "included source");

        self.warnings.extend(parsed.warnings);
        self.append(Action::Include(IncludeSource::new(path, location)));
        for line in parsed.lines {
            self.build_line(line)?;
        }
        Ok(())
    }

    fn begin_macro(
        &mut self,
        label: Option<&Spanned<String>>,
        varargs: bool,
        operands: Vec<Expr>,
        location: Location,
    ) -> AsmResult<()> {
        let Some(label) = label else {
            return Err(AsmErrorKind::MissingMacroLabel.at(&location));
        };
        let params = operands
            .iter()
            .map(|operand| match operand {
                Expr::Name(name) => Ok(name.ident.clone()),
                _ => Err(invalid_parameter("all arguments to MACRO must be names").at(&location)),
            })
            .collect::<AsmResult<Vec<_>>>()?;

        let name = label.node.clone();
        self.verify_label_available(&name, None, &location)?;
        if !self.captures.is_empty() {
            return Err(AsmErrorKind::Macro {
                message: "cannot declare a macro here".to_string(),
            }
            .at(&location));
        }

        self.macros.insert(
            name.clone(),
            MacroDefinition {
                params,
                varargs,
                body: Vec::new(),
            },
        );
        self.captures.push(Capture::Macro {
            name,
            actions: Vec::new(),
            location,
        });
        Ok(())
    }

    fn end_macro(&mut self, operands: Vec<Expr>, location: Location) -> AsmResult<()> {
        if !operands.is_empty() {
            return Err(AsmErrorKind::FeatureNotImplemented {
                message: "extra parameters to ENDMACRO".to_string(),
            }
            .at(&location));
        }
        match self.captures.pop() {
            Some(Capture::Macro { name, actions, .. }) => {
                debug!(%name, actions = actions.len(), "defined macro");
                if let Some(definition) = self.macros.get_mut(&name) {
                    definition.body = actions;
                }
                Ok(())
            }
            Some(other) => Err(unfinished(&other).at(&location)),
            None => Err(unexpected_end().at(&location)),
        }
    }

    fn next_arm(&mut self, condition: Option<Expr>, location: Location) -> AsmResult<()> {
        match self.captures.last_mut() {
            Some(Capture::CompilerIf { arms, current, .. }) if current.condition.is_some() => {
                let finished = mem::replace(current, CompilerArm::new(condition, location));
                arms.push(finished);
                Ok(())
            }
            Some(Capture::CompilerIf { .. }) => Err(AsmErrorKind::Macro {
                message: "unfinished ELSE".to_string(),
            }
            .at(&location)),
            Some(other) => Err(unfinished(other).at(&location)),
            None => Err(unexpected_end().at(&location)),
        }
    }
}
