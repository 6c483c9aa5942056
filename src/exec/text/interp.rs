// src/exec/text/interp.rs

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::parse_duration;
use crate::errors::ScriptFault;
use crate::events::{CapturedArgs, EventCallback};
use crate::exec::text::parse::{Instr, Program};
use crate::exec::{Script, ScriptContext, Step, Wait};
use crate::types::{Millis, Target};

type Vars = Rc<RefCell<HashMap<String, String>>>;

/// Interpreter for one step script instance. One instruction per step.
///
/// Variables are shared with the event callbacks and wait conditions the
/// script registers, so an event can set a variable that a `delay ... until`
/// is waiting on.
#[derive(Debug)]
pub struct StepScript {
    program: Rc<Program>,
    pc: usize,
    vars: Vars,
    seeded: bool,
}

impl StepScript {
    pub fn new(program: Program) -> Self {
        Self {
            program: Rc::new(program),
            pc: 0,
            vars: Rc::new(RefCell::new(HashMap::new())),
            seeded: false,
        }
    }

    fn seed_args(&mut self, cx: &ScriptContext<'_>) {
        let mut vars = self.vars.borrow_mut();
        vars.insert("0".to_string(), cx.name().to_string());
        for (idx, arg) in cx.args().iter().enumerate() {
            vars.insert((idx + 1).to_string(), arg.clone());
        }
        vars.insert("pid".to_string(), cx.pid().to_string());
        self.seeded = true;
    }

    fn interpolate(&self, text: &str) -> String {
        interpolate(&self.vars.borrow(), text)
    }

    fn jump(&mut self, label: &str, line: usize) -> Result<(), ScriptFault> {
        self.pc = self
            .program
            .label(label)
            .ok_or_else(|| ScriptFault::new(format!("unknown label '{label}'")).with_context(format!("line {line}")))?;
        Ok(())
    }
}

impl Script for StepScript {
    fn step(&mut self, cx: &mut ScriptContext<'_>) -> Result<Step, ScriptFault> {
        if !self.seeded {
            self.seed_args(cx);
        }

        let program = Rc::clone(&self.program);
        let pc = self.pc;
        let Some(instr) = program.get(pc) else {
            return Ok(Step::Done(Vec::new()));
        };
        let line = program.line_of(pc);
        let at_line = |fault: ScriptFault| fault.with_context(format!("line {line}"));
        self.pc += 1;

        match instr {
            Instr::Print(text) => {
                let text = self.interpolate(text);
                cx.print(text);
            }
            Instr::Set { var, value } => {
                let value = self.interpolate(value);
                self.vars.borrow_mut().insert(var.clone(), value);
            }
            Instr::Unset(var) => {
                self.vars.borrow_mut().remove(var);
            }
            Instr::Incr(var) => {
                let mut vars = self.vars.borrow_mut();
                let current = match vars.get(var) {
                    Some(v) => v.parse::<i64>().map_err(|_| {
                        at_line(ScriptFault::new(format!("'{var}' is not a number: {v}")))
                    })?,
                    None => 0,
                };
                vars.insert(var.clone(), (current + 1).to_string());
            }
            Instr::Event { name, pattern } => {
                let pattern = self.interpolate(pattern);
                let vars = Rc::clone(&self.vars);
                let counter = name.clone();
                let callback: EventCallback =
                    Box::new(move |args: &CapturedArgs, _cx: &mut ScriptContext<'_>| {
                        let mut vars = vars.borrow_mut();
                        for (key, value) in args.iter() {
                            vars.insert(key.to_string(), value.to_string());
                        }
                        let hits = vars
                            .get(&counter)
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(0);
                        vars.insert(counter.clone(), (hits + 1).to_string());
                        Ok(())
                    });
                if let Err(e) = cx.register_event(name, &pattern, callback) {
                    cx.print(format!("event '{name}' not registered: {e}"));
                }
            }
            Instr::Unevent(name) => {
                cx.unregister_event(name);
            }
            Instr::DoEvents => {
                cx.do_events();
            }
            Instr::Delay { amount, until } => {
                let amount = self.interpolate(amount);
                let delay_ms = parse_wait(&amount).map_err(|e| at_line(ScriptFault::new(e)))?;
                let wait = match until {
                    Some(var) => {
                        let vars = Rc::clone(&self.vars);
                        let var = var.clone();
                        Wait::until(delay_ms, move || vars.borrow().contains_key(&var))
                    }
                    None => Wait::millis(delay_ms),
                };
                return Ok(Step::Yield(wait));
            }
            Instr::Yield => return Ok(Step::Yield(Wait::tick())),
            Instr::Goto(label) => self.jump(label, line)?,
            Instr::IfSet { var, label } => {
                let is_set = self.vars.borrow().contains_key(var);
                if is_set {
                    self.jump(label, line)?;
                }
            }
            Instr::Run { script, args } => {
                let script = self.interpolate(script);
                let args = args.iter().map(|a| self.interpolate(a)).collect();
                cx.run(script, args);
            }
            Instr::Stop(target) => {
                let target = self.control_target(target.as_deref(), cx);
                cx.stop(target);
            }
            Instr::Pause(target) => {
                let target = self.control_target(target.as_deref(), cx);
                cx.pause(target);
            }
            Instr::Return(values) => {
                let values = values.iter().map(|v| self.interpolate(v)).collect();
                return Ok(Step::Done(values));
            }
            Instr::Error(message) => {
                return Err(at_line(ScriptFault::new(self.interpolate(message))));
            }
        }

        Ok(Step::Continue)
    }
}

impl StepScript {
    /// No argument means this thread; `all` means every thread.
    fn control_target(&self, raw: Option<&str>, cx: &ScriptContext<'_>) -> Target {
        match raw.map(|r| self.interpolate(r)) {
            None => Target::Pid(cx.pid()),
            Some(r) => r.parse().unwrap_or(Target::Pid(cx.pid())),
        }
    }
}

/// Bare numbers are milliseconds, otherwise `<n>ms|s|m|h`.
fn parse_wait(raw: &str) -> Result<Millis, String> {
    let duration = parse_duration(raw)?;
    Millis::try_from(duration.as_millis()).map_err(|_| format!("delay '{raw}' is too long"))
}

/// Expand `$name` and `${name}`; `$$` is a literal dollar. Unknown names
/// expand to nothing.
pub fn interpolate(vars: &HashMap<String, String>, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == '}' {
                        closed = true;
                        break;
                    }
                    name.push(ch);
                }
                if closed {
                    if let Some(value) = vars.get(&name) {
                        out.push_str(value);
                    }
                } else {
                    out.push_str("${");
                    out.push_str(&name);
                }
            }
            Some(ch) if ch.is_ascii_alphanumeric() || *ch == '_' => {
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(value) = vars.get(&name) {
                    out.push_str(value);
                }
            }
            _ => out.push('$'),
        }
    }

    out
}
