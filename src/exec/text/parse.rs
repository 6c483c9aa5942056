// src/exec/text/parse.rs

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Print(String),
    Set { var: String, value: String },
    Unset(String),
    Incr(String),
    Event { name: String, pattern: String },
    Unevent(String),
    DoEvents,
    Delay { amount: String, until: Option<String> },
    Yield,
    Goto(String),
    IfSet { var: String, label: String },
    Run { script: String, args: Vec<String> },
    Stop(Option<String>),
    Pause(Option<String>),
    Return(Vec<String>),
    Error(String),
}

/// Parsed step script: instructions plus label targets.
#[derive(Debug, Clone, Default)]
pub struct Program {
    instrs: Vec<Instr>,
    lines: Vec<usize>,
    labels: HashMap<String, usize>,
}

impl Program {
    pub fn get(&self, pc: usize) -> Option<&Instr> {
        self.instrs.get(pc)
    }

    /// Source line of the instruction at `pc`, 1-based.
    pub fn line_of(&self, pc: usize) -> usize {
        self.lines.get(pc).copied().unwrap_or(0)
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let mut program = Program::default();
    let mut jumps: Vec<(usize, String)> = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let err = |message: String| ParseError { line, message };

        if let Some(label) = text.strip_prefix(':') {
            let label = label.trim();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(err(format!("bad label '{label}'")));
            }
            if program.labels.insert(label.to_string(), program.instrs.len()).is_some() {
                return Err(err(format!("duplicate label '{label}'")));
            }
            continue;
        }

        let (keyword, rest) = match text.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (text, ""),
        };
        let words: Vec<String> = rest.split_whitespace().map(str::to_string).collect();

        let instr = match keyword.to_lowercase().as_str() {
            "print" => Instr::Print(rest.to_string()),
            "set" => {
                let (var, value) = rest
                    .split_once(char::is_whitespace)
                    .map(|(v, val)| (v, val.trim()))
                    .unwrap_or((rest, ""));
                if var.is_empty() {
                    return Err(err("set needs a variable name".to_string()));
                }
                Instr::Set {
                    var: var.to_string(),
                    value: value.to_string(),
                }
            }
            "unset" => Instr::Unset(one_word(&words, "unset").map_err(err)?),
            "incr" => Instr::Incr(one_word(&words, "incr").map_err(err)?),
            "event" => {
                let (name, pattern) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| err("event needs a name and a pattern".to_string()))?;
                Instr::Event {
                    name: name.to_string(),
                    pattern: pattern.trim().to_string(),
                }
            }
            "unevent" => Instr::Unevent(one_word(&words, "unevent").map_err(err)?),
            "doevents" => Instr::DoEvents,
            "delay" => match words.as_slice() {
                [amount] => Instr::Delay {
                    amount: amount.clone(),
                    until: None,
                },
                [amount, kw, var] if kw.eq_ignore_ascii_case("until") => Instr::Delay {
                    amount: amount.clone(),
                    until: Some(var.clone()),
                },
                _ => return Err(err("usage: delay <duration> [until <var>]".to_string())),
            },
            "yield" => Instr::Yield,
            "goto" => {
                let label = one_word(&words, "goto").map_err(err)?;
                jumps.push((line, label.clone()));
                Instr::Goto(label)
            }
            "ifset" => match words.as_slice() {
                [var, label] => {
                    jumps.push((line, label.clone()));
                    Instr::IfSet {
                        var: var.clone(),
                        label: label.clone(),
                    }
                }
                _ => return Err(err("usage: ifset <var> <label>".to_string())),
            },
            "run" => {
                let Some((script, args)) = words.split_first() else {
                    return Err(err("run needs a script".to_string()));
                };
                Instr::Run {
                    script: script.clone(),
                    args: args.to_vec(),
                }
            }
            "stop" => Instr::Stop(words.first().cloned()),
            "pause" => Instr::Pause(words.first().cloned()),
            "return" => Instr::Return(words),
            "error" => Instr::Error(rest.to_string()),
            other => return Err(err(format!("unknown instruction '{other}'"))),
        };

        program.instrs.push(instr);
        program.lines.push(line);
    }

    for (line, label) in jumps {
        if !program.labels.contains_key(&label) {
            return Err(ParseError {
                line,
                message: format!("unknown label '{label}'"),
            });
        }
    }

    Ok(program)
}

fn one_word(words: &[String], keyword: &str) -> Result<String, String> {
    match words {
        [word] => Ok(word.clone()),
        _ => Err(format!("{keyword} takes exactly one argument")),
    }
}
