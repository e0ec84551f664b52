//! Instantiate a prelude generator and evaluate operations on the result

use crate::error::{CliError, Result};
use crate::output::{write_output, OutputFormat};
use anyhow::{bail, Context};
use morphir_functor::{instantiate, Module, Prelude, Value};
use owo_colors::OwoColorize;
use serde::Serialize;
use starbase::AppResult;
use std::fmt;
use tracing::debug;

/// One argument of a `--call`.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(Value),
    /// `$n`: the result of the n-th call
    Result(usize),
}

/// A parsed `--call`: an operation name followed by its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub operation: String,
    pub arguments: Vec<Argument>,
}

/// Parse `create 3 4`, `contains $0 "pear"` and the like.
pub fn parse_call(source: &str) -> anyhow::Result<Call> {
    let mut words = split_words(source)?.into_iter();
    let Some(operation) = words.next() else {
        bail!("empty call");
    };
    let arguments = words
        .map(|word| parse_argument(&word).with_context(|| format!("in call `{source}`")))
        .collect::<anyhow::Result<_>>()?;
    Ok(Call {
        operation,
        arguments,
    })
}

fn split_words(source: &str) -> anyhow::Result<Vec<String>> {
    let mut words = Vec::new();
    let mut chars = source.trim().chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut word = String::new();
        if c == '"' {
            word.push(c);
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                word.push(c);
                if c == '"' {
                    closed = true;
                    break;
                }
            }
            if !closed {
                bail!("unterminated string in `{source}`");
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
        }
        words.push(word);
    }
    Ok(words)
}

fn parse_argument(word: &str) -> anyhow::Result<Argument> {
    if let Some(index) = word.strip_prefix('$') {
        let index = index
            .parse()
            .with_context(|| format!("`{word}` is not a result reference"))?;
        return Ok(Argument::Result(index));
    }
    if let Some(text) = word.strip_prefix('"').and_then(|w| w.strip_suffix('"')) {
        return Ok(Argument::Literal(Value::string(text)));
    }
    match word {
        "true" => Ok(Argument::Literal(Value::bool(true))),
        "false" => Ok(Argument::Literal(Value::bool(false))),
        "()" => Ok(Argument::Literal(Value::Unit)),
        _ => word
            .parse()
            .map(|i| Argument::Literal(Value::int(i)))
            .with_context(|| format!("cannot read `{word}` as an int, string, bool or `$n`")),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallReport {
    pub call: String,
    pub result: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstantiateReport {
    pub generator: String,
    pub input: String,
    pub module: String,
    pub id: u64,
    pub signature: String,
    pub calls: Vec<CallReport>,
}

impl fmt::Display for InstantiateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module {} : {}", self.module.bold(), self.signature)?;
        for (i, call) in self.calls.iter().enumerate() {
            write!(f, "\n${i} {} = {}", call.call, call.result.cyan())?;
        }
        Ok(())
    }
}

/// Instantiate `generator` on `input`, then evaluate `calls` in order.
pub fn instantiate_report(
    prelude: &Prelude,
    generator: &str,
    input: &str,
    calls: &[String],
) -> Result<InstantiateReport> {
    let functor = prelude
        .generator(generator)
        .ok_or_else(|| CliError::UnknownGenerator(generator.to_string()))?;
    let argument = prelude
        .module(input)
        .ok_or_else(|| CliError::UnknownModule(input.to_string()))?;

    let module = instantiate(functor, argument)?;
    let mut results: Vec<Value> = Vec::with_capacity(calls.len());
    let mut reports = Vec::with_capacity(calls.len());
    for source in calls {
        let value = evaluate(&module, source, &results)?;
        debug!(call = %source, result = %value, "evaluated");
        reports.push(CallReport {
            call: source.clone(),
            result: value.to_string(),
            value: value.to_json(),
        });
        results.push(value);
    }

    Ok(InstantiateReport {
        generator: generator.to_string(),
        input: input.to_string(),
        module: module.label().to_string(),
        id: module.id().get(),
        signature: module.signature().to_string(),
        calls: reports,
    })
}

fn evaluate(module: &Module, source: &str, results: &[Value]) -> Result<Value> {
    let call = parse_call(source)?;
    let mut args = Vec::with_capacity(call.arguments.len());
    for argument in call.arguments {
        match argument {
            Argument::Literal(value) => args.push(value),
            Argument::Result(index) => match results.get(index) {
                Some(value) => args.push(value.clone()),
                None => {
                    return Err(anyhow::anyhow!(
                        "`${index}` refers to a call that has not run yet"
                    )
                    .into());
                }
            },
        }
    }
    Ok(module.call(call.operation.as_str(), &args)?)
}

pub fn run_instantiate(
    prelude: &Prelude,
    generator: String,
    input: String,
    calls: Vec<String>,
    format: OutputFormat,
) -> AppResult {
    let report = instantiate_report(prelude, &generator, &input, &calls)?;
    write_output(format, &report)?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("create 3 4", "create", vec![Argument::Literal(Value::int(3)), Argument::Literal(Value::int(4))])]
    #[case("contains $0 -2", "contains", vec![Argument::Result(0), Argument::Literal(Value::int(-2))])]
    #[case("create \"apple pie\" \"pear\"", "create", vec![
        Argument::Literal(Value::string("apple pie")),
        Argument::Literal(Value::string("pear")),
    ])]
    #[case("  is_empty   $1 ", "is_empty", vec![Argument::Result(1)])]
    #[case("flag true ()", "flag", vec![Argument::Literal(Value::bool(true)), Argument::Literal(Value::Unit)])]
    fn test_parse_call(#[case] source: &str, #[case] operation: &str, #[case] arguments: Vec<Argument>) {
        let call = parse_call(source).unwrap();
        assert_eq!(call.operation, operation);
        assert_eq!(call.arguments, arguments);
    }

    #[rstest]
    #[case("")]
    #[case("create \"open")]
    #[case("create x")]
    #[case("create $a")]
    fn test_parse_call_rejects(#[case] source: &str) {
        assert!(parse_call(source).is_err());
    }
}
