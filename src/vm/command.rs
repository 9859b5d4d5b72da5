use std::io::{BufRead, Write};
use std::process::{Command, Stdio};
use std::time::Duration;

use chrono::{Datelike, Local, Timelike};

use crate::value::Value;

use super::{Vm, VmError, VmResult};

/// Key of the object form `{"raw": text}` that bypasses shell escaping.
const RAW_KEY: &str = "raw";

impl Vm {
    /// Pops `[verb, args...]` and executes the verb. The verb's result lands
    /// in the last-command-result slot.
    pub(crate) fn run_command(&mut self, line: i32) -> VmResult<()> {
        let mut items = self.stack.pop().into_array().into_iter();
        let verb = items.next().map(|v| v.to_string()).unwrap_or_default();
        let args: Vec<Value> = items.collect();
        let text = || args.iter().flat_map(Value::to_string_array).collect::<Vec<_>>().join(" ");

        let result = match verb.as_str() {
            "print" => {
                writeln!(std::io::stdout().lock(), "{}", text())?;
                Value::Null
            }
            "stdout" => {
                let mut out = std::io::stdout().lock();
                write!(out, "{}", text())?;
                out.flush()?;
                Value::Null
            }
            "stderr" => {
                let mut err = std::io::stderr().lock();
                write!(err, "{}", text())?;
                err.flush()?;
                Value::Null
            }
            "stdin" => read_line()?,
            "error" => {
                self.last_cmd_result = Value::Null;
                return Err(VmError::Raised(text()));
            }
            "time" | "systime" => {
                let now = Local::now();
                Value::from(now.num_seconds_from_midnight() as f64 + f64::from(now.nanosecond() % 1_000_000_000) / 1e9)
            }
            "sysdate" => {
                let today = Local::now();
                Value::Array(vec![
                    Value::from(today.day() as f64),
                    Value::from(today.month() as f64),
                    Value::from(today.year() as f64),
                ])
            }
            "sleep" => {
                let secs = args.first().map_or(0.0, Value::to_number);
                if secs.is_finite() && secs > 0.0 {
                    std::thread::sleep(Duration::try_from_secs_f64(secs).unwrap_or_default());
                }
                Value::Null
            }
            "clear" => {
                let mut out = std::io::stdout().lock();
                write!(out, "\x1b[2J\x1b[H")?;
                out.flush()?;
                Value::Null
            }
            "." => Value::Null,
            "!" | "?" | "?!" | "=" => {
                if self.sandboxed {
                    return Err(VmError::SandboxViolation { operation: format!("shell command '{verb}'") });
                }
                let command_line = shell_command_line(&args);
                self.shell(&verb, &command_line, line)?
            }
            _ => return Err(VmError::Raised(format!("Unknown command: {verb}"))),
        };

        self.last_cmd_result = result;
        Ok(())
    }

    fn shell(&mut self, verb: &str, command_line: &str, line: i32) -> VmResult<Value> {
        let mut cmd = shell_process(command_line);
        let result = match verb {
            "!" => Value::Bool(cmd.status()?.success()),
            "=" => match cmd.status()?.code() {
                Some(code) => Value::from(f64::from(code)),
                None => {
                    self.warn(format!("Command terminated by signal: {command_line}"), line);
                    Value::Null
                }
            },
            "?" => {
                let out = cmd.stderr(Stdio::inherit()).output()?;
                Value::String(trim_newline(String::from_utf8_lossy(&out.stdout).into_owned()))
            }
            _ => {
                let out = cmd.stdout(Stdio::null()).output()?;
                Value::String(trim_newline(String::from_utf8_lossy(&out.stderr).into_owned()))
            }
        };
        Ok(result)
    }
}

fn read_line() -> VmResult<Value> {
    let mut buf = String::new();
    if std::io::stdin().lock().read_line(&mut buf)? == 0 {
        return Ok(Value::Null);
    }
    Ok(Value::String(trim_newline(buf)))
}

fn trim_newline(mut s: String) -> String {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    s
}

#[cfg(not(windows))]
fn shell_process(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(windows)]
fn shell_process(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command_line);
    cmd
}

#[cfg(not(windows))]
pub(crate) fn shell_escape(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

#[cfg(windows)]
pub(crate) fn shell_escape(word: &str) -> String {
    format!("\"{}\"", word.replace('"', "\"\""))
}

/// Joins arguments into one command line, escaping every word except those
/// wrapped as `{"raw": text}`.
pub(crate) fn shell_command_line(args: &[Value]) -> String {
    let mut words = Vec::new();
    for arg in args {
        match arg {
            Value::Object(map) if map.len() == 1 && map.contains_key(RAW_KEY) => {
                words.push(map[RAW_KEY].to_string());
            }
            other => words.extend(other.to_string_array().iter().map(|w| shell_escape(w))),
        }
    }
    words.join(" ")
}
