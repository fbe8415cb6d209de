use colored::*;

use super::runtime_error::RuntimeError;

pub enum Source {
    Literal,
    File(String),
}

/// The program text a driver ran, used to quote the faulting line.
pub struct Input {
    pub source: Source,
    pub content: String,
}

fn format_input(out: &mut String, input: &Input, line: usize, col: i64) {
    out.push_str(&format!(
        "\nin {}, at line {}, column {}:",
        match &input.source {
            Source::Literal => "<command-line input>",
            Source::File(filename) => filename,
        },
        line,
        col
    ));
    let text = line
        .checked_sub(1)
        .and_then(|idx| input.content.lines().nth(idx));
    if let Some(text) = text {
        out.push_str(&format!("\n{}\n", text));
        out.push_str(&format!("{:~<1$}", "".blue().bold(), col.max(0) as usize));
        out.push_str(&format!("{}", "^".blue().bold()));
    }
}

/// Renders a fault for the user: the message, its position (quoting the
/// source line when `input` is given) and the backtrace.
pub fn format_runtime_error(err: &RuntimeError, input: Option<&Input>, backtrace: &str) -> String {
    let mut out = format!(
        "{}: {}",
        "runtime error".red().bold(),
        err.to_string().white().bold()
    );

    if let Some(token) = err.token() {
        match input {
            Some(input) => format_input(&mut out, input, token.line, token.col),
            None => out.push_str(&format!("\n[line {}] at '{}'", token.line, token.lexeme)),
        }
    }

    if !backtrace.is_empty() {
        out.push_str("\n\n");
        out.push_str(backtrace);
    }
    out
}

pub fn report_runtime_error(err: &RuntimeError, input: Option<&Input>, backtrace: &str) {
    eprintln!("{}", format_runtime_error(err, input, backtrace));
}
