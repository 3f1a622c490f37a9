use std::{
    fmt::Display,
    fs::read_to_string,
    io::{self, BufRead, Read, Write},
    process::{Command, Stdio},
};

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use color_print::ceprintln;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cli::CommandLine;
use minat::config::Config;
use minat::minlang::{compiler, Diagnostic};

mod cli;

struct Program {
    name: String,
    source: String,
}

/// Everything printed for one program, collected off the main thread so
/// several files print in argument order.
#[derive(Default)]
struct Report {
    sections: Vec<(&'static str, String)>,
    diagnostics: Vec<String>,
    error: Option<String>,
    runnable: Option<String>,
}

fn dump<T: Serialize + Display>(items: &[T], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(items)?);
    }
    Ok(items.iter()
        .map(|item| item.to_string().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn rendered(diagnostics: &[Diagnostic], source: &str) -> Vec<String> {
    diagnostics.iter().map(|d| d.render(source)).collect()
}

fn process(program: &Program, args: &CommandLine, config: &Config) -> Result<Report> {
    let mut report = Report::default();
    let source = program.source.as_str();

    if args.shunt {
        match compiler::shunt(source) {
            Ok(shunted) => {
                report.sections.push(("shunting", dump(&shunted.entities, args.json)?));
                report.diagnostics = rendered(&shunted.diagnostics, source);
            }
            Err(e) => {
                report.error = Some(format!("syntax error: {}", e.render(source)));
                return Ok(report);
            }
        }
    }

    if args.tokenize {
        report.sections.push(("tokenizing", dump(&compiler::tokenize(source), args.json)?));
    }

    if args.ast {
        match compiler::ast(source) {
            Ok(built) => {
                report.sections.push(("ast", dump(&built.forest, args.json)?));
                report.diagnostics = rendered(&built.diagnostics, source);
            }
            Err(e) => {
                report.error = Some(format!("syntax error: {}", e.render(source)));
                return Ok(report);
            }
        }
    }

    if args.compile {
        match compiler::compile(source, &config.backend) {
            Ok(compiled) => {
                let text = if args.json {
                    serde_json::to_string_pretty(&compiled)?
                } else {
                    compiled.output.clone()
                };
                report.sections.push(("compiled", text));
                report.diagnostics = rendered(&compiled.diagnostics, source);
            }
            Err(e) => {
                report.error = Some(e.render(source));
                return Ok(report);
            }
        }
    }

    if args.run {
        let prelude = match read_to_string(&config.prelude) {
            Ok(prelude) => prelude,
            Err(e) => {
                warn!("prelude {} not loaded: {}", config.prelude.display(), e);
                String::new()
            }
        };
        let full = format!("{};\n{}", prelude, source);
        match compiler::compile(&full, &config.backend) {
            Ok(compiled) => {
                report.diagnostics = rendered(&compiled.diagnostics, &full);
                report.runnable = Some(compiled.output);
            }
            Err(e) => report.error = Some(e.render(&full)),
        }
    }

    Ok(report)
}

/// Reads up to and including the first `delimiter`, or to EOF when it is
/// empty or never shows up.
fn read_until_delimiter(mut reader: impl BufRead, delimiter: &str) -> Result<String> {
    let mut buf = vec![];
    match delimiter.as_bytes().last() {
        None => {
            reader.read_to_end(&mut buf)?;
        }
        Some(&last) => loop {
            if reader.read_until(last, &mut buf)? == 0 || buf.ends_with(delimiter.as_bytes()) {
                break;
            }
        },
    }
    Ok(String::from_utf8(buf)?)
}

fn read_programs(args: &CommandLine) -> Result<Vec<Program>> {
    if let Some(delimiter) = &args.stdin {
        let source = read_until_delimiter(io::stdin().lock(), delimiter.as_deref().unwrap_or(""))
            .context("Unable to read program from stdin.")?;
        return Ok(vec![Program { name: String::from("<stdin>"), source }]);
    }

    if let Some(code) = &args.execute {
        return Ok(vec![Program { name: String::from("-e"), source: code.clone() }]);
    }

    args.files.iter()
        .map(|path| {
            let source = read_to_string(path)
                .with_context(|| format!("Unable to read {}.", path.display()))?;
            Ok(Program { name: path.display().to_string(), source })
        })
        .collect()
}

fn run(compiled: &str, runtime: &str) -> Result<()> {
    let mut child = Command::new(runtime)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("Unable to start runtime `{}`.", runtime))?;
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(compiled.as_bytes()) {
            drop(stdin);
            child.kill().ok();
            child.wait().ok();
            return Err(e).with_context(|| format!("Unable to send program to `{}`.", runtime));
        }
    }
    let status = child.wait()?;
    if !status.success() {
        bail!("`{}` exited with {}", runtime, status);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = CommandLine::parse();
    if !args.has_program() && !args.has_stage() {
        CommandLine::command().print_help()?;
        return Ok(());
    }

    let config = Config::load_from_env()
        .with_overrides(args.backend.clone(), args.prelude.clone(), args.runtime.clone());
    debug!("{:?}", config);

    let programs = read_programs(&args)?;
    info!("processing {} program(s) with backend {}", programs.len(), config.backend);

    let reports = programs.par_iter()
        .map(|program| process(program, &args, &config))
        .collect::<Result<Vec<_>>>()?;

    let mut failed = 0;
    for (program, report) in programs.iter().zip(reports) {
        if programs.len() > 1 {
            println!("==> {} <==", program.name);
        }
        for (header, body) in &report.sections {
            println!("[{}]", header);
            println!("{}", body);
        }
        for diagnostic in &report.diagnostics {
            ceprintln!("<yellow>warning</yellow>: {}: {}", program.name, diagnostic);
        }
        if let Some(error) = &report.error {
            ceprintln!("<red>error</red>: {}: {}", program.name, error);
            failed += 1;
            continue;
        }
        if let Some(compiled) = &report.runnable {
            run(compiled, &config.runtime)?;
        }
    }

    if failed > 0 {
        bail!("{} program(s) failed to compile", failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn stdin_stops_at_first_delimiter() {
        let input = Cursor::new("x := 1;\nEND\ny := 2;\nEND\n");
        assert_eq!(read_until_delimiter(input, "END").unwrap(), "x := 1;\nEND");
    }

    #[test]
    fn stdin_delimiter_split_across_reads() {
        // `D` appears early on its own, the full delimiter only later.
        let input = Cursor::new("aD bD ENDD rest");
        assert_eq!(read_until_delimiter(input, "ENDD").unwrap(), "aD bD ENDD");
    }

    #[test]
    fn stdin_without_delimiter_reads_everything() {
        assert_eq!(read_until_delimiter(Cursor::new("1\n2\n"), "").unwrap(), "1\n2\n");
        assert_eq!(read_until_delimiter(Cursor::new("1\n2\n"), "END").unwrap(), "1\n2\n");
    }
}
