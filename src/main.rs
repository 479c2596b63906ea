use std::{
    backtrace::BacktraceStatus,
    error::Error,
    io::Write,
    ops::Range,
    path::PathBuf,
};

use chop::{harness, Candidate, CaseTable, Failure, ParseError};
use clap::{Parser, Subcommand};
use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFiles,
    term::{
        self,
        termcolor::{ColorChoice, ColorSpec, StandardStream, WriteColor},
    },
};
use regex::Regex;

#[derive(Parser)]
#[command(disable_help_subcommand = true, args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered candidates.
    List,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Only test candidates whose name matches the given regex.
    #[arg(long)]
    only: Option<Regex>,
    /// Also run the cases in this file. Directories are searched for `*.chop` files.
    #[arg(long = "cases", value_name = "PATH")]
    cases: Vec<PathBuf>,
    /// Skip the builtin case table.
    #[arg(long)]
    no_builtin: bool,
    /// Print how many cases each candidate passed.
    #[arg(long)]
    summary: bool,
}

type FileId = usize;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command {
        Some(Command::List) => {
            let stdout = &mut StandardStream::stdout(ColorChoice::Auto);
            for candidate in Candidate::ALL {
                stdout.set_color(ColorSpec::new().set_bold(true))?;
                write!(stdout, "{candidate}")?;
                stdout.reset()?;
                writeln!(stdout, ": {}", candidate.about())?;
            }
        }
        None => {
            let stdout = StandardStream::stdout(ColorChoice::Auto);
            if Runner::new(args.run, stdout).run()? == Status::InvalidCases {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Status {
    /// Every selected candidate was tested.
    Completed,
    /// Some case table had errors, no candidate was tested.
    InvalidCases,
}

struct Emitter<W> {
    writer: W,
    config: codespan_reporting::term::Config,
    has_errors: bool,
}

impl<W: WriteColor> Emitter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            config: codespan_reporting::term::Config::default(),
            has_errors: false,
        }
    }

    fn emit(
        &mut self,
        db: &FilesDB,
        diagnostic: Diagnostic<FileId>,
    ) -> Result<(), codespan_reporting::files::Error> {
        self.has_errors = true;
        term::emit(&mut self.writer, &self.config, &db.files, &diagnostic)
    }

    fn heading(&mut self, text: &str) -> std::io::Result<()> {
        self.writer.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(self.writer, "{text}")?;
        self.writer.reset()
    }
}

struct Runner<W> {
    args: RunArgs,
    db: FilesDB,
    emitter: Emitter<W>,
}

impl<W: WriteColor> Runner<W> {
    fn new(args: RunArgs, writer: W) -> Self {
        Self {
            args,
            db: FilesDB::new(),
            emitter: Emitter::new(writer),
        }
    }

    fn run(&mut self) -> Result<Status, Box<dyn Error>> {
        let mut tables = vec![];
        if !self.args.no_builtin {
            tables.push(CaseTable::builtin());
        }
        tables.extend(CaseTable::collect(&self.args.cases)?);
        self.run_tables(tables)
    }

    fn run_tables(&mut self, tables: Vec<CaseTable>) -> Result<Status, Box<dyn Error>> {
        let tables: Vec<_> = tables
            .into_iter()
            .map(|table| (self.db.add(&table), table))
            .collect();

        self.report_invalid_cases(&tables)?;
        if self.emitter.has_errors {
            return Ok(Status::InvalidCases);
        }

        let total: usize = tables.iter().map(|(_, table)| table.cases().count()).sum();
        for candidate in Candidate::ALL {
            if let Some(re) = &self.args.only {
                if !re.is_match(candidate.name()) {
                    continue;
                }
            }
            self.test_candidate(candidate, &tables, total)?;
        }
        Ok(Status::Completed)
    }

    /// Runs one candidate over every table, stopping at its first failure.
    fn test_candidate(
        &mut self,
        candidate: Candidate,
        tables: &[(FileId, CaseTable)],
        total: usize,
    ) -> Result<(), Box<dyn Error>> {
        self.emitter.heading(&format!("Testing {candidate}"))?;

        let mut passed = 0;
        for (file_id, table) in tables {
            match harness::run(&candidate, table.cases()) {
                Ok(n) => passed += n,
                Err(failure) => {
                    let diagnostic = self.db.failure_diagnostic(*file_id, candidate, &failure);
                    self.emit_diagnostic(diagnostic)?;
                    break;
                }
            }
        }

        if self.args.summary {
            writeln!(
                self.emitter.writer,
                "{passed}/{total} {} passed",
                pluralize("case", total)
            )?;
        }
        Ok(())
    }

    fn report_invalid_cases(
        &mut self,
        tables: &[(FileId, CaseTable)],
    ) -> Result<(), Box<dyn Error>> {
        for (file_id, table) in tables {
            for invalid in table.invalid() {
                let diagnostic = match invalid.error {
                    ParseError::Malformed => self.db.malformed_diagnostic(*file_id, invalid.span()),
                    ParseError::InvalidInteger { start, end } => {
                        self.db.invalid_integer_diagnostic(*file_id, start..end)
                    }
                    ParseError::Unsorted { start, end } => {
                        self.db.unsorted_diagnostic(*file_id, start..end)
                    }
                    ParseError::InvalidExpectation { start, end } => {
                        self.db.invalid_expectation_diagnostic(*file_id, start..end)
                    }
                };
                self.emit_diagnostic(diagnostic)?;
            }
        }
        Ok(())
    }

    fn emit_diagnostic(
        &mut self,
        diagnostic: Diagnostic<FileId>,
    ) -> Result<(), codespan_reporting::files::Error> {
        self.emitter.emit(&self.db, diagnostic)
    }
}

struct FilesDB {
    pub files: SimpleFiles<String, String>,
}

impl FilesDB {
    fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
        }
    }

    fn add(&mut self, table: &CaseTable) -> FileId {
        self.files.add(table.name.clone(), table.source.clone())
    }

    fn failure_diagnostic(
        &self,
        file_id: FileId,
        candidate: Candidate,
        failure: &Failure,
    ) -> Diagnostic<FileId> {
        let case = failure.case();
        match failure {
            Failure::Mismatch { actual, .. } => Diagnostic::error()
                .with_message(format!("Failure in {candidate}"))
                .with_labels(vec![
                    Label::primary(file_id, case.expected_span())
                        .with_message(format!("expected {}", case.expected)),
                    Label::secondary(file_id, case.span())
                        .with_message(format!("found {actual}")),
                ]),
            Failure::Panicked { fault, .. } => {
                let mut notes = vec![];
                if fault.backtrace.status() == BacktraceStatus::Captured {
                    notes.push(format!("backtrace:\n{}", fault.backtrace));
                }
                Diagnostic::error()
                    .with_message(format!("Failure in {candidate}, panicked: {fault}"))
                    .with_labels(vec![Label::primary(file_id, case.span())
                        .with_message("while running this case")])
                    .with_notes(notes)
            }
        }
    }

    fn malformed_diagnostic(&self, file_id: FileId, span: Range<usize>) -> Diagnostic<FileId> {
        let note = "each case must look like `chop(3, [1, 3, 5]) == 1`".to_string();

        Diagnostic::error()
            .with_message("malformed case")
            .with_labels(vec![Label::primary(file_id, span)])
            .with_notes(vec![note])
    }

    fn invalid_integer_diagnostic(
        &self,
        file_id: FileId,
        span: Range<usize>,
    ) -> Diagnostic<FileId> {
        Diagnostic::error()
            .with_message("invalid integer")
            .with_labels(vec![Label::primary(file_id, span)])
            .with_notes(vec![
                "values must be integers that fit in 64 bits".to_string()
            ])
    }

    fn unsorted_diagnostic(&self, file_id: FileId, span: Range<usize>) -> Diagnostic<FileId> {
        Diagnostic::error()
            .with_message("sequence is not sorted")
            .with_labels(vec![Label::primary(file_id, span)])
            .with_notes(vec![
                "sequences must be in non-decreasing order".to_string()
            ])
    }

    fn invalid_expectation_diagnostic(
        &self,
        file_id: FileId,
        span: Range<usize>,
    ) -> Diagnostic<FileId> {
        Diagnostic::error()
            .with_message("expected index doesn't match the sequence")
            .with_labels(vec![Label::primary(file_id, span)])
            .with_notes(vec![
                "expected index must hold the target, or be -1 if the target is absent"
                    .to_string(),
            ])
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use codespan_reporting::term::termcolor::Buffer;

    use super::*;

    fn run_args(only: Option<&str>) -> RunArgs {
        RunArgs {
            only: only.map(|re| Regex::new(re).unwrap()),
            cases: vec![],
            no_builtin: false,
            summary: false,
        }
    }

    fn run_tables(args: RunArgs, tables: Vec<CaseTable>) -> (Status, String) {
        let mut runner = Runner::new(args, Buffer::no_color());
        let status = runner.run_tables(tables).unwrap();
        let output = String::from_utf8_lossy(runner.emitter.writer.as_slice()).into_owned();
        (status, output)
    }

    fn headings(output: &str) -> Vec<&str> {
        output
            .lines()
            .filter(|line| line.starts_with("Testing "))
            .collect()
    }

    #[test]
    fn tests_every_candidate_in_registry_order() {
        let (status, output) = run_tables(run_args(None), vec![CaseTable::builtin()]);
        assert_eq!(status, Status::Completed);
        let expected: Vec<_> = Candidate::ALL.iter().map(|c| format!("Testing {c}")).collect();
        assert_eq!(headings(&output), expected);
        assert_eq!(output.matches("Failure in").count(), 1);
        assert!(output.contains("Failure in stub"));
    }

    #[test]
    fn only_selects_matching_candidates() {
        let (_, output) = run_tables(run_args(Some("^(std|stub)$")), vec![CaseTable::builtin()]);
        assert_eq!(headings(&output), ["Testing std", "Testing stub"]);
    }

    #[test]
    fn invalid_table_stops_before_any_candidate() {
        let tables = vec![
            CaseTable::builtin(),
            CaseTable::parse("bad.chop", "chop(x, [1]) == 0\nchop(1, [2, 1]) == 1\n"),
        ];
        let (status, output) = run_tables(run_args(None), tables);
        assert_eq!(status, Status::InvalidCases);
        assert!(output.contains("invalid integer"));
        assert!(output.contains("values must be integers that fit in 64 bits"));
        assert!(output.contains("sequence is not sorted"));
        assert!(headings(&output).is_empty());
    }

    #[test]
    fn first_failure_ends_the_candidate_across_tables() {
        let mut args = run_args(Some("^stub$"));
        args.no_builtin = true;
        let tables = vec![
            CaseTable::parse("first.chop", "chop(1, [1]) == 0\n"),
            CaseTable::parse("second.chop", "chop(3, [1, 3]) == 1\n"),
        ];
        let (status, output) = run_tables(args, tables);
        assert_eq!(status, Status::Completed);
        assert_eq!(output.matches("Failure in stub").count(), 1);
        assert!(output.contains("first.chop"));
        assert!(!output.contains("second.chop"));
    }

    #[test]
    fn summary_counts_cases_passed_before_failing() {
        let mut args = run_args(Some("^(iterative|stub)$"));
        args.summary = true;
        let (_, output) = run_tables(args, vec![CaseTable::builtin()]);
        assert!(output.contains("19/19 cases passed"));
        assert!(output.contains("2/19 cases passed"));
    }
}
