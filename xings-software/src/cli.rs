//! Bits every command-line front-end shares.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{user_message, Error};
use crate::install::{AssumeYes, Confirm, Confirmation};
use crate::packagekit::transaction::{Options, Package, Progress};
use crate::packagekit::{Cancellable, Status};

#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Show debugging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to every question
    #[arg(short = 'y', long, global = true)]
    pub assume_yes: bool,
}

impl CommonArgs {
    pub fn confirmer(&self) -> Box<dyn Confirm> {
        if self.assume_yes {
            Box::new(AssumeYes)
        } else {
            Box::new(Prompt)
        }
    }
}

/// Asks on the terminal, defaulting to "no".
pub struct Prompt;

impl Confirm for Prompt {
    fn confirm(&self, confirmation: &Confirmation) -> bool {
        let mut stderr = std::io::stderr().lock();
        if !confirmation.additional.is_empty() {
            let _ = writeln!(stderr, "Additional packages:");
            for package in &confirmation.additional {
                let _ = writeln!(stderr, "  {:<12} {}", package.info, package.id.printable());
            }
        }
        drop(stderr);
        ask(&confirmation.question())
    }
}

/// Yes/no question on the terminal, defaulting to "no".
pub fn ask(question: &str) -> bool {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "{} [y/N] ", question);
    let _ = stderr.flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

/// Shows `message` on stderr and blocks until a line arrives on stdin.
pub fn pause(message: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", message);
    let _ = stderr.flush();
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn progress_line(progress: &Progress) -> String {
    let mut line = progress.status.label().to_string();
    if let Some(id) = &progress.package_id {
        line.push(' ');
        line.push_str(&id.printable());
    }
    if let Some(percentage) = progress.percentage {
        line.push_str(&format!(" ({}%)", percentage));
    }
    line
}

/// Interactive transaction options that print progress to stderr and
/// cancel on Ctrl-C. Await the handle after the transaction to flush output.
pub fn interactive_options() -> (Options, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Progress>();
    let printer = tokio::spawn(async move {
        let mut last = String::new();
        while let Some(progress) = receiver.recv().await {
            if progress.status == Status::Finished {
                continue;
            }
            let line = progress_line(&progress);
            if line != last {
                eprintln!("{}", line);
                last = line;
            }
        }
    });

    let cancellable = Cancellable::new();
    let on_interrupt = cancellable.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling transaction");
            on_interrupt.cancel();
        }
    });

    let options = Options::interactive()
        .with_progress(sender)
        .with_cancellable(cancellable);
    (options, printer)
}

pub fn print_packages(packages: &[Package]) {
    for package in packages {
        println!("{:<12} {:<40} {}", package.info, package.id.printable(), package.summary);
    }
}

/// Maps a front-end result to the process exit code.
pub fn finish(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if matches!(e.downcast_ref::<Error>(), Some(Error::AlreadyInstalled(_))) {
                eprintln!("{}", user_message(&e));
                return ExitCode::SUCCESS;
            }
            debug!("{:?}", e);
            eprintln!("Error: {}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}
