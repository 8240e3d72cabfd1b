//! TeX compiler collaborator

use std::fs::{self, File};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

use super::sandbox::find_main_file;
use crate::utils::error::{Error, Result};

/// Output of one successful compile
#[derive(Debug, Clone)]
pub struct CompiledPdf {
    /// Absolute path of the produced PDF
    pub pdf: PathBuf,
    /// Main source file, relative to the compiled directory
    pub main_file: PathBuf,
    pub log: String,
}

/// Compiles the document rooted at a directory.
pub trait TexCompiler {
    fn compile(&self, dir: &Path) -> Result<CompiledPdf>;
}

const LOG_FILE: &str = "texrainbow-compile.log";

/// Runs an external compiler (`latexmk -pdf` by default) on the main file,
/// killing it after `timeout`.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn latexmk(timeout: Duration) -> Self {
        Self::new(
            "latexmk",
            vec![
                "-pdf".to_string(),
                "-interaction=nonstopmode".to_string(),
                "-f".to_string(),
            ],
            timeout,
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl TexCompiler for CommandCompiler {
    fn compile(&self, dir: &Path) -> Result<CompiledPdf> {
        let main_file = find_main_file(dir)?.ok_or_else(|| Error::MissingMainFile(dir.to_path_buf()))?;
        let log_path = dir.join(LOG_FILE);
        let log_file = File::create(&log_path)?;

        log::debug!("compiling {} in {}", main_file.display(), dir.display());
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&main_file)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file.try_clone()?))
            .stderr(Stdio::from(log_file));
        // own process group, so a timeout also reaches pdflatex under latexmk
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn()?;

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                kill_process_tree(&mut child);
                return Err(Error::CompileTimeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let log = fs::read(&log_path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        let pdf = dir.join(main_file.with_extension("pdf"));
        // latexmk -f may exit non-zero and still leave a usable PDF
        if !pdf.is_file() {
            return Err(Error::CompilationFailed { log });
        }
        if !status.success() {
            log::warn!(
                "{} exited with {} but produced {}",
                self.program,
                status,
                pdf.display()
            );
        }
        Ok(CompiledPdf {
            pdf,
            main_file,
            log,
        })
    }
}

/// Kill `child` together with everything it spawned.
fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            log::warn!("cannot kill process group {}: {}", child.id(), e);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
