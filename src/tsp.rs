//! Touchscreen controller command interface.
//!
//! The touchscreen driver exposes a small command channel under its sysfs
//! class directory: `cmd_list` lists the supported commands one per line,
//! a command is issued by writing it to `cmd`, and the driver's answer to
//! the last command is read back from `cmd_result`.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use log::{debug, info};
use thiserror::Error;

use crate::sysfs::{
    Filesystem, ReadOutcome, SkipReason, SysfsError, SysfsReader, SysfsWriter, WriteOutcome,
};

/// Default touchscreen class directory.
pub const DEFAULT_TSP_DIR: &str = "/sys/class/sec/tsp";

const CMD: &str = "cmd";
const CMD_RESULT: &str = "cmd_result";
const CMD_LIST: &str = "cmd_list";

/// Failure of a touchscreen command node operation.
#[derive(Debug, Error)]
pub enum TspError {
    #[error("touchscreen node {} {reason}", path.display())]
    Unavailable { path: PathBuf, reason: SkipReason },

    #[error(transparent)]
    Sysfs(#[from] SysfsError),
}

/// Issues commands to the touchscreen controller through its sysfs nodes.
///
/// One instance is shared by every service that talks to the controller;
/// [`execute`](Self::execute) keeps a command and its result read paired.
pub struct SecTspCommandManager {
    root: PathBuf,
    reader: SysfsReader<Arc<dyn Filesystem>>,
    writer: SysfsWriter<Arc<dyn Filesystem>>,
    command_lock: Mutex<()>,
}

impl SecTspCommandManager {
    /// Manager for the command nodes under `root`.
    pub fn new(fs: Arc<dyn Filesystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reader: SysfsReader::new(Arc::clone(&fs)),
            writer: SysfsWriter::new(fs),
            command_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists the commands the controller accepts, in driver order.
    ///
    /// Blank lines and surrounding whitespace are dropped.
    pub fn available_commands(&self) -> Result<Vec<String>, TspError> {
        let list = self.read_node(CMD_LIST)?;
        let commands: Vec<String> = list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!("Available touchscreen commands: {}", commands.join(", "));
        Ok(commands)
    }

    /// Whether `command` appears in the controller's command list.
    ///
    /// An unreadable list counts as not supported.
    pub fn supports(&self, command: &str) -> bool {
        match self.available_commands() {
            Ok(commands) => commands.iter().any(|c| c == command),
            Err(e) => {
                debug!("Cannot check support for '{command}': {e}");
                false
            }
        }
    }

    /// Writes `command` to the command node.
    pub fn send_command(&self, command: &str) -> Result<(), TspError> {
        let path = self.root.join(CMD);
        match self.writer.write(&path, command)? {
            WriteOutcome::Written => {
                info!("Touchscreen command sent: {command}");
                Ok(())
            }
            WriteOutcome::Skipped(reason) => Err(TspError::Unavailable { path, reason }),
        }
    }

    /// Reads the controller's answer to the last command.
    pub fn command_result(&self) -> Result<String, TspError> {
        let result = self.read_node(CMD_RESULT)?;
        debug!("Touchscreen command result: {result}");
        Ok(result)
    }

    /// Sends `command` and reads its result with no other command in between.
    pub fn execute(&self, command: &str) -> Result<String, TspError> {
        let _guard = self
            .command_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.send_command(command)?;
        self.command_result()
    }

    fn read_node(&self, name: &str) -> Result<String, TspError> {
        let path = self.root.join(name);
        match self.reader.read(&path)? {
            ReadOutcome::Read(contents) => Ok(contents),
            ReadOutcome::Skipped(reason) => Err(TspError::Unavailable { path, reason }),
        }
    }
}
