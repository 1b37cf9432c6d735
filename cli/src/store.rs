//! Action journal persistence.
//!
//! The journal is a JSON-lines file, one action per line, and the world
//! is rebuilt by replaying it from the top. Only actions that applied
//! cleanly are appended, so a journal always replays without errors.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::world::{Action, Outcome, World};

pub struct Journal {
    path: PathBuf,
    world: Option<World>,
    entries: usize,
}

impl Journal {
    /// Opens (or prepares to create) the journal at `path` and replays
    /// it into a world.
    pub fn open(path: &Path) -> Result<Journal> {
        let mut journal = Journal { path: path.to_path_buf(), world: None, entries: 0 };
        if !path.exists() {
            log::debug!("journal {} does not exist yet", path.display());
            return Ok(journal);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read journal {}", path.display()))?;
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let action: Action = serde_json::from_str(line)
                .with_context(|| format!("journal line {} is not a valid action", index + 1))?;
            journal
                .replay(&action)
                .with_context(|| format!("journal line {} failed to replay", index + 1))?;
        }
        log::info!(
            "replayed {} actions from {}",
            journal.entries,
            path.display()
        );
        Ok(journal)
    }

    fn replay(&mut self, action: &Action) -> Result<()> {
        log::debug!("replay: {action:?}");
        match (&mut self.world, action) {
            (None, Action::Init { .. }) => {
                self.world = Some(World::from_init(action)?);
            }
            (Some(world), _) => {
                world.apply(action)?;
            }
            (None, _) => bail!("journal does not start with an init action"),
        }
        self.entries += 1;
        Ok(())
    }

    /// The replayed world. Fails if the journal has no init action yet.
    pub fn world(&self) -> Result<&World> {
        self.world
            .as_ref()
            .with_context(|| format!("{} is not initialized; run `aquifer init` first", self.path.display()))
    }

    /// Timestamp new actions default to.
    pub fn now(&self) -> u64 {
        self.world.as_ref().map(|w| w.now).unwrap_or(0)
    }

    /// Applies `action` to a clone of the world and, if it succeeds,
    /// commits the clone and appends the action to the journal file.
    pub fn execute(&mut self, action: Action) -> Result<Outcome> {
        log::info!("apply: {action:?}");
        let outcome = match (&mut self.world, &action) {
            (None, Action::Init { .. }) => {
                self.world = Some(World::from_init(&action)?);
                Outcome::Done
            }
            (Some(_), Action::Init { .. }) => bail!("journal is already initialized"),
            (None, _) => bail!("journal is not initialized; run `aquifer init` first"),
            (Some(world), _) => {
                let mut next = world.clone();
                let outcome = next.apply(&action)?;
                *world = next;
                outcome
            }
        };
        self.append(&action)?;
        self.entries += 1;
        Ok(outcome)
    }

    fn append(&self, action: &Action) -> Result<()> {
        let line = serde_json::to_string(action).context("failed to encode action")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open journal {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to journal {}", self.path.display()))
    }
}
