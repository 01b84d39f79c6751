//! The [`Scheduler`] trait and the per-policy implementations.
//!
//! A scheduler owns the dispatch state for one started instruction: a
//! round-robin cursor, a cooldown heap, or an eligibility set. The runtime
//! keeps one boxed scheduler per started id and ticks them in registration
//! order, passing the runtime context explicitly into every tick.

mod random;
mod routine;
mod waitlist;

pub(crate) use random::RandomSet;
pub(crate) use routine::Routine;
pub(crate) use waitlist::Waitlist;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::instruction::{Instruction, Kind};
use crate::runtime::{execute, Context};

/// One dispatch policy over a started instruction's children.
#[async_trait(?Send)]
pub(crate) trait Scheduler {
    /// How many members this scheduler currently dispatches over.
    fn member_count(&self) -> usize;

    /// Accept a member appended while the scheduler is running.
    fn insert(&mut self, id: &str) -> Result<()>;

    /// Run one scheduling step. Returns whether any member executed; a
    /// `false` signals the caller that this scheduler is currently blocked.
    async fn tick(&mut self, ctx: &mut Context) -> Result<bool>;
}

/// Builds the scheduler state for a startable instruction.
pub(crate) fn build(instruction: &Instruction) -> Result<Box<dyn Scheduler>> {
    match instruction.kind() {
        Kind::Routine => Ok(Box::new(Routine::new(instruction))),
        Kind::Waitlist => Ok(Box::new(Waitlist::new(instruction)?)),
        Kind::Random => Ok(Box::new(RandomSet::new(instruction))),
        Kind::Group => Ok(Box::new(GroupRun::new(instruction))),
        kind => bail!("cannot schedule a {kind}"),
    }
}

/// A started group: a degenerate scheduler whose every tick runs the group
/// body once, children in order with their own timing.
pub(crate) struct GroupRun {
    id: String,
    members: usize,
}

impl GroupRun {
    pub(crate) fn new(instruction: &Instruction) -> Self {
        Self {
            id: instruction.id().to_string(),
            members: instruction.children().len(),
        }
    }
}

#[async_trait(?Send)]
impl Scheduler for GroupRun {
    fn member_count(&self) -> usize {
        self.members
    }

    fn insert(&mut self, _id: &str) -> Result<()> {
        // The group body re-reads its children on every run; only the count
        // needs tracking.
        self.members += 1;
        Ok(())
    }

    async fn tick(&mut self, ctx: &mut Context) -> Result<bool> {
        execute(ctx, &self.id, Some(&self.id)).await
    }
}
