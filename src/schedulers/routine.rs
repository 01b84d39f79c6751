//! The routine scheduler: a round-robin cursor over a cycle-frozen list.
//!
//! A routine cycles through its members in insertion order and advances
//! only when the current member executes. Members inserted mid-cycle freeze
//! the cycle boundary at the post-insert size, so the running cycle
//! completes over the members it started with plus the accepted appends
//! exactly once before the expanded list cycles normally.

use anyhow::Result;
use async_trait::async_trait;

use super::Scheduler;
use crate::instruction::Instruction;
use crate::runtime::{execute, Context};

pub(crate) struct Routine {
    id: String,
    members: Vec<String>,
    cursor: usize,
    frozen_end: Option<usize>,
}

impl Routine {
    pub(crate) fn new(instruction: &Instruction) -> Self {
        Self {
            id: instruction.id().to_string(),
            members: instruction.children().to_vec(),
            cursor: 0,
            frozen_end: None,
        }
    }
}

#[async_trait(?Send)]
impl Scheduler for Routine {
    fn member_count(&self) -> usize {
        self.members.len()
    }

    fn insert(&mut self, id: &str) -> Result<()> {
        self.members.push(id.to_string());
        if self.frozen_end.is_none() {
            self.frozen_end = Some(self.members.len());
        }
        Ok(())
    }

    async fn tick(&mut self, ctx: &mut Context) -> Result<bool> {
        if self.members.is_empty() {
            return Ok(false);
        }

        let current = self.members[self.cursor].clone();
        if !execute(ctx, &current, Some(&self.id)).await? {
            // Blocked on this member until it becomes ready; no advance.
            return Ok(false);
        }

        self.cursor += 1;
        match self.frozen_end {
            Some(end) if self.cursor >= end => {
                self.cursor = 0;
                self.frozen_end = None;
            }
            _ if self.cursor >= self.members.len() => self.cursor = 0,
            _ => {}
        }

        Ok(true)
    }
}
