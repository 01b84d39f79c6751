//! The runtime loop: drains the top-level execution list, tracks started
//! schedulers, and fires leaf instructions through the driver sink.
//!
//! The interpreter is single-threaded and cooperative. One task advances
//! the loop; scheduler ticks do not suspend except inside a leaf's timing
//! sleeps, which block the whole interpreter: scripts are ordered and
//! latency-sensitive.

use anyhow::{anyhow, bail, Result};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;

use crate::driver::KeyDriver;
use crate::instruction::Kind;
use crate::keys::ScanCode;
use crate::params::Param;
use crate::parser::Program;
use crate::schedulers::{self, Scheduler};

/// Pause between scheduling steps of the main loop.
const TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Follow at most this many reference hops when resolving a leaf's button.
const MAX_REFERENCE_HOPS: usize = 32;

/// Everything a scheduler tick may touch: the parsed program, the driver
/// sink, and the scheduler registry. Passed explicitly into every tick.
pub(crate) struct Context {
    pub(crate) program: Program,
    pub(crate) driver: Box<dyn KeyDriver>,
    /// Dispatch state per started (or lazily built) scheduler id. An entry
    /// is temporarily absent from this map while its tick runs.
    pub(crate) schedulers: HashMap<String, Box<dyn Scheduler>>,
    /// Scheduler ids in registration order; drives tick order.
    pub(crate) registered: Vec<String>,
    pub(crate) active: HashSet<String>,
    /// Group ids currently executing; re-entry is a no-op for the tick.
    pub(crate) in_flight: HashSet<String>,
}

impl Context {
    pub(crate) fn new(program: Program, driver: Box<dyn KeyDriver>) -> Self {
        Self {
            program,
            driver,
            schedulers: HashMap::new(),
            registered: Vec::new(),
            active: HashSet::new(),
            in_flight: HashSet::new(),
        }
    }
}

/// Runs a parsed [`Program`] against a driver sink.
pub struct Runtime {
    ctx: Context,
}

impl Runtime {
    pub fn new(program: Program, driver: Box<dyn KeyDriver>) -> Self {
        Self {
            ctx: Context::new(program, driver),
        }
    }

    /// Runs the whole program: applies window focus, drains the top-level
    /// execution list, then ticks active schedulers until none remain.
    pub async fn run(&mut self) -> Result<()> {
        self.apply_windows();
        self.drain_execution_list().await?;

        while self.has_active() {
            self.tick().await?;
            sleep(TICK_INTERVAL).await;
        }

        Ok(())
    }

    /// Executes every indent-0 transaction in source order. `start` and
    /// `stop` take effect immediately, so a stop in the same batch leaves
    /// its target inactive before the first tick.
    pub async fn drain_execution_list(&mut self) -> Result<()> {
        let transactions = self.ctx.program.execution_list.clone();
        for id in transactions {
            execute(&mut self.ctx, &id, None).await?;
        }
        Ok(())
    }

    /// One scheduling step: ticks every active scheduler in registration
    /// order, syncing in members appended since the last step.
    pub async fn tick(&mut self) -> Result<()> {
        let order = self.ctx.registered.clone();
        for id in order {
            if !self.ctx.active.contains(&id) {
                continue;
            }
            let Some(mut scheduler) = self.ctx.schedulers.remove(&id) else {
                continue;
            };

            let children = self.ctx.program.table.get(&id)?.children().to_vec();
            while scheduler.member_count() < children.len() {
                scheduler.insert(&children[scheduler.member_count()])?;
            }

            let result = scheduler.tick(&mut self.ctx).await;
            self.ctx.schedulers.insert(id, scheduler);
            result?;
        }
        Ok(())
    }

    /// Appends a child to a registered instruction at runtime. A running
    /// scheduler picks the member up on its next tick; a routine freezes its
    /// current cycle around it.
    pub fn append_child(&mut self, parent_id: &str, child_id: &str) -> Result<()> {
        if !self.ctx.program.table.contains(child_id) {
            bail!("unknown instruction id `{child_id}`");
        }
        self.ctx.program.table.push_child(parent_id, child_id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.ctx.active.contains(id)
    }

    pub fn has_active(&self) -> bool {
        !self.ctx.active.is_empty()
    }

    pub fn program(&self) -> &Program {
        &self.ctx.program
    }

    /// Focus declared windows in source order. Best-effort: a rejection is
    /// reported and skipped.
    fn apply_windows(&mut self) {
        for title in self.ctx.program.windows.clone() {
            if let Err(error) = self.ctx.driver.focus(&title) {
                tracing::warn!(%error, %title, "window focus failed");
            }
        }
        for name in &self.ctx.program.scripts {
            tracing::debug!(script = %name, "running script");
        }
    }
}

/// Executes one instruction by id. Returns whether it made progress: leaves,
/// groups, and start/stop always do; a scheduler child reports whether any
/// of its members fired, which is what lets a routine block on it.
pub(crate) fn execute<'a>(
    ctx: &'a mut Context,
    id: &'a str,
    owner: Option<&'a str>,
) -> Pin<Box<dyn Future<Output = Result<bool>> + 'a>> {
    Box::pin(async move {
        let kind = ctx.program.table.get(id)?.kind();
        match kind {
            Kind::Key | Kind::Press | Kind::Hold | Kind::Release => {
                execute_leaf(ctx, id, kind, owner).await?;
                Ok(true)
            }
            Kind::Start => {
                let target = transaction_target(ctx, id)?;
                activate(ctx, &target)?;
                Ok(true)
            }
            Kind::Stop => {
                let target = transaction_target(ctx, id)?;
                deactivate(ctx, &target)?;
                Ok(true)
            }
            Kind::Group => {
                if !ctx.in_flight.insert(id.to_string()) {
                    // Cyclic reference; skip for this tick.
                    return Ok(true);
                }
                let result = execute_group(ctx, id, owner).await;
                ctx.in_flight.remove(id);
                result?;
                Ok(true)
            }
            Kind::Routine | Kind::Waitlist | Kind::Random => {
                let Some(mut scheduler) = ctx.schedulers.remove(id) else {
                    if ctx.registered.iter().any(|known| known == id) {
                        // Already ticking further up the stack.
                        return Ok(true);
                    }
                    // First encounter as a child: build its state without
                    // activating it; only its parent drives it.
                    let mut scheduler = schedulers::build(ctx.program.table.get(id)?)?;
                    ctx.registered.push(id.to_string());
                    let progressed = scheduler.tick(ctx).await;
                    ctx.schedulers.insert(id.to_string(), scheduler);
                    return progressed;
                };
                let progressed = scheduler.tick(ctx).await;
                ctx.schedulers.insert(id.to_string(), scheduler);
                progressed
            }
            Kind::Script | Kind::Window => bail!("a {kind} cannot be executed"),
        }
    })
}

fn transaction_target(ctx: &Context, id: &str) -> Result<String> {
    ctx.program
        .table
        .get(id)?
        .children()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("`{id}` has no target"))
}

/// Marks a scheduler or group active, building its dispatch state on first
/// activation. Re-starting a known scheduler resumes it where it left off.
fn activate(ctx: &mut Context, id: &str) -> Result<()> {
    let instruction = ctx.program.table.get(id)?;
    let kind = instruction.kind();
    if !(kind.is_scheduler() || kind == Kind::Group) {
        bail!("cannot start a {kind}");
    }

    if !ctx.registered.iter().any(|known| known == id) {
        let scheduler = schedulers::build(instruction)?;
        ctx.schedulers.insert(id.to_string(), scheduler);
        ctx.registered.push(id.to_string());
    }

    ctx.active.insert(id.to_string());
    tracing::debug!(id, "scheduler activated");
    Ok(())
}

/// Marks a scheduler or group inactive. Takes effect at the next scheduling
/// boundary; in-flight work finishes its current cycle.
fn deactivate(ctx: &mut Context, id: &str) -> Result<()> {
    let kind = ctx.program.table.get(id)?.kind();
    if !(kind.is_scheduler() || kind == Kind::Group) {
        bail!("cannot stop a {kind}");
    }

    ctx.active.remove(id);
    tracing::debug!(id, "scheduler deactivated");
    Ok(())
}

/// Fires a leaf: before-delay, key action, after-delay, repeated
/// `max(1, repeat)` times. A deactivated owner stops further iterations but
/// never truncates the cycle in flight. Driver rejections are non-fatal.
async fn execute_leaf(ctx: &mut Context, id: &str, kind: Kind, owner: Option<&str>) -> Result<()> {
    let params = ctx.program.table.get(id)?.params().clone();
    let code = resolve_button(ctx, id)?;
    let iterations = params.get(Param::Repeat).sample().max(1);

    for iteration in 0..iterations {
        if iteration > 0 && owner_stopped(ctx, owner) {
            break;
        }

        sleep_ms(params.get(Param::Before).sample()).await;

        match kind {
            Kind::Key | Kind::Press => match ctx.driver.down(code) {
                Ok(()) => {
                    sleep_ms(params.get(Param::Duration).sample()).await;
                    if let Err(error) = ctx.driver.up(code) {
                        tracing::warn!(%error, id, "driver rejected key up");
                    }
                }
                Err(error) => tracing::warn!(%error, id, "driver rejected key down"),
            },
            Kind::Hold => {
                if let Err(error) = ctx.driver.down(code) {
                    tracing::warn!(%error, id, "driver rejected key down");
                }
            }
            Kind::Release => {
                if let Err(error) = ctx.driver.up(code) {
                    tracing::warn!(%error, id, "driver rejected key up");
                }
            }
            _ => bail!("{kind} is not a leaf instruction"),
        }

        sleep_ms(params.get(Param::After).sample()).await;
    }

    Ok(())
}

/// Runs a group body: children sequentially, each iteration bracketed by the
/// group's own before/after delays, `repeat` times (-1 = until stopped).
async fn execute_group(ctx: &mut Context, id: &str, owner: Option<&str>) -> Result<()> {
    let instruction = ctx.program.table.get(id)?;
    let params = instruction.params().clone();
    let children = instruction.children().to_vec();
    let repeat = params.get(Param::Repeat).sample();

    let mut iteration: i64 = 0;
    loop {
        if iteration > 0 && owner_stopped(ctx, owner) {
            break;
        }

        sleep_ms(params.get(Param::Before).sample()).await;
        for child in &children {
            execute(ctx, child, owner).await?;
        }
        sleep_ms(params.get(Param::After).sample()).await;

        iteration += 1;
        if repeat >= 0 && iteration >= i64::from(repeat.max(1)) {
            break;
        }
    }

    Ok(())
}

fn owner_stopped(ctx: &Context, owner: Option<&str>) -> bool {
    match owner {
        Some(owner_id) => !ctx.active.contains(owner_id),
        None => false,
    }
}

/// A leaf's button: its own, or the first bound button along its reference
/// chain (a press inherits the key definition it names).
fn resolve_button(ctx: &Context, id: &str) -> Result<ScanCode> {
    let mut current = id.to_string();
    for _ in 0..MAX_REFERENCE_HOPS {
        let instruction = ctx.program.table.get(&current)?;
        if let Some(code) = instruction.button() {
            return Ok(code);
        }
        match instruction.children().first() {
            Some(next) => current = next.clone(),
            None => break,
        }
    }
    bail!("no button bound for `{id}`")
}

async fn sleep_ms(millis: i32) {
    if millis > 0 {
        sleep(Duration::from_millis(millis as u64)).await;
    }
}
